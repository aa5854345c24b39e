use std::{collections::HashMap, error::Error as StdError};

use async_trait::async_trait;
use enum_utils::TryFromRepr;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio_postgres::{
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    Row,
};

use super::{unique, Client, Error};

#[derive(Clone, Debug)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: PasswordHash,
    pub role: Role,
    pub department: Option<String>,
    pub reset_token: Option<String>,
    pub reset_token_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

uuid_id!(Id);

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    TryFromRepr,
    PartialEq,
    Serialize,
)]
#[repr(u8)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Files tickets and follows their own requests.
    User = 1,

    /// Triages and resolves tickets, maintains assets.
    Tech = 2,

    /// Everything a technician can do, plus asset creation and ticket
    /// deletion.
    Admin = 3,
}

impl Role {
    pub fn is_staff(self) -> bool {
        matches!(self, Self::Tech | Self::Admin)
    }
}

int2_enum!(Role, "role");

/// bcrypt hash in its modular crypt form (`$2b$<cost>$...`).
#[derive(Clone, Debug, PartialEq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(secret: &str, cost: u32) -> Result<Self, bcrypt::BcryptError> {
        bcrypt::hash(secret, cost).map(Self)
    }

    /// A malformed stored hash matches nothing.
    pub fn matches(&self, secret: &str) -> bool {
        bcrypt::verify(secret, &self.0).unwrap_or(false)
    }
}

impl FromSql<'_> for PasswordHash {
    accepts!(TEXT);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        String::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for PasswordHash {
    accepts!(TEXT);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, out)
    }
}

#[async_trait]
pub trait Users {
    /// Fails with [`Error::Duplicate`] when the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), Error>;

    async fn get_user_by_id(&self, id: Id) -> Result<Option<User>, Error>;

    async fn get_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<User>, Error>;

    async fn get_users_by_ids(
        &self,
        ids: &[Id],
    ) -> Result<HashMap<Id, User>, Error>;

    async fn set_reset_token(
        &self,
        id: Id,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), Error>;

    /// Replaces the password of the user holding `token` if it has not
    /// expired at `now`, clearing the token in the same write.
    ///
    /// Returns the affected user, or [`None`] if no live token matched.
    async fn consume_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
        password_hash: &PasswordHash,
    ) -> Result<Option<Id>, Error>;
}

const COLUMNS: &str = "id, email, first_name, last_name, password_hash, \
                       role, department, reset_token, \
                       reset_token_expires_at, created_at";

fn from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        role: row.get("role"),
        department: row.get("department"),
        reset_token: row.get("reset_token"),
        reset_token_expires_at: row.get("reset_token_expires_at"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl Users for Client {
    async fn insert_user(&self, user: &User) -> Result<(), Error> {
        const SQL: &str = "\
            INSERT INTO users (id, email, first_name, last_name, \
                               password_hash, role, department, \
                               reset_token, reset_token_expires_at, \
                               created_at) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)";

        self.0
            .execute(
                SQL,
                &[
                    &user.id,
                    &user.email,
                    &user.first_name,
                    &user.last_name,
                    &user.password_hash,
                    &user.role,
                    &user.department,
                    &user.reset_token,
                    &user.reset_token_expires_at,
                    &user.created_at,
                ],
            )
            .await
            .map(drop)
            .map_err(|e| unique(e, "email"))
    }

    async fn get_user_by_id(&self, id: Id) -> Result<Option<User>, Error> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = $1 LIMIT 1");
        Ok(self
            .0
            .query_opt(sql.as_str(), &[&id])
            .await?
            .as_ref()
            .map(from_row))
    }

    async fn get_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<User>, Error> {
        let sql =
            format!("SELECT {COLUMNS} FROM users WHERE email = $1 LIMIT 1");
        Ok(self
            .0
            .query_opt(sql.as_str(), &[&email])
            .await?
            .as_ref()
            .map(from_row))
    }

    async fn get_users_by_ids(
        &self,
        ids: &[Id],
    ) -> Result<HashMap<Id, User>, Error> {
        let sql = format!(
            "SELECT {COLUMNS} \
             FROM users \
             WHERE id IN (SELECT unnest($1::UUID[]))"
        );

        Ok(self
            .0
            .query(sql.as_str(), &[&ids])
            .await?
            .iter()
            .map(|row| {
                let user = from_row(row);
                (user.id, user)
            })
            .collect())
    }

    async fn set_reset_token(
        &self,
        id: Id,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), Error> {
        const SQL: &str = "\
            UPDATE users \
            SET reset_token = $2, \
                reset_token_expires_at = $3 \
            WHERE id = $1";

        self.0
            .execute(SQL, &[&id, &token, &expires_at])
            .await
            .map(drop)
            .map_err(Error::from)
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
        password_hash: &PasswordHash,
    ) -> Result<Option<Id>, Error> {
        const SQL: &str = "\
            UPDATE users \
            SET password_hash = $3, \
                reset_token = NULL, \
                reset_token_expires_at = NULL \
            WHERE reset_token = $1 \
              AND reset_token_expires_at > $2 \
            RETURNING id";

        Ok(self
            .0
            .query_opt(SQL, &[&token, &now, password_hash])
            .await?
            .map(|row| row.get("id")))
    }
}
