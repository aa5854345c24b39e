/// Declares a UUID-backed identifier stored as a PostgreSQL `UUID`.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            Debug,
            Default,
            ::serde::Deserialize,
            ::derive_more::Display,
            Eq,
            Hash,
            Ord,
            PartialEq,
            PartialOrd,
            ::serde::Serialize,
        )]
        pub struct $name(::uuid::Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(::uuid::Uuid::new_v4())
            }
        }

        impl From<u128> for $name {
            fn from(value: u128) -> Self {
                Self(::uuid::Uuid::from_u128(value))
            }
        }

        impl ::tokio_postgres::types::FromSql<'_> for $name {
            ::tokio_postgres::types::accepts!(UUID);

            fn from_sql(
                ty: &::tokio_postgres::types::Type,
                raw: &[u8],
            ) -> Result<
                Self,
                Box<dyn ::std::error::Error + Sync + Send>,
            > {
                <::uuid::Uuid as ::tokio_postgres::types::FromSql>::from_sql(
                    ty, raw,
                )
                .map(Self)
            }
        }

        impl ::tokio_postgres::types::ToSql for $name {
            ::tokio_postgres::types::accepts!(UUID);

            ::tokio_postgres::types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &::tokio_postgres::types::Type,
                out: &mut ::tokio_postgres::types::private::BytesMut,
            ) -> Result<
                ::tokio_postgres::types::IsNull,
                Box<dyn ::std::error::Error + Sync + Send>,
            > {
                ::tokio_postgres::types::ToSql::to_sql(&self.0, ty, out)
            }
        }
    };
}

/// Stores a `#[repr(u8)]` enum deriving `TryFromRepr` as a PostgreSQL `INT2`.
macro_rules! int2_enum {
    ($name:ident, $what:literal) => {
        impl ::tokio_postgres::types::FromSql<'_> for $name {
            ::tokio_postgres::types::accepts!(INT2);

            fn from_sql(
                ty: &::tokio_postgres::types::Type,
                raw: &[u8],
            ) -> Result<
                Self,
                Box<dyn ::std::error::Error + Sync + Send>,
            > {
                let repr =
                    <i16 as ::tokio_postgres::types::FromSql>::from_sql(
                        ty, raw,
                    )?;
                let repr = u8::try_from(repr)?;
                let value = Self::try_from(repr)
                    .map_err(|_| concat!("invalid ", $what))?;
                Ok(value)
            }
        }

        impl ::tokio_postgres::types::ToSql for $name {
            ::tokio_postgres::types::accepts!(INT2);

            ::tokio_postgres::types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &::tokio_postgres::types::Type,
                out: &mut ::tokio_postgres::types::private::BytesMut,
            ) -> Result<
                ::tokio_postgres::types::IsNull,
                Box<dyn ::std::error::Error + Sync + Send>,
            > {
                let repr = i16::from((*self) as u8);
                ::tokio_postgres::types::ToSql::to_sql(&repr, ty, out)
            }
        }
    };
}

pub mod asset;
pub mod memory;
pub mod seed;
pub mod stats;
pub mod ticket;
pub mod user;

use derive_more::{Display, From};
use tokio_postgres::{error::SqlState, tls::NoTlsStream, NoTls, Socket};

use crate::config;

pub use self::{
    asset::{Asset, Assets},
    memory::Memory,
    stats::Stats,
    ticket::{Ticket, Tickets},
    user::{User, Users},
};

/// Storage access injected into every request handler.
pub trait Store: Users + Tickets + Assets + Stats + Send + Sync {}

impl<T> Store for T where T: Users + Tickets + Assets + Stats + Send + Sync {}

#[derive(Debug, Display, From)]
pub enum Error {
    /// A unique business key is already taken.
    #[display("{_0} already exists")]
    Duplicate(&'static str),

    #[from]
    #[display("database error: {_0}")]
    Postgres(tokio_postgres::Error),

    #[from]
    #[display("failed to serialize snapshot: {_0}")]
    Snapshot(serde_json::Error),
}

impl std::error::Error for Error {}

/// Maps a unique-constraint violation onto [`Error::Duplicate`].
fn unique(e: tokio_postgres::Error, what: &'static str) -> Error {
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        Error::Duplicate(what)
    } else {
        Error::Postgres(e)
    }
}

pub type Connection = tokio_postgres::Connection<Socket, NoTlsStream>;

const SCHEMA: &str = include_str!("../../schema.sql");

pub async fn connect(
    config: &config::Db,
) -> Result<(Client, Connection), Error> {
    tokio_postgres::connect(&config.url, NoTls)
        .await
        .map(|(client, connection)| (Client(client), connection))
        .map_err(Error::from)
}

pub struct Client(tokio_postgres::Client);

impl Client {
    /// Creates any missing tables and indexes.
    pub async fn migrate(&self) -> Result<(), Error> {
        self.0.batch_execute(SCHEMA).await.map_err(Error::from)
    }
}
