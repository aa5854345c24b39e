use async_trait::async_trait;
use enum_utils::TryFromRepr;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio_postgres::Row;

use super::{asset, user, Client, Error};

#[derive(Clone, Debug)]
pub struct Ticket {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub priority: Priority,
    pub category: String,
    pub created_by: user::Id,
    pub assigned_to: Option<user::Id>,
    pub asset: Option<asset::Id>,
    pub resolved_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Status {
    /// Filed, nobody has looked at it yet.
    New = 1,

    InProgress = 2,

    /// Waiting on the requester or a third party.
    OnHold = 3,

    Resolved = 4,

    Closed = 5,
}

impl Status {
    pub const ALL: [Self; 5] = [
        Self::New,
        Self::InProgress,
        Self::OnHold,
        Self::Resolved,
        Self::Closed,
    ];

    /// Whether entering this status stamps the resolution time.
    pub fn is_resolution(self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

int2_enum!(Status, "status");

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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Priority {
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl Priority {
    pub const ALL: [Self; 4] =
        [Self::Low, Self::Medium, Self::High, Self::Critical];
}

int2_enum!(Priority, "priority");

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Filter {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub created_by: Option<user::Id>,
    pub assigned_to: Option<user::Id>,
}

impl Filter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.status.map_or(true, |s| ticket.status == s)
            && self.priority.map_or(true, |p| ticket.priority == p)
            && self.created_by.map_or(true, |u| ticket.created_by == u)
            && self
                .assigned_to
                .map_or(true, |u| ticket.assigned_to == Some(u))
    }
}

#[derive(Clone, Debug)]
pub struct Comment {
    pub id: CommentId,
    pub ticket: Id,
    pub author: user::Id,
    pub comment: String,
    pub internal_only: bool,
    pub created_at: OffsetDateTime,
}

uuid_id!(CommentId);

#[derive(Clone, Debug)]
pub struct Attachment {
    pub id: AttachmentId,
    pub ticket: Id,
    pub file_name: String,
    /// Public path the stored file is served under.
    pub file_path: String,
    pub uploaded_by: user::Id,
    pub created_at: OffsetDateTime,
}

uuid_id!(AttachmentId);

#[async_trait]
pub trait Tickets {
    /// Newest first.
    async fn list_tickets(&self, filter: &Filter) -> Result<Vec<Ticket>, Error>;

    async fn get_ticket_by_id(&self, id: Id) -> Result<Option<Ticket>, Error>;

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), Error>;

    /// Overwrites the ticket row.
    ///
    /// Returns `false` if the ticket no longer exists, in which case nothing
    /// is written.
    async fn update_ticket(&self, ticket: &Ticket) -> Result<bool, Error>;

    /// Removes the ticket together with its comments and attachments in a
    /// single atomic write, returning the removed attachments.
    async fn delete_ticket(&self, id: Id) -> Result<Vec<Attachment>, Error>;

    /// Newest first.
    async fn list_tickets_by_asset(
        &self,
        asset: asset::Id,
    ) -> Result<Vec<Ticket>, Error>;

    /// Returns `false`, writing nothing, if the ticket no longer exists.
    async fn add_comment(&self, comment: &Comment) -> Result<bool, Error>;

    /// Oldest first.
    async fn list_comments(&self, ticket: Id) -> Result<Vec<Comment>, Error>;

    /// Returns `false`, writing nothing, if the ticket no longer exists.
    async fn add_attachment(
        &self,
        attachment: &Attachment,
    ) -> Result<bool, Error>;

    /// Oldest first.
    async fn list_attachments(
        &self,
        ticket: Id,
    ) -> Result<Vec<Attachment>, Error>;
}

const COLUMNS: &str = "id, title, description, status, priority, category, \
                       created_by_id, assigned_to_id, asset_id, \
                       resolved_at, created_at, updated_at";

fn from_row(row: &Row) -> Ticket {
    Ticket {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        status: row.get("status"),
        priority: row.get("priority"),
        category: row.get("category"),
        created_by: row.get("created_by_id"),
        assigned_to: row.get("assigned_to_id"),
        asset: row.get("asset_id"),
        resolved_at: row.get("resolved_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn comment_from_row(row: &Row) -> Comment {
    Comment {
        id: row.get("id"),
        ticket: row.get("ticket_id"),
        author: row.get("user_id"),
        comment: row.get("comment"),
        internal_only: row.get("internal_only"),
        created_at: row.get("created_at"),
    }
}

fn attachment_from_row(row: &Row) -> Attachment {
    Attachment {
        id: row.get("id"),
        ticket: row.get("ticket_id"),
        file_name: row.get("file_name"),
        file_path: row.get("file_path"),
        uploaded_by: row.get("uploaded_by_id"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl Tickets for Client {
    async fn list_tickets(
        &self,
        filter: &Filter,
    ) -> Result<Vec<Ticket>, Error> {
        let sql = format!(
            "SELECT {COLUMNS} \
             FROM tickets \
             WHERE ($1::INT2 IS NULL OR status = $1) \
               AND ($2::INT2 IS NULL OR priority = $2) \
               AND ($3::UUID IS NULL OR created_by_id = $3) \
               AND ($4::UUID IS NULL OR assigned_to_id = $4) \
             ORDER BY created_at DESC, \
                      id DESC"
        );

        Ok(self
            .0
            .query(
                sql.as_str(),
                &[
                    &filter.status,
                    &filter.priority,
                    &filter.created_by,
                    &filter.assigned_to,
                ],
            )
            .await?
            .iter()
            .map(from_row)
            .collect())
    }

    async fn get_ticket_by_id(&self, id: Id) -> Result<Option<Ticket>, Error> {
        let sql = format!("SELECT {COLUMNS} FROM tickets WHERE id = $1");
        Ok(self
            .0
            .query_opt(sql.as_str(), &[&id])
            .await?
            .as_ref()
            .map(from_row))
    }

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), Error> {
        const SQL: &str = "\
            INSERT INTO tickets (id, title, description, status, priority, \
                                 category, created_by_id, assigned_to_id, \
                                 asset_id, resolved_at, created_at, \
                                 updated_at) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)";

        self.0
            .execute(
                SQL,
                &[
                    &ticket.id,
                    &ticket.title,
                    &ticket.description,
                    &ticket.status,
                    &ticket.priority,
                    &ticket.category,
                    &ticket.created_by,
                    &ticket.assigned_to,
                    &ticket.asset,
                    &ticket.resolved_at,
                    &ticket.created_at,
                    &ticket.updated_at,
                ],
            )
            .await
            .map(drop)
            .map_err(Error::from)
    }

    async fn update_ticket(&self, ticket: &Ticket) -> Result<bool, Error> {
        const SQL: &str = "\
            UPDATE tickets \
            SET title = $2, \
                description = $3, \
                status = $4, \
                priority = $5, \
                category = $6, \
                assigned_to_id = $7, \
                asset_id = $8, \
                resolved_at = $9, \
                updated_at = $10 \
            WHERE id = $1";

        let written = self
            .0
            .execute(
                SQL,
                &[
                    &ticket.id,
                    &ticket.title,
                    &ticket.description,
                    &ticket.status,
                    &ticket.priority,
                    &ticket.category,
                    &ticket.assigned_to,
                    &ticket.asset,
                    &ticket.resolved_at,
                    &ticket.updated_at,
                ],
            )
            .await?;

        Ok(written == 1)
    }

    async fn delete_ticket(&self, id: Id) -> Result<Vec<Attachment>, Error> {
        // Children and ticket go in one statement.
        const SQL: &str = "\
            WITH removed_comments AS ( \
                DELETE FROM ticket_comments WHERE ticket_id = $1 \
            ), \
            removed_attachments AS ( \
                DELETE FROM ticket_attachments WHERE ticket_id = $1 \
                RETURNING id, ticket_id, file_name, file_path, \
                          uploaded_by_id, created_at \
            ), \
            removed_ticket AS ( \
                DELETE FROM tickets WHERE id = $1 \
            ) \
            SELECT id, ticket_id, file_name, file_path, \
                   uploaded_by_id, created_at \
            FROM removed_attachments";

        Ok(self
            .0
            .query(SQL, &[&id])
            .await?
            .iter()
            .map(attachment_from_row)
            .collect())
    }

    async fn list_tickets_by_asset(
        &self,
        asset: asset::Id,
    ) -> Result<Vec<Ticket>, Error> {
        let sql = format!(
            "SELECT {COLUMNS} \
             FROM tickets \
             WHERE asset_id = $1 \
             ORDER BY created_at DESC, \
                      id DESC"
        );

        Ok(self
            .0
            .query(sql.as_str(), &[&asset])
            .await?
            .iter()
            .map(from_row)
            .collect())
    }

    async fn add_comment(&self, comment: &Comment) -> Result<bool, Error> {
        const SQL: &str = "\
            INSERT INTO ticket_comments (id, ticket_id, user_id, comment, \
                                         internal_only, created_at) \
            SELECT $1::UUID, id, $3::UUID, $4::TEXT, $5::BOOL, \
                   $6::TIMESTAMPTZ \
            FROM tickets \
            WHERE id = $2";

        let written = self
            .0
            .execute(
                SQL,
                &[
                    &comment.id,
                    &comment.ticket,
                    &comment.author,
                    &comment.comment,
                    &comment.internal_only,
                    &comment.created_at,
                ],
            )
            .await?;

        Ok(written == 1)
    }

    async fn list_comments(&self, ticket: Id) -> Result<Vec<Comment>, Error> {
        const SQL: &str = "\
            SELECT id, ticket_id, user_id, comment, internal_only, \
                   created_at \
            FROM ticket_comments \
            WHERE ticket_id = $1 \
            ORDER BY created_at ASC, \
                     id ASC";

        Ok(self
            .0
            .query(SQL, &[&ticket])
            .await?
            .iter()
            .map(comment_from_row)
            .collect())
    }

    async fn add_attachment(
        &self,
        attachment: &Attachment,
    ) -> Result<bool, Error> {
        const SQL: &str = "\
            INSERT INTO ticket_attachments (id, ticket_id, file_name, \
                                            file_path, uploaded_by_id, \
                                            created_at) \
            SELECT $1::UUID, id, $3::TEXT, $4::TEXT, $5::UUID, \
                   $6::TIMESTAMPTZ \
            FROM tickets \
            WHERE id = $2";

        let written = self
            .0
            .execute(
                SQL,
                &[
                    &attachment.id,
                    &attachment.ticket,
                    &attachment.file_name,
                    &attachment.file_path,
                    &attachment.uploaded_by,
                    &attachment.created_at,
                ],
            )
            .await?;

        Ok(written == 1)
    }

    async fn list_attachments(
        &self,
        ticket: Id,
    ) -> Result<Vec<Attachment>, Error> {
        const SQL: &str = "\
            SELECT id, ticket_id, file_name, file_path, uploaded_by_id, \
                   created_at \
            FROM ticket_attachments \
            WHERE ticket_id = $1 \
            ORDER BY created_at ASC, \
                     id ASC";

        Ok(self
            .0
            .query(SQL, &[&ticket])
            .await?
            .iter()
            .map(attachment_from_row)
            .collect())
    }
}
