//! In-process [`Store`](super::Store) implementation.
//!
//! Every operation takes the single table lock, so multi-row writes
//! (ticket deletion, asset update with history) are atomic just like their
//! PostgreSQL counterparts.

use std::collections::HashMap;

use async_trait::async_trait;
use itertools::Itertools as _;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use super::{
    asset::{self, Asset, Assets, HistoryEntry},
    stats::Stats,
    ticket::{self, Attachment, Comment, Ticket, Tickets},
    user::{self, PasswordHash, User, Users},
    Error,
};

#[derive(Default)]
pub struct Memory {
    tables: Mutex<Tables>,
}

/// Rows are kept in insertion order.
#[derive(Default)]
struct Tables {
    users: Vec<User>,
    tickets: Vec<Ticket>,
    comments: Vec<Comment>,
    attachments: Vec<Attachment>,
    assets: Vec<Asset>,
    history: Vec<HistoryEntry>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Users for Memory {
    async fn insert_user(&self, user: &User) -> Result<(), Error> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(Error::Duplicate("email"));
        }
        tables.users.push(user.clone());
        Ok(())
    }

    async fn get_user_by_id(
        &self,
        id: user::Id,
    ) -> Result<Option<User>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<User>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn get_users_by_ids(
        &self,
        ids: &[user::Id],
    ) -> Result<HashMap<user::Id, User>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .map(|u| (u.id, u.clone()))
            .collect())
    }

    async fn set_reset_token(
        &self,
        id: user::Id,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), Error> {
        let mut tables = self.tables.lock().await;
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == id) {
            user.reset_token = Some(token.to_owned());
            user.reset_token_expires_at = Some(expires_at);
        }
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
        password_hash: &PasswordHash,
    ) -> Result<Option<user::Id>, Error> {
        let mut tables = self.tables.lock().await;
        let Some(user) = tables.users.iter_mut().find(|u| {
            u.reset_token.as_deref() == Some(token)
                && u.reset_token_expires_at.is_some_and(|exp| exp > now)
        }) else {
            return Ok(None);
        };
        user.password_hash = password_hash.clone();
        user.reset_token = None;
        user.reset_token_expires_at = None;
        Ok(Some(user.id))
    }
}

#[async_trait]
impl Tickets for Memory {
    async fn list_tickets(
        &self,
        filter: &ticket::Filter,
    ) -> Result<Vec<Ticket>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .tickets
            .iter()
            .rev()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn get_ticket_by_id(
        &self,
        id: ticket::Id,
    ) -> Result<Option<Ticket>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), Error> {
        self.tables.lock().await.tickets.push(ticket.clone());
        Ok(())
    }

    async fn update_ticket(&self, ticket: &Ticket) -> Result<bool, Error> {
        let mut tables = self.tables.lock().await;
        let Some(existing) =
            tables.tickets.iter_mut().find(|t| t.id == ticket.id)
        else {
            return Ok(false);
        };
        *existing = ticket.clone();
        Ok(true)
    }

    async fn delete_ticket(
        &self,
        id: ticket::Id,
    ) -> Result<Vec<Attachment>, Error> {
        let mut tables = self.tables.lock().await;
        tables.comments.retain(|c| c.ticket != id);
        let (removed, kept) = std::mem::take(&mut tables.attachments)
            .into_iter()
            .partition(|a| a.ticket == id);
        tables.attachments = kept;
        tables.tickets.retain(|t| t.id != id);
        Ok(removed)
    }

    async fn list_tickets_by_asset(
        &self,
        asset: asset::Id,
    ) -> Result<Vec<Ticket>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .tickets
            .iter()
            .rev()
            .filter(|t| t.asset == Some(asset))
            .cloned()
            .collect())
    }

    async fn add_comment(&self, comment: &Comment) -> Result<bool, Error> {
        let mut tables = self.tables.lock().await;
        if !tables.tickets.iter().any(|t| t.id == comment.ticket) {
            return Ok(false);
        }
        tables.comments.push(comment.clone());
        Ok(true)
    }

    async fn list_comments(
        &self,
        ticket: ticket::Id,
    ) -> Result<Vec<Comment>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .comments
            .iter()
            .filter(|c| c.ticket == ticket)
            .cloned()
            .collect())
    }

    async fn add_attachment(
        &self,
        attachment: &Attachment,
    ) -> Result<bool, Error> {
        let mut tables = self.tables.lock().await;
        if !tables.tickets.iter().any(|t| t.id == attachment.ticket) {
            return Ok(false);
        }
        tables.attachments.push(attachment.clone());
        Ok(true)
    }

    async fn list_attachments(
        &self,
        ticket: ticket::Id,
    ) -> Result<Vec<Attachment>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .attachments
            .iter()
            .filter(|a| a.ticket == ticket)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Assets for Memory {
    async fn list_assets(
        &self,
        filter: &asset::Filter,
    ) -> Result<Vec<Asset>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .assets
            .iter()
            .filter(|a| filter.matches(a))
            .sorted_by(|a, b| a.asset_tag.cmp(&b.asset_tag))
            .cloned()
            .collect())
    }

    async fn get_asset_by_id(
        &self,
        id: asset::Id,
    ) -> Result<Option<Asset>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.assets.iter().find(|a| a.id == id).cloned())
    }

    async fn get_assets_by_ids(
        &self,
        ids: &[asset::Id],
    ) -> Result<HashMap<asset::Id, Asset>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .assets
            .iter()
            .filter(|a| ids.contains(&a.id))
            .map(|a| (a.id, a.clone()))
            .collect())
    }

    async fn insert_asset(&self, asset: &Asset) -> Result<(), Error> {
        let mut tables = self.tables.lock().await;
        if tables.assets.iter().any(|a| a.asset_tag == asset.asset_tag) {
            return Err(Error::Duplicate("asset tag"));
        }
        tables.assets.push(asset.clone());
        Ok(())
    }

    async fn update_asset(
        &self,
        asset: &Asset,
        entry: &HistoryEntry,
    ) -> Result<bool, Error> {
        let mut tables = self.tables.lock().await;
        let Some(existing) = tables.assets.iter_mut().find(|a| a.id == asset.id)
        else {
            return Ok(false);
        };
        *existing = asset.clone();
        tables.history.push(entry.clone());
        Ok(true)
    }

    async fn list_asset_history(
        &self,
        asset: asset::Id,
    ) -> Result<Vec<HistoryEntry>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .history
            .iter()
            .rev()
            .filter(|h| h.asset == asset)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Stats for Memory {
    async fn count_tickets_by_status(
        &self,
    ) -> Result<Vec<(ticket::Status, usize)>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.tickets.iter().counts_by(|t| t.status).into_iter().collect())
    }

    async fn count_tickets_by_priority(
        &self,
    ) -> Result<Vec<(ticket::Priority, usize)>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .tickets
            .iter()
            .counts_by(|t| t.priority)
            .into_iter()
            .collect())
    }

    async fn count_assets_by_status(
        &self,
    ) -> Result<Vec<(asset::Status, usize)>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.assets.iter().counts_by(|a| a.status).into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use crate::domain::{self, ticket::NewTicket};

    use super::*;

    fn user(email: &str) -> User {
        User {
            id: user::Id::new(),
            email: email.to_owned(),
            first_name: "Test".to_owned(),
            last_name: "User".to_owned(),
            password_hash: PasswordHash::new("password", 4)
                .unwrap(),
            role: user::Role::User,
            department: None,
            reset_token: None,
            reset_token_expires_at: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_email() {
        let store = Memory::new();
        store.insert_user(&user("a@example.com")).await.unwrap();
        let err = store.insert_user(&user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, Error::Duplicate("email")));
    }

    #[tokio::test]
    async fn reset_token_is_single_use() {
        let store = Memory::new();
        let alice = user("alice@example.com");
        store.insert_user(&alice).await.unwrap();

        let now = OffsetDateTime::now_utc();
        store
            .set_reset_token(alice.id, "token", now + Duration::hours(1))
            .await
            .unwrap();

        let hash = PasswordHash::new("new", 4).unwrap();
        let first = store.consume_reset_token("token", now, &hash).await;
        let second = store.consume_reset_token("token", now, &hash).await;
        assert_eq!(first.unwrap(), Some(alice.id));
        assert_eq!(second.unwrap(), None);

        let stored = store.get_user_by_id(alice.id).await.unwrap().unwrap();
        assert!(stored.password_hash.matches("new"));
        assert_eq!(stored.reset_token, None);
        assert_eq!(stored.reset_token_expires_at, None);
    }

    #[tokio::test]
    async fn expired_reset_token_is_rejected() {
        let store = Memory::new();
        let alice = user("alice@example.com");
        store.insert_user(&alice).await.unwrap();

        let now = OffsetDateTime::now_utc();
        store
            .set_reset_token(alice.id, "token", now - Duration::seconds(1))
            .await
            .unwrap();

        let hash = PasswordHash::new("new", 4).unwrap();
        let consumed = store.consume_reset_token("token", now, &hash).await;
        assert_eq!(consumed.unwrap(), None);

        let stored = store.get_user_by_id(alice.id).await.unwrap().unwrap();
        assert!(stored.password_hash.matches("password"));
    }

    fn printer_jam(created_by: user::Id) -> Ticket {
        domain::ticket::new_ticket(
            NewTicket {
                title: "Printer jam".to_owned(),
                description: "Paper stuck in tray 2".to_owned(),
                priority: None,
                category: "Hardware".to_owned(),
                asset_id: None,
            },
            created_by,
            OffsetDateTime::now_utc(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn update_of_deleted_ticket_writes_nothing() {
        let store = Memory::new();
        let jam = printer_jam(user::Id::new());
        store.insert_ticket(&jam).await.unwrap();

        let mut stale = store.get_ticket_by_id(jam.id).await.unwrap().unwrap();
        store.delete_ticket(jam.id).await.unwrap();
        domain::ticket::apply_update(
            &mut stale,
            domain::ticket::Patch {
                status: Some(ticket::Status::Closed),
                ..Default::default()
            },
            OffsetDateTime::now_utc(),
        );

        assert!(!store.update_ticket(&stale).await.unwrap());
        assert!(store.get_ticket_by_id(jam.id).await.unwrap().is_none());
        assert!(store
            .list_tickets(&ticket::Filter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn update_overwrites_existing_ticket() {
        let store = Memory::new();
        let mut jam = printer_jam(user::Id::new());
        store.insert_ticket(&jam).await.unwrap();

        jam.priority = ticket::Priority::Critical;
        assert!(store.update_ticket(&jam).await.unwrap());

        let stored = store.get_ticket_by_id(jam.id).await.unwrap().unwrap();
        assert_eq!(stored.priority, ticket::Priority::Critical);
    }

    #[tokio::test]
    async fn children_of_deleted_ticket_are_not_stored() {
        let store = Memory::new();
        let author = user::Id::new();
        let jam = printer_jam(author);
        store.insert_ticket(&jam).await.unwrap();
        store.delete_ticket(jam.id).await.unwrap();

        let now = OffsetDateTime::now_utc();
        let comment = Comment {
            id: ticket::CommentId::new(),
            ticket: jam.id,
            author,
            comment: "Still jammed".to_owned(),
            internal_only: false,
            created_at: now,
        };
        let attachment = Attachment {
            id: ticket::AttachmentId::new(),
            ticket: jam.id,
            file_name: "jam.jpg".to_owned(),
            file_path: "/uploads/jam.jpg".to_owned(),
            uploaded_by: author,
            created_at: now,
        };

        assert!(!store.add_comment(&comment).await.unwrap());
        assert!(!store.add_attachment(&attachment).await.unwrap());
        assert!(store.list_comments(jam.id).await.unwrap().is_empty());
        assert!(store.list_attachments(jam.id).await.unwrap().is_empty());
    }
}
