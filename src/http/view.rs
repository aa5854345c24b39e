//! Resolves stored references into the nested shapes of [`api`].

use std::collections::HashMap;

use derive_more::{Display, From};
use itertools::Itertools as _;

use crate::{
    api,
    db::{self, asset, ticket, user},
};

/// A stored row points at a user or asset that is gone.
#[derive(Debug, Display, From)]
pub enum ViewError {
    #[from]
    DbError(db::Error),
    #[display("user {_0} not found")]
    UserNotFound(user::Id),
    #[display("asset {_0} not found")]
    AssetNotFound(asset::Id),
}

pub struct Lookup {
    users: HashMap<user::Id, db::User>,
    assets: HashMap<asset::Id, db::Asset>,
}

impl Lookup {
    pub async fn load(
        db: &dyn db::Store,
        user_ids: impl IntoIterator<Item = user::Id>,
        asset_ids: impl IntoIterator<Item = asset::Id>,
    ) -> Result<Self, db::Error> {
        let user_ids = user_ids.into_iter().unique().collect::<Vec<_>>();
        let asset_ids = asset_ids.into_iter().unique().collect::<Vec<_>>();

        let (users, assets) = tokio::try_join!(
            db.get_users_by_ids(&user_ids),
            db.get_assets_by_ids(&asset_ids),
        )?;

        Ok(Self { users, assets })
    }

    pub async fn users(
        db: &dyn db::Store,
        user_ids: impl IntoIterator<Item = user::Id>,
    ) -> Result<Self, db::Error> {
        Self::load(db, user_ids, None).await
    }

    /// Loads everything the given tickets refer to.
    pub async fn for_tickets(
        db: &dyn db::Store,
        tickets: &[db::Ticket],
    ) -> Result<Self, db::Error> {
        Self::load(
            db,
            tickets.iter().flat_map(|t| {
                std::iter::once(t.created_by).chain(t.assigned_to)
            }),
            tickets.iter().filter_map(|t| t.asset),
        )
        .await
    }

    pub fn user(&self, id: user::Id) -> Result<api::User, ViewError> {
        self.users
            .get(&id)
            .map(api::User::from)
            .ok_or(ViewError::UserNotFound(id))
    }

    pub fn ticket(
        &self,
        ticket: db::Ticket,
    ) -> Result<api::Ticket, ViewError> {
        let created_by = self.user(ticket.created_by)?;
        let assigned_to =
            ticket.assigned_to.map(|id| self.user(id)).transpose()?;
        let asset = ticket
            .asset
            .map(|id| {
                self.assets
                    .get(&id)
                    .map(api::asset::Summary::from)
                    .ok_or(ViewError::AssetNotFound(id))
            })
            .transpose()?;

        Ok(api::Ticket {
            id: ticket.id,
            title: ticket.title,
            description: ticket.description,
            status: ticket.status,
            priority: ticket.priority,
            category: ticket.category,
            created_by,
            assigned_to,
            asset,
            resolved_at: ticket.resolved_at,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
        })
    }

    pub fn comment(
        &self,
        comment: ticket::Comment,
    ) -> Result<api::ticket::Comment, ViewError> {
        Ok(api::ticket::Comment {
            id: comment.id,
            ticket_id: comment.ticket,
            user: self.user(comment.author)?,
            comment: comment.comment,
            internal_only: comment.internal_only,
            created_at: comment.created_at,
        })
    }

    pub fn attachment(
        &self,
        attachment: ticket::Attachment,
    ) -> Result<api::ticket::Attachment, ViewError> {
        Ok(api::ticket::Attachment {
            id: attachment.id,
            ticket_id: attachment.ticket,
            file_name: attachment.file_name,
            file_path: attachment.file_path,
            uploaded_by: self.user(attachment.uploaded_by)?,
            created_at: attachment.created_at,
        })
    }

    pub fn asset(&self, asset: db::Asset) -> Result<api::Asset, ViewError> {
        let assigned_to = asset
            .assigned_to
            .map(|id| self.users.get(&id).ok_or(ViewError::UserNotFound(id)))
            .transpose()?;
        Ok(api::Asset::new(asset, assigned_to))
    }

    pub fn history_entry(
        &self,
        entry: asset::HistoryEntry,
    ) -> Result<api::asset::HistoryEntry, ViewError> {
        Ok(api::asset::HistoryEntry {
            id: entry.id,
            asset_id: entry.asset,
            changed_by: self.user(entry.changed_by)?,
            change_type: entry.change_type,
            old_value: entry.old_value,
            new_value: entry.new_value,
            created_at: entry.created_at,
        })
    }
}
