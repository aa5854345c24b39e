use derive_more::Display;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::db::{
    asset, user,
    ticket::{Id, Priority, Status, Ticket},
};

use super::{present, require, Invalid};

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub priority: Option<Priority>,
    pub category: String,
    #[serde(default)]
    pub asset_id: Option<asset::Id>,
}

/// Builds a fresh ticket: status `NEW`, priority `MEDIUM` unless given.
pub fn new_ticket(
    input: NewTicket,
    created_by: user::Id,
    now: OffsetDateTime,
) -> Result<Ticket, Invalid> {
    require(&input.title, "title is required")?;
    require(&input.description, "description is required")?;

    Ok(Ticket {
        id: Id::new(),
        title: input.title,
        description: input.description,
        status: Status::New,
        priority: input.priority.unwrap_or(Priority::Medium),
        category: input.category,
        created_by,
        assigned_to: None,
        asset: input.asset_id,
        resolved_at: None,
        created_at: now,
        updated_at: now,
    })
}

/// Staff edit of a ticket. Absent fields are left alone; an explicit `null`
/// for `assignedToId` or `assetId` clears the reference.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "present")]
    pub assigned_to_id: Option<Option<user::Id>>,
    #[serde(default, deserialize_with = "present")]
    pub asset_id: Option<Option<asset::Id>>,
}

/// Applies `patch` to `ticket`.
///
/// Any status may follow any other. Entering `RESOLVED` or `CLOSED` stamps
/// `resolved_at` with `now`; other statuses keep whatever was stamped
/// before.
pub fn apply_update(ticket: &mut Ticket, patch: Patch, now: OffsetDateTime) {
    if let Some(status) = patch.status {
        ticket.status = status;
        if status.is_resolution() {
            ticket.resolved_at = Some(now);
        }
    }
    if let Some(priority) = patch.priority {
        ticket.priority = priority;
    }
    if let Some(assigned_to) = patch.assigned_to_id {
        ticket.assigned_to = assigned_to;
    }
    if let Some(asset) = patch.asset_id {
        ticket.asset = asset;
    }
    ticket.updated_at = now;
}

#[derive(Clone, Copy, Debug, Display, PartialEq)]
#[display("only closed tickets can be deleted")]
pub struct NotClosed;

impl std::error::Error for NotClosed {}

pub fn ensure_deletable(ticket: &Ticket) -> Result<(), NotClosed> {
    if ticket.status == Status::Closed {
        Ok(())
    } else {
        Err(NotClosed)
    }
}
