use serde::{Deserialize, Serialize};

use super::Ticket;

/// Notification pushed to live subscribers.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "data")]
pub enum Event {
    TicketCreated(Ticket),
}

impl Event {
    /// Server-sent event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TicketCreated(_) => "ticket-created",
        }
    }
}
