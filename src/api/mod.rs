//! JSON shapes returned by the HTTP API.

pub mod asset;
pub mod auth;
pub mod event;
pub mod stats;
pub mod ticket;
pub mod user;

use serde::{Deserialize, Serialize};

pub use self::{asset::Asset, event::Event, ticket::Ticket, user::User};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Suggestion {
    pub suggestion: String,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Health {
    pub status: String,
}
