use serde::{Deserialize, Serialize};

use crate::db::{asset, ticket};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_tickets: usize,
    /// Tickets neither resolved nor closed.
    pub open_tickets: usize,
    pub resolved_tickets: usize,
    pub tickets_by_status: Vec<Bucket<ticket::Status>>,
    pub tickets_by_priority: Vec<Bucket<ticket::Priority>>,
    pub total_assets: usize,
    pub assets_by_status: Vec<Bucket<asset::Status>>,
}

/// One bar of a dashboard chart.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Bucket<T> {
    pub name: T,
    pub value: usize,
}
