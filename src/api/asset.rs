use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{api, db};

pub use crate::db::asset::{
    Asset as Snapshot, ChangeType, HistoryId, Id, Status,
};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: Id,
    pub asset_tag: String,
    pub serial_number: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub status: Status,
    pub location: Option<String>,
    pub purchase_date: Option<Date>,
    pub warranty_expiry: Option<Date>,
    pub assigned_to: Option<api::User>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Asset {
    pub fn new(asset: db::Asset, assigned_to: Option<&db::User>) -> Self {
        Self {
            id: asset.id,
            asset_tag: asset.asset_tag,
            serial_number: asset.serial_number,
            kind: asset.kind,
            brand: asset.brand,
            model: asset.model,
            status: asset.status,
            location: asset.location,
            purchase_date: asset.purchase_date,
            warranty_expiry: asset.warranty_expiry,
            assigned_to: assigned_to.map(api::User::from),
            created_at: asset.created_at,
            updated_at: asset.updated_at,
        }
    }
}

/// Short form embedded in tickets.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub id: Id,
    pub asset_tag: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl From<&db::Asset> for Summary {
    fn from(asset: &db::Asset) -> Self {
        Self {
            id: asset.id,
            asset_tag: asset.asset_tag.clone(),
            kind: asset.kind.clone(),
        }
    }
}

/// An asset with its audit trail (newest first) and related tickets.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Details {
    #[serde(flatten)]
    pub asset: Asset,
    pub history: Vec<HistoryEntry>,
    pub tickets: Vec<api::ticket::Summary>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: HistoryId,
    pub asset_id: Id,
    pub changed_by: api::User,
    pub change_type: ChangeType,
    /// JSON-encoded [`Snapshot`] before the change.
    pub old_value: String,
    /// JSON-encoded [`Snapshot`] after the change.
    pub new_value: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
