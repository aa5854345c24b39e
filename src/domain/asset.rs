use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::db::{
    asset::{Asset, ChangeType, HistoryEntry, HistoryId, Id, Status},
    user,
};

use super::{present, require, Invalid};

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAsset {
    pub asset_tag: String,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub purchase_date: Option<Date>,
    #[serde(default)]
    pub warranty_expiry: Option<Date>,
    #[serde(default)]
    pub assigned_to_id: Option<user::Id>,
}

/// Builds a new asset, `IN_STOCK` unless a status is given.
pub fn new_asset(
    input: NewAsset,
    now: OffsetDateTime,
) -> Result<Asset, Invalid> {
    require(&input.asset_tag, "asset tag is required")?;

    Ok(Asset {
        id: Id::new(),
        asset_tag: input.asset_tag,
        serial_number: input.serial_number,
        kind: input.kind,
        brand: input.brand,
        model: input.model,
        status: input.status.unwrap_or(Status::InStock),
        location: input.location,
        purchase_date: input.purchase_date,
        warranty_expiry: input.warranty_expiry,
        assigned_to: input.assigned_to_id,
        created_at: now,
        updated_at: now,
    })
}

/// Partial asset update. Absent fields are left alone; an explicit `null`
/// clears the assignee or a date.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub purchase_date: Option<Option<Date>>,
    #[serde(default, deserialize_with = "present")]
    pub warranty_expiry: Option<Option<Date>>,
    #[serde(default, deserialize_with = "present")]
    pub assigned_to_id: Option<Option<user::Id>>,
}

pub fn apply_patch(asset: &mut Asset, patch: Patch, now: OffsetDateTime) {
    if let Some(serial_number) = patch.serial_number {
        asset.serial_number = Some(serial_number);
    }
    if let Some(kind) = patch.kind {
        asset.kind = Some(kind);
    }
    if let Some(brand) = patch.brand {
        asset.brand = Some(brand);
    }
    if let Some(model) = patch.model {
        asset.model = Some(model);
    }
    if let Some(status) = patch.status {
        asset.status = status;
    }
    if let Some(location) = patch.location {
        asset.location = Some(location);
    }
    if let Some(purchase_date) = patch.purchase_date {
        asset.purchase_date = purchase_date;
    }
    if let Some(warranty_expiry) = patch.warranty_expiry {
        asset.warranty_expiry = warranty_expiry;
    }
    if let Some(assigned_to) = patch.assigned_to_id {
        asset.assigned_to = assigned_to;
    }
    asset.updated_at = now;
}

/// Audit record holding whole before/after snapshots, written for every
/// update whatever fields changed.
pub fn history_entry(
    old: &Asset,
    new: &Asset,
    changed_by: user::Id,
    now: OffsetDateTime,
) -> Result<HistoryEntry, serde_json::Error> {
    Ok(HistoryEntry {
        id: HistoryId::new(),
        asset: new.id,
        changed_by,
        change_type: ChangeType::UpdatedDetails,
        old_value: serde_json::to_string(old)?,
        new_value: serde_json::to_string(new)?,
        created_at: now,
    })
}
