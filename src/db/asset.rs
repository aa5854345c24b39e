use std::collections::HashMap;

use async_trait::async_trait;
use enum_utils::TryFromRepr;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use tokio_postgres::Row;

use super::{unique, user, Client, Error};

/// A tracked piece of hardware.
///
/// This is also the snapshot format written to [`HistoryEntry`] values.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
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
    pub assigned_to: Option<user::Id>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

uuid_id!(Id);

/// Older clients spell `IN_STOCK` as `AVAILABLE` and `ASSIGNED` as
/// `IN_USE`; both spellings are accepted, the canonical one is written.
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
    #[serde(alias = "AVAILABLE")]
    InStock = 1,

    #[serde(alias = "IN_USE")]
    Assigned = 2,

    InRepair = 3,

    Retired = 4,
}

impl Status {
    pub const ALL: [Self; 4] =
        [Self::InStock, Self::Assigned, Self::InRepair, Self::Retired];
}

int2_enum!(Status, "asset status");

#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub id: HistoryId,
    pub asset: Id,
    pub changed_by: user::Id,
    pub change_type: ChangeType,
    /// JSON snapshot of the [`Asset`] before the change.
    pub old_value: String,
    /// JSON snapshot of the [`Asset`] after the change.
    pub new_value: String,
    pub created_at: OffsetDateTime,
}

uuid_id!(HistoryId);

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
pub enum ChangeType {
    UpdatedDetails = 1,
}

int2_enum!(ChangeType, "change type");

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Filter {
    pub status: Option<Status>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Case-insensitive substring of the location.
    pub location: Option<String>,
}

impl Filter {
    pub fn matches(&self, asset: &Asset) -> bool {
        let location = self.location.as_deref().map(str::to_lowercase);
        self.status.map_or(true, |s| asset.status == s)
            && self
                .kind
                .as_deref()
                .map_or(true, |k| asset.kind.as_deref() == Some(k))
            && location.map_or(true, |needle| {
                asset
                    .location
                    .as_deref()
                    .is_some_and(|l| l.to_lowercase().contains(&needle))
            })
    }
}

#[async_trait]
pub trait Assets {
    async fn list_assets(&self, filter: &Filter) -> Result<Vec<Asset>, Error>;

    async fn get_asset_by_id(&self, id: Id) -> Result<Option<Asset>, Error>;

    async fn get_assets_by_ids(
        &self,
        ids: &[Id],
    ) -> Result<HashMap<Id, Asset>, Error>;

    /// Fails with [`Error::Duplicate`] when the asset tag is taken, leaving
    /// storage untouched.
    async fn insert_asset(&self, asset: &Asset) -> Result<(), Error>;

    /// Overwrites the asset row and appends `entry` in one atomic write.
    ///
    /// Returns `false` if the asset no longer exists, in which case nothing
    /// is written.
    async fn update_asset(
        &self,
        asset: &Asset,
        entry: &HistoryEntry,
    ) -> Result<bool, Error>;

    /// Newest first.
    async fn list_asset_history(
        &self,
        asset: Id,
    ) -> Result<Vec<HistoryEntry>, Error>;
}

const COLUMNS: &str = "id, asset_tag, serial_number, type, brand, model, \
                       status, location, purchase_date, warranty_expiry, \
                       assigned_to_id, created_at, updated_at";

fn from_row(row: &Row) -> Asset {
    Asset {
        id: row.get("id"),
        asset_tag: row.get("asset_tag"),
        serial_number: row.get("serial_number"),
        kind: row.get("type"),
        brand: row.get("brand"),
        model: row.get("model"),
        status: row.get("status"),
        location: row.get("location"),
        purchase_date: row.get("purchase_date"),
        warranty_expiry: row.get("warranty_expiry"),
        assigned_to: row.get("assigned_to_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl Assets for Client {
    async fn list_assets(&self, filter: &Filter) -> Result<Vec<Asset>, Error> {
        let sql = format!(
            "SELECT {COLUMNS} \
             FROM assets \
             WHERE ($1::INT2 IS NULL OR status = $1) \
               AND ($2::TEXT IS NULL OR type = $2) \
               AND ($3::TEXT IS NULL OR location ILIKE '%' || $3 || '%') \
             ORDER BY asset_tag ASC"
        );

        Ok(self
            .0
            .query(
                sql.as_str(),
                &[&filter.status, &filter.kind, &filter.location],
            )
            .await?
            .iter()
            .map(from_row)
            .collect())
    }

    async fn get_asset_by_id(&self, id: Id) -> Result<Option<Asset>, Error> {
        let sql = format!("SELECT {COLUMNS} FROM assets WHERE id = $1");
        Ok(self
            .0
            .query_opt(sql.as_str(), &[&id])
            .await?
            .as_ref()
            .map(from_row))
    }

    async fn get_assets_by_ids(
        &self,
        ids: &[Id],
    ) -> Result<HashMap<Id, Asset>, Error> {
        let sql = format!(
            "SELECT {COLUMNS} \
             FROM assets \
             WHERE id IN (SELECT unnest($1::UUID[]))"
        );

        Ok(self
            .0
            .query(sql.as_str(), &[&ids])
            .await?
            .iter()
            .map(|row| {
                let asset = from_row(row);
                (asset.id, asset)
            })
            .collect())
    }

    async fn insert_asset(&self, asset: &Asset) -> Result<(), Error> {
        const SQL: &str = "\
            INSERT INTO assets (id, asset_tag, serial_number, type, brand, \
                                model, status, location, purchase_date, \
                                warranty_expiry, assigned_to_id, created_at, \
                                updated_at) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)";

        self.0
            .execute(
                SQL,
                &[
                    &asset.id,
                    &asset.asset_tag,
                    &asset.serial_number,
                    &asset.kind,
                    &asset.brand,
                    &asset.model,
                    &asset.status,
                    &asset.location,
                    &asset.purchase_date,
                    &asset.warranty_expiry,
                    &asset.assigned_to,
                    &asset.created_at,
                    &asset.updated_at,
                ],
            )
            .await
            .map(drop)
            .map_err(|e| unique(e, "asset tag"))
    }

    async fn update_asset(
        &self,
        asset: &Asset,
        entry: &HistoryEntry,
    ) -> Result<bool, Error> {
        const SQL: &str = "\
            WITH updated AS ( \
                UPDATE assets \
                SET serial_number = $2, \
                    type = $3, \
                    brand = $4, \
                    model = $5, \
                    status = $6, \
                    location = $7, \
                    purchase_date = $8, \
                    warranty_expiry = $9, \
                    assigned_to_id = $10, \
                    updated_at = $11 \
                WHERE id = $1 \
                RETURNING id \
            ) \
            INSERT INTO asset_history (id, asset_id, changed_by_id, \
                                       change_type, old_value, new_value, \
                                       created_at) \
            SELECT $12, id, $13, $14, $15, $16, $17 \
            FROM updated";

        let written = self
            .0
            .execute(
                SQL,
                &[
                    &asset.id,
                    &asset.serial_number,
                    &asset.kind,
                    &asset.brand,
                    &asset.model,
                    &asset.status,
                    &asset.location,
                    &asset.purchase_date,
                    &asset.warranty_expiry,
                    &asset.assigned_to,
                    &asset.updated_at,
                    &entry.id,
                    &entry.changed_by,
                    &entry.change_type,
                    &entry.old_value,
                    &entry.new_value,
                    &entry.created_at,
                ],
            )
            .await?;

        Ok(written == 1)
    }

    async fn list_asset_history(
        &self,
        asset: Id,
    ) -> Result<Vec<HistoryEntry>, Error> {
        const SQL: &str = "\
            SELECT id, asset_id, changed_by_id, change_type, old_value, \
                   new_value, created_at \
            FROM asset_history \
            WHERE asset_id = $1 \
            ORDER BY created_at DESC, \
                     id DESC";

        Ok(self
            .0
            .query(SQL, &[&asset])
            .await?
            .into_iter()
            .map(|row| HistoryEntry {
                id: row.get("id"),
                asset: row.get("asset_id"),
                changed_by: row.get("changed_by_id"),
                change_type: row.get("change_type"),
                old_value: row.get("old_value"),
                new_value: row.get("new_value"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}
