use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use derive_more::{Display, From};

use crate::{
    api, db,
    domain::{self, Invalid},
};

use super::{
    error_response,
    view::{Lookup, ViewError},
    AdminOnly, AuthClaims, JsonBody, RequireRole, SharedAppState, Staff,
};

pub async fn list_assets(
    State(state): State<SharedAppState>,
    _: AuthClaims,
    Query(filter): Query<db::asset::Filter>,
) -> Result<Json<Vec<api::Asset>>, ListAssetsError> {
    let db = state.db.as_ref();

    let assets = db.list_assets(&filter).await?;
    let lookup =
        Lookup::users(db, assets.iter().filter_map(|a| a.assigned_to)).await?;

    let assets = assets
        .into_iter()
        .map(|asset| lookup.asset(asset))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(assets))
}

#[derive(Debug, Display, From)]
pub enum ListAssetsError {
    #[from]
    DbError(db::Error),
    #[from]
    ViewError(ViewError),
}

impl IntoResponse for ListAssetsError {
    fn into_response(self) -> Response {
        error_response(StatusCode::INTERNAL_SERVER_ERROR, self)
    }
}

/// Asset with its audit trail and the tickets filed against it, both newest
/// first.
pub async fn get_asset(
    State(state): State<SharedAppState>,
    _: AuthClaims,
    Path(id): Path<api::asset::Id>,
) -> Result<Json<api::asset::Details>, GetAssetError> {
    use GetAssetError as E;

    let db = state.db.as_ref();

    let asset = db.get_asset_by_id(id).await?.ok_or(E::AssetNotFound)?;
    let (history, tickets) = tokio::try_join!(
        db.list_asset_history(id),
        db.list_tickets_by_asset(id),
    )?;

    let lookup = Lookup::users(
        db,
        asset
            .assigned_to
            .into_iter()
            .chain(history.iter().map(|h| h.changed_by)),
    )
    .await?;

    Ok(Json(api::asset::Details {
        asset: lookup.asset(asset)?,
        history: history
            .into_iter()
            .map(|h| lookup.history_entry(h))
            .collect::<Result<_, _>>()?,
        tickets: tickets.iter().map(api::ticket::Summary::from).collect(),
    }))
}

#[derive(Debug, Display, From)]
pub enum GetAssetError {
    #[display("asset not found")]
    AssetNotFound,
    #[from]
    DbError(db::Error),
    #[from]
    ViewError(ViewError),
}

impl IntoResponse for GetAssetError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::AssetNotFound => StatusCode::NOT_FOUND,
            Self::DbError(_) | Self::ViewError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, self)
    }
}

pub async fn create_asset(
    State(state): State<SharedAppState>,
    _: RequireRole<AdminOnly>,
    JsonBody(input): JsonBody<domain::asset::NewAsset>,
) -> Result<(StatusCode, Json<api::Asset>), CreateAssetError> {
    use CreateAssetError as E;

    let db = state.db.as_ref();

    let asset = domain::asset::new_asset(input, domain::now())?;
    if let Some(user) = asset.assigned_to {
        db.get_user_by_id(user).await?.ok_or(E::AssigneeNotFound)?;
    }

    db.insert_asset(&asset).await.map_err(|e| match e {
        db::Error::Duplicate(_) => E::DuplicateTag,
        e => E::DbError(e),
    })?;

    let lookup = Lookup::users(db, asset.assigned_to).await?;

    Ok((StatusCode::CREATED, Json(lookup.asset(asset)?)))
}

#[derive(Debug, Display, From)]
pub enum CreateAssetError {
    #[display("assignee not found")]
    AssigneeNotFound,
    #[from]
    DbError(db::Error),
    #[display("asset tag already exists")]
    DuplicateTag,
    #[from]
    Invalid(Invalid),
    #[from]
    ViewError(ViewError),
}

impl IntoResponse for CreateAssetError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::AssigneeNotFound | Self::DuplicateTag | Self::Invalid(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::DbError(_) | Self::ViewError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, self)
    }
}

/// Applies a partial update and records one history entry with the whole
/// before and after state.
pub async fn update_asset(
    State(state): State<SharedAppState>,
    RequireRole { claims, .. }: RequireRole<Staff>,
    Path(id): Path<api::asset::Id>,
    JsonBody(patch): JsonBody<domain::asset::Patch>,
) -> Result<Json<api::Asset>, UpdateAssetError> {
    use UpdateAssetError as E;

    let db = state.db.as_ref();

    let old = db.get_asset_by_id(id).await?.ok_or(E::AssetNotFound)?;
    if let Some(Some(user)) = patch.assigned_to_id {
        db.get_user_by_id(user).await?.ok_or(E::AssigneeNotFound)?;
    }

    let now = domain::now();
    let mut new = old.clone();
    domain::asset::apply_patch(&mut new, patch, now);
    let entry = domain::asset::history_entry(&old, &new, claims.user_id, now)
        .map_err(db::Error::from)?;

    if !db.update_asset(&new, &entry).await? {
        return Err(E::AssetNotFound);
    }

    let lookup = Lookup::users(db, new.assigned_to).await?;

    Ok(Json(lookup.asset(new)?))
}

#[derive(Debug, Display, From)]
pub enum UpdateAssetError {
    #[display("asset not found")]
    AssetNotFound,
    #[display("assignee not found")]
    AssigneeNotFound,
    #[from]
    DbError(db::Error),
    #[from]
    ViewError(ViewError),
}

impl IntoResponse for UpdateAssetError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::AssetNotFound => StatusCode::NOT_FOUND,
            Self::AssigneeNotFound => StatusCode::BAD_REQUEST,
            Self::DbError(_) | Self::ViewError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, self)
    }
}

pub async fn get_asset_history(
    State(state): State<SharedAppState>,
    _: AuthClaims,
    Path(id): Path<api::asset::Id>,
) -> Result<Json<Vec<api::asset::HistoryEntry>>, GetAssetHistoryError> {
    use GetAssetHistoryError as E;

    let db = state.db.as_ref();

    db.get_asset_by_id(id).await?.ok_or(E::AssetNotFound)?;
    let history = db.list_asset_history(id).await?;
    let lookup =
        Lookup::users(db, history.iter().map(|h| h.changed_by)).await?;

    let history = history
        .into_iter()
        .map(|h| lookup.history_entry(h))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(history))
}

#[derive(Debug, Display, From)]
pub enum GetAssetHistoryError {
    #[display("asset not found")]
    AssetNotFound,
    #[from]
    DbError(db::Error),
    #[from]
    ViewError(ViewError),
}

impl IntoResponse for GetAssetHistoryError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::AssetNotFound => StatusCode::NOT_FOUND,
            Self::DbError(_) | Self::ViewError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, self)
    }
}
