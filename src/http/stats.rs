use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use derive_more::{Display, From};

use crate::{api, db, domain};

use super::{error_response, RequireRole, SharedAppState, Staff};

/// Dashboard counts, computed live on every call.
pub async fn overview(
    State(state): State<SharedAppState>,
    _: RequireRole<Staff>,
) -> Result<Json<api::stats::Overview>, OverviewError> {
    let db = state.db.as_ref();

    let (tickets_by_status, tickets_by_priority, assets_by_status) =
        tokio::try_join!(
            db.count_tickets_by_status(),
            db.count_tickets_by_priority(),
            db.count_assets_by_status(),
        )?;

    Ok(Json(domain::stats::overview(
        tickets_by_status,
        tickets_by_priority,
        assets_by_status,
    )))
}

#[derive(Debug, Display, From)]
pub enum OverviewError {
    #[from]
    DbError(db::Error),
}

impl IntoResponse for OverviewError {
    fn into_response(self) -> Response {
        error_response(StatusCode::INTERNAL_SERVER_ERROR, self)
    }
}
