pub mod ai;
pub mod asset;
pub mod auth;
pub mod events;
pub mod stats;
pub mod ticket;
mod view;

use std::{
    fmt, marker::PhantomData, path::PathBuf, sync::Arc, time::Duration,
};

use async_trait::async_trait;
use axum::{
    extract::{
        rejection::JsonRejection, DefaultBodyLimit, FromRequest,
        FromRequestParts,
    },
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        request, HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, RequestPartsExt as _, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use derive_more::{Display, From};
use jsonwebtoken::{decode, DecodingKey, EncodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    api,
    db::{self, user::Role},
    Config,
};

/// Path prefix uploaded files are served under.
pub const UPLOADS_PREFIX: &str = "/uploads";

pub type SharedAppState = Arc<AppState>;

pub struct AppState {
    pub db: Arc<dyn db::Store>,

    pub jwt_expiration_time: Duration,

    pub jwt_decoding_key: DecodingKey,

    pub jwt_encoding_key: EncodingKey,

    pub reset_token_ttl: Duration,

    pub password_hash_cost: u32,

    pub uploads_dir: PathBuf,

    /// Live ticket notifications. Sending never waits for subscribers.
    pub events: broadcast::Sender<api::Event>,
}

impl AppState {
    pub fn new(config: &Config, db: Arc<dyn db::Store>) -> Self {
        let (events, _) = broadcast::channel(config.events.capacity.max(1));
        Self {
            db,
            jwt_expiration_time: config.jwt.expiration_time,
            jwt_decoding_key: DecodingKey::from_secret(
                config.jwt.secret.as_bytes(),
            ),
            jwt_encoding_key: EncodingKey::from_secret(
                config.jwt.secret.as_bytes(),
            ),
            reset_token_ttl: config.auth.reset_token_ttl,
            password_hash_cost: config.auth.password_hash_cost,
            uploads_dir: config.uploads.dir.clone(),
            events,
        }
    }
}

pub fn router(
    config: &Config,
    state: SharedAppState,
) -> Result<Router, axum::http::header::InvalidHeaderValue> {
    let origins = config
        .http
        .cors
        .allowed_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_origin(origins);

    Ok(Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route(
            "/tickets",
            get(ticket::list_tickets).post(ticket::create_ticket),
        )
        .route(
            "/tickets/:id",
            get(ticket::get_ticket)
                .put(ticket::update_ticket)
                .delete(ticket::delete_ticket),
        )
        .route("/tickets/:id/comments", post(ticket::add_comment))
        .route(
            "/tickets/:id/attachments",
            post(ticket::add_attachment)
                .layer(DefaultBodyLimit::max(config.uploads.max_size)),
        )
        .route("/assets", get(asset::list_assets).post(asset::create_asset))
        .route(
            "/assets/:id",
            get(asset::get_asset).put(asset::update_asset),
        )
        .route("/assets/:id/history", get(asset::get_asset_history))
        .route("/stats/overview", get(stats::overview))
        .route("/ai/suggest-response", post(ai::suggest_response))
        .route("/events", get(events::subscribe))
        .nest_service(UPLOADS_PREFIX, ServeDir::new(&config.uploads.dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

async fn health() -> Json<api::Health> {
    Json(api::Health {
        status: "ok".to_owned(),
    })
}

/// Renders an error as `{"error": ...}`.
///
/// Server errors are logged and replaced by a generic message.
fn error_response(status: StatusCode, error: impl fmt::Display) -> Response {
    if status.is_server_error() {
        tracing::error!(%error, "request failed");
        return (status, Json(json!({ "error": "Internal server error" })))
            .into_response();
    }
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

/// JSON request body; any rejection is a `400 Bad Request`.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(BodyError))]
pub struct JsonBody<T>(pub T);

#[derive(Debug, From)]
pub struct BodyError(JsonRejection);

impl IntoResponse for BodyError {
    fn into_response(self) -> Response {
        error_response(StatusCode::BAD_REQUEST, self.0.body_text())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthClaims {
    pub user_id: api::user::Id,
    pub role: Role,
    pub exp: i64,
}

#[derive(Debug, Display)]
pub enum AuthError {
    #[display("invalid or missing token")]
    InvalidToken,
    #[display("insufficient permissions")]
    Forbidden,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
        };
        error_response(status, self)
    }
}

#[async_trait]
impl FromRequestParts<SharedAppState> for AuthClaims {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut request::Parts,
        state: &SharedAppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::InvalidToken)?;
        let token_data = decode::<Self>(
            bearer.token(),
            &state.jwt_decoding_key,
            &Validation::default(),
        )
        .map_err(|_| AuthError::InvalidToken)?;

        Ok(token_data.claims)
    }
}

/// Allow-list of roles for an operation.
pub trait Policy {
    const ALLOWED: &'static [Role];
}

/// Technicians and admins.
pub struct Staff;

impl Policy for Staff {
    const ALLOWED: &'static [Role] = &[Role::Tech, Role::Admin];
}

pub struct AdminOnly;

impl Policy for AdminOnly {
    const ALLOWED: &'static [Role] = &[Role::Admin];
}

/// Claims of a caller whose role is in `P`'s allow-list, checked before
/// the handler runs.
pub struct RequireRole<P> {
    pub claims: AuthClaims,
    policy: PhantomData<fn() -> P>,
}

#[async_trait]
impl<P: Policy> FromRequestParts<SharedAppState> for RequireRole<P> {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut request::Parts,
        state: &SharedAppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = AuthClaims::from_request_parts(parts, state).await?;
        if !P::ALLOWED.contains(&claims.role) {
            return Err(AuthError::Forbidden);
        }

        Ok(Self {
            claims,
            policy: PhantomData,
        })
    }
}
