use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use derive_more::{Display, From};
use jsonwebtoken::{encode, Header};
use rand::distributions::{Alphanumeric, DistString as _};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    api,
    db::{self, user::PasswordHash},
    domain,
};

use super::{error_response, AuthClaims, JsonBody, SharedAppState};

const RESET_TOKEN_LEN: usize = 26;

const RESET_REQUESTED: &str =
    "If an account with that email exists, a reset link has been sent.";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    first_name: String,
    last_name: String,
    email: String,
    password: String,
    #[serde(default)]
    role: Option<api::user::Role>,
    #[serde(default)]
    department: Option<String>,
}

pub async fn register(
    State(state): State<SharedAppState>,
    JsonBody(input): JsonBody<RegisterInput>,
) -> Result<(StatusCode, Json<api::auth::Registered>), RegisterError> {
    use RegisterError as E;

    let email = input.email.trim().to_lowercase();
    if email.is_empty() || input.password.is_empty() {
        return Err(E::MissingCredentials);
    }
    if state.db.get_user_by_email(&email).await?.is_some() {
        return Err(E::EmailTaken);
    }

    let user = db::User {
        id: db::user::Id::new(),
        email,
        first_name: input.first_name,
        last_name: input.last_name,
        password_hash: PasswordHash::new(
            &input.password,
            state.password_hash_cost,
        )?,
        role: input.role.unwrap_or(db::user::Role::User),
        department: input.department,
        reset_token: None,
        reset_token_expires_at: None,
        created_at: domain::now(),
    };
    state.db.insert_user(&user).await.map_err(|e| match e {
        db::Error::Duplicate(_) => E::EmailTaken,
        e => E::DbError(e),
    })?;

    Ok((
        StatusCode::CREATED,
        Json(api::auth::Registered {
            message: "User registered successfully".to_owned(),
            user_id: user.id,
        }),
    ))
}

#[derive(Debug, Display, From)]
pub enum RegisterError {
    #[from]
    DbError(db::Error),
    #[display("user already exists")]
    EmailTaken,
    #[from]
    HashError(bcrypt::BcryptError),
    #[display("email and password are required")]
    MissingCredentials,
}

impl IntoResponse for RegisterError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::EmailTaken | Self::MissingCredentials => {
                StatusCode::BAD_REQUEST
            }
            Self::DbError(_) | Self::HashError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, self)
    }
}

#[derive(Deserialize)]
pub struct LoginInput {
    email: String,
    password: String,
}

pub async fn login(
    State(state): State<SharedAppState>,
    JsonBody(LoginInput { email, password }): JsonBody<LoginInput>,
) -> Result<Json<api::auth::Token>, LoginError> {
    use LoginError as E;

    let user = state
        .db
        .get_user_by_email(&email.trim().to_lowercase())
        .await?
        .filter(|u| u.password_hash.matches(&password))
        .ok_or(E::WrongEmailOrPassword)?;

    let expires_at = OffsetDateTime::now_utc() + state.jwt_expiration_time;
    let token = encode(
        &Header::default(),
        &AuthClaims {
            user_id: user.id,
            role: user.role,
            exp: expires_at.unix_timestamp(),
        },
        &state.jwt_encoding_key,
    )?;

    Ok(Json(api::auth::Token { token }))
}

#[derive(Debug, Display, From)]
pub enum LoginError {
    #[from]
    DbError(db::Error),
    #[from]
    TokenError(jsonwebtoken::errors::Error),
    #[display("invalid credentials")]
    WrongEmailOrPassword,
}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::WrongEmailOrPassword => StatusCode::UNAUTHORIZED,
            Self::DbError(_) | Self::TokenError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, self)
    }
}

pub async fn me(
    State(state): State<SharedAppState>,
    auth_claims: AuthClaims,
) -> Result<Json<api::User>, MeError> {
    use MeError as E;

    let my = state
        .db
        .get_user_by_id(auth_claims.user_id)
        .await?
        .ok_or(E::UserNotFound)?;

    Ok(Json(api::User::from(&my)))
}

#[derive(Debug, Display, From)]
pub enum MeError {
    #[from]
    DbError(db::Error),
    #[display("user not found")]
    UserNotFound,
}

impl IntoResponse for MeError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::DbError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, self)
    }
}

#[derive(Deserialize)]
pub struct ForgotPasswordInput {
    email: String,
}

/// Issues a reset token. There is no mail delivery: the token is logged and
/// returned to the caller.
///
/// Unknown addresses get a token that is never stored, so the answer does
/// not reveal whether an account exists.
pub async fn forgot_password(
    State(state): State<SharedAppState>,
    JsonBody(ForgotPasswordInput { email }): JsonBody<ForgotPasswordInput>,
) -> Result<Json<api::auth::ResetRequested>, ForgotPasswordError> {
    let token =
        Alphanumeric.sample_string(&mut rand::thread_rng(), RESET_TOKEN_LEN);

    let email = email.trim().to_lowercase();
    if let Some(user) = state.db.get_user_by_email(&email).await? {
        let expires_at = domain::now() + state.reset_token_ttl;
        state.db.set_reset_token(user.id, &token, expires_at).await?;
        tracing::info!(
            user_id = %user.id,
            %email,
            "simulated password reset mail: /reset-password?token={token}",
        );
    }

    Ok(Json(api::auth::ResetRequested {
        message: RESET_REQUESTED.to_owned(),
        simulation_token: token,
    }))
}

#[derive(Debug, Display, From)]
pub enum ForgotPasswordError {
    #[from]
    DbError(db::Error),
}

impl IntoResponse for ForgotPasswordError {
    fn into_response(self) -> Response {
        error_response(StatusCode::INTERNAL_SERVER_ERROR, self)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordInput {
    token: String,
    new_password: String,
}

pub async fn reset_password(
    State(state): State<SharedAppState>,
    JsonBody(ResetPasswordInput {
        token,
        new_password,
    }): JsonBody<ResetPasswordInput>,
) -> Result<Json<api::Message>, ResetPasswordError> {
    use ResetPasswordError as E;

    if new_password.is_empty() {
        return Err(E::EmptyPassword);
    }

    let password_hash =
        PasswordHash::new(&new_password, state.password_hash_cost)?;
    state
        .db
        .consume_reset_token(&token, OffsetDateTime::now_utc(), &password_hash)
        .await?
        .ok_or(E::InvalidOrExpiredToken)?;

    Ok(Json(api::Message::new("Password has been reset successfully")))
}

#[derive(Debug, Display, From)]
pub enum ResetPasswordError {
    #[from]
    DbError(db::Error),
    #[display("new password is required")]
    EmptyPassword,
    #[from]
    HashError(bcrypt::BcryptError),
    #[display("invalid or expired token")]
    InvalidOrExpiredToken,
}

impl IntoResponse for ResetPasswordError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::EmptyPassword | Self::InvalidOrExpiredToken => {
                StatusCode::BAD_REQUEST
            }
            Self::DbError(_) | Self::HashError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, self)
    }
}
