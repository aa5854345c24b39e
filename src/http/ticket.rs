use std::{io, path};

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use derive_more::{Display, From};
use serde::Deserialize;
use tokio::fs;

use crate::{
    api, db,
    domain::{self, Invalid},
};

use super::{
    error_response,
    view::{Lookup, ViewError},
    AdminOnly, AuthClaims, JsonBody, RequireRole, SharedAppState, Staff,
    UPLOADS_PREFIX,
};

pub async fn list_tickets(
    State(state): State<SharedAppState>,
    _: AuthClaims,
    Query(filter): Query<db::ticket::Filter>,
) -> Result<Json<Vec<api::Ticket>>, ListTicketsError> {
    let tickets = state.db.list_tickets(&filter).await?;
    let lookup = Lookup::for_tickets(state.db.as_ref(), &tickets).await?;

    let tickets = tickets
        .into_iter()
        .map(|ticket| lookup.ticket(ticket))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(tickets))
}

#[derive(Debug, Display, From)]
pub enum ListTicketsError {
    #[from]
    DbError(db::Error),
    #[from]
    ViewError(ViewError),
}

impl IntoResponse for ListTicketsError {
    fn into_response(self) -> Response {
        error_response(StatusCode::INTERNAL_SERVER_ERROR, self)
    }
}

/// Ticket with its comments and attachments. Internal comments are only
/// shown to staff.
pub async fn get_ticket(
    State(state): State<SharedAppState>,
    auth_claims: AuthClaims,
    Path(id): Path<api::ticket::Id>,
) -> Result<Json<api::ticket::Details>, GetTicketError> {
    use GetTicketError as E;

    let db = state.db.as_ref();

    let ticket = db.get_ticket_by_id(id).await?.ok_or(E::TicketNotFound)?;
    let (mut comments, attachments) =
        tokio::try_join!(db.list_comments(id), db.list_attachments(id))?;
    if !auth_claims.role.is_staff() {
        comments.retain(|c| !c.internal_only);
    }

    let lookup = Lookup::load(
        db,
        std::iter::once(ticket.created_by)
            .chain(ticket.assigned_to)
            .chain(comments.iter().map(|c| c.author))
            .chain(attachments.iter().map(|a| a.uploaded_by)),
        ticket.asset,
    )
    .await?;

    Ok(Json(api::ticket::Details {
        ticket: lookup.ticket(ticket)?,
        comments: comments
            .into_iter()
            .map(|c| lookup.comment(c))
            .collect::<Result<_, _>>()?,
        attachments: attachments
            .into_iter()
            .map(|a| lookup.attachment(a))
            .collect::<Result<_, _>>()?,
    }))
}

#[derive(Debug, Display, From)]
pub enum GetTicketError {
    #[from]
    DbError(db::Error),
    #[display("ticket not found")]
    TicketNotFound,
    #[from]
    ViewError(ViewError),
}

impl IntoResponse for GetTicketError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::TicketNotFound => StatusCode::NOT_FOUND,
            Self::DbError(_) | Self::ViewError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, self)
    }
}

pub async fn create_ticket(
    State(state): State<SharedAppState>,
    auth_claims: AuthClaims,
    JsonBody(input): JsonBody<domain::ticket::NewTicket>,
) -> Result<(StatusCode, Json<api::Ticket>), CreateTicketError> {
    use CreateTicketError as E;

    let ticket = domain::ticket::new_ticket(
        input,
        auth_claims.user_id,
        domain::now(),
    )?;
    if let Some(asset) = ticket.asset {
        state
            .db
            .get_asset_by_id(asset)
            .await?
            .ok_or(E::AssetNotFound)?;
    }

    state.db.insert_ticket(&ticket).await?;

    let lookup =
        Lookup::for_tickets(state.db.as_ref(), std::slice::from_ref(&ticket))
            .await?;
    let ticket = lookup.ticket(ticket)?;

    // Nobody listening is fine.
    let _ = state.events.send(api::Event::TicketCreated(ticket.clone()));

    Ok((StatusCode::CREATED, Json(ticket)))
}

#[derive(Debug, Display, From)]
pub enum CreateTicketError {
    #[display("asset not found")]
    AssetNotFound,
    #[from]
    DbError(db::Error),
    #[from]
    Invalid(Invalid),
    #[from]
    ViewError(ViewError),
}

impl IntoResponse for CreateTicketError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::AssetNotFound | Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::DbError(_) | Self::ViewError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, self)
    }
}

pub async fn update_ticket(
    State(state): State<SharedAppState>,
    _: RequireRole<Staff>,
    Path(id): Path<api::ticket::Id>,
    JsonBody(patch): JsonBody<domain::ticket::Patch>,
) -> Result<Json<api::Ticket>, UpdateTicketError> {
    use UpdateTicketError as E;

    let db = state.db.as_ref();

    let mut ticket = db.get_ticket_by_id(id).await?.ok_or(E::TicketNotFound)?;

    if let Some(Some(user)) = patch.assigned_to_id {
        db.get_user_by_id(user).await?.ok_or(E::AssigneeNotFound)?;
    }
    if let Some(Some(asset)) = patch.asset_id {
        db.get_asset_by_id(asset).await?.ok_or(E::AssetNotFound)?;
    }

    domain::ticket::apply_update(&mut ticket, patch, domain::now());
    if !db.update_ticket(&ticket).await? {
        return Err(E::TicketNotFound);
    }

    let lookup = Lookup::for_tickets(db, std::slice::from_ref(&ticket)).await?;

    Ok(Json(lookup.ticket(ticket)?))
}

#[derive(Debug, Display, From)]
pub enum UpdateTicketError {
    #[display("asset not found")]
    AssetNotFound,
    #[display("assignee not found")]
    AssigneeNotFound,
    #[from]
    DbError(db::Error),
    #[display("ticket not found")]
    TicketNotFound,
    #[from]
    ViewError(ViewError),
}

impl IntoResponse for UpdateTicketError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::AssetNotFound | Self::AssigneeNotFound => {
                StatusCode::BAD_REQUEST
            }
            Self::TicketNotFound => StatusCode::NOT_FOUND,
            Self::DbError(_) | Self::ViewError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, self)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentInput {
    comment: String,
    #[serde(default)]
    internal_only: bool,
}

pub async fn add_comment(
    State(state): State<SharedAppState>,
    auth_claims: AuthClaims,
    Path(id): Path<api::ticket::Id>,
    JsonBody(AddCommentInput {
        comment,
        internal_only,
    }): JsonBody<AddCommentInput>,
) -> Result<(StatusCode, Json<api::ticket::Comment>), AddCommentError> {
    use AddCommentError as E;

    if comment.trim().is_empty() {
        return Err(E::EmptyComment);
    }
    if internal_only && !auth_claims.role.is_staff() {
        return Err(E::InternalNotAllowed);
    }

    let db = state.db.as_ref();
    db.get_ticket_by_id(id).await?.ok_or(E::TicketNotFound)?;

    let comment = db::ticket::Comment {
        id: api::ticket::CommentId::new(),
        ticket: id,
        author: auth_claims.user_id,
        comment,
        internal_only,
        created_at: domain::now(),
    };
    if !db.add_comment(&comment).await? {
        return Err(E::TicketNotFound);
    }

    let lookup = Lookup::users(db, [comment.author]).await?;

    Ok((StatusCode::CREATED, Json(lookup.comment(comment)?)))
}

#[derive(Debug, Display, From)]
pub enum AddCommentError {
    #[from]
    DbError(db::Error),
    #[display("comment is required")]
    EmptyComment,
    #[display("only staff can post internal comments")]
    InternalNotAllowed,
    #[display("ticket not found")]
    TicketNotFound,
    #[from]
    ViewError(ViewError),
}

impl IntoResponse for AddCommentError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::EmptyComment => StatusCode::BAD_REQUEST,
            Self::InternalNotAllowed => StatusCode::FORBIDDEN,
            Self::TicketNotFound => StatusCode::NOT_FOUND,
            Self::DbError(_) | Self::ViewError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, self)
    }
}

/// Stores the multipart field `file` under the uploads directory.
pub async fn add_attachment(
    State(state): State<SharedAppState>,
    auth_claims: AuthClaims,
    Path(id): Path<api::ticket::Id>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<api::ticket::Attachment>), AddAttachmentError> {
    use AddAttachmentError as E;

    let db = state.db.as_ref();
    db.get_ticket_by_id(id).await?.ok_or(E::TicketNotFound)?;

    let mut stored = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name =
            sanitize_file_name(field.file_name().unwrap_or_default());
        let data = field.bytes().await?;

        let attachment_id = api::ticket::AttachmentId::new();
        let stored_name = format!("{attachment_id}-{file_name}");
        fs::create_dir_all(&state.uploads_dir).await?;
        fs::write(state.uploads_dir.join(&stored_name), &data).await?;

        stored = Some(db::ticket::Attachment {
            id: attachment_id,
            ticket: id,
            file_name,
            file_path: format!("{UPLOADS_PREFIX}/{stored_name}"),
            uploaded_by: auth_claims.user_id,
            created_at: domain::now(),
        });
        break;
    }
    let attachment = stored.ok_or(E::MissingFile)?;

    let written = db.add_attachment(&attachment).await;
    if !matches!(written, Ok(true)) {
        remove_upload(&state.uploads_dir, &attachment.file_path).await;
    }
    if !written? {
        return Err(E::TicketNotFound);
    }

    let lookup = Lookup::users(db, [attachment.uploaded_by]).await?;

    Ok((StatusCode::CREATED, Json(lookup.attachment(attachment)?)))
}

/// Removes a stored upload by its public path. Failures are only logged.
async fn remove_upload(uploads_dir: &path::Path, file_path: &str) {
    let Some(name) = file_path
        .strip_prefix(UPLOADS_PREFIX)
        .map(|p| p.trim_start_matches('/'))
    else {
        return;
    };
    if let Err(e) = fs::remove_file(uploads_dir.join(name)).await {
        tracing::warn!(file = name, "failed to remove upload: {e}");
    }
}

/// Keeps the last path segment and replaces anything outside
/// `[A-Za-z0-9._-]`.
fn sanitize_file_name(name: &str) -> String {
    let name = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let name = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();
    if name.trim_matches('.').is_empty() {
        "file".to_owned()
    } else {
        name
    }
}

#[derive(Debug, Display, From)]
pub enum AddAttachmentError {
    #[from]
    DbError(db::Error),
    #[from]
    IoError(io::Error),
    #[display("file is required")]
    MissingFile,
    #[from]
    MultipartError(MultipartError),
    #[display("ticket not found")]
    TicketNotFound,
    #[from]
    ViewError(ViewError),
}

impl IntoResponse for AddAttachmentError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingFile => StatusCode::BAD_REQUEST,
            Self::MultipartError(e) => e.status(),
            Self::TicketNotFound => StatusCode::NOT_FOUND,
            Self::DbError(_) | Self::IoError(_) | Self::ViewError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, self)
    }
}

/// Removes a closed ticket with its comments and attachments.
///
/// Stored files are removed after the rows; a file that cannot be removed
/// is only logged.
pub async fn delete_ticket(
    State(state): State<SharedAppState>,
    _: RequireRole<AdminOnly>,
    Path(id): Path<api::ticket::Id>,
) -> Result<Json<api::Message>, DeleteTicketError> {
    use DeleteTicketError as E;

    let ticket = state
        .db
        .get_ticket_by_id(id)
        .await?
        .ok_or(E::TicketNotFound)?;
    domain::ticket::ensure_deletable(&ticket)?;

    let attachments = state.db.delete_ticket(id).await?;
    for attachment in attachments {
        remove_upload(&state.uploads_dir, &attachment.file_path).await;
    }

    Ok(Json(api::Message::new("Ticket deleted successfully")))
}

#[derive(Debug, Display, From)]
pub enum DeleteTicketError {
    #[from]
    DbError(db::Error),
    #[from]
    NotClosed(domain::ticket::NotClosed),
    #[display("ticket not found")]
    TicketNotFound,
}

impl IntoResponse for DeleteTicketError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::NotClosed(_) => StatusCode::BAD_REQUEST,
            Self::TicketNotFound => StatusCode::NOT_FOUND,
            Self::DbError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, self)
    }
}
