use axum::Json;
use serde::Deserialize;

use crate::{api, domain};

use super::{AuthClaims, JsonBody};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestResponseInput {
    ticket_description: String,
    #[serde(default)]
    comments: Vec<String>,
}

pub async fn suggest_response(
    _: AuthClaims,
    JsonBody(SuggestResponseInput {
        ticket_description,
        comments,
    }): JsonBody<SuggestResponseInput>,
) -> Json<api::Suggestion> {
    Json(api::Suggestion {
        suggestion: domain::ai::suggest_response(
            &ticket_description,
            &comments,
        ),
    })
}
