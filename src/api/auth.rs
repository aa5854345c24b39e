use serde::{Deserialize, Serialize};

use super::user;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Token {
    pub token: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registered {
    pub message: String,
    pub user_id: user::Id,
}

/// Answer to a password reset request.
///
/// No mail is sent: the token is handed back as `simulationToken`. Unknown
/// addresses get a token bound to no account, so both answers look alike.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequested {
    pub message: String,
    pub simulation_token: String,
}
