use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{self, KeepAlive, Sse},
};
use futures::{stream, Stream};
use tokio::sync::broadcast::{error::RecvError, Receiver};

use crate::api;

use super::{AuthClaims, SharedAppState};

/// Live `ticket-created` notifications as server-sent events.
///
/// A subscriber that falls behind skips the events it missed.
pub async fn subscribe(
    State(state): State<SharedAppState>,
    auth_claims: AuthClaims,
) -> Sse<impl Stream<Item = Result<sse::Event, Infallible>>> {
    tracing::debug!(user_id = %auth_claims.user_id, "events subscriber joined");

    let events = stream::unfold(state.events.subscribe(), next_event);

    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn next_event(
    mut rx: Receiver<api::Event>,
) -> Option<(Result<sse::Event, Infallible>, Receiver<api::Event>)> {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let sse_event = sse::Event::default().event(event.name());
                match sse_event.json_data(&event) {
                    Ok(sse_event) => return Some((Ok(sse_event), rx)),
                    Err(e) => {
                        tracing::error!("failed to encode event: {e}");
                    }
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "events subscriber lagged behind");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}
