use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use keep_reminders::push::PushHub;
use keep_types::events::PushEvent;

use crate::auth::{AppState, authenticate};
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// GET /notifications?token=…
///
/// Browsers cannot set headers on a WebSocket
/// upgrade, so the token travels in the query string. It is checked before
/// the upgrade is accepted.
pub async fn notifications_ws(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    let token = query.token.ok_or(ApiError::Unauthenticated)?;
    let principal = authenticate(&state.jwt_secret, &token)?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };
    let hub = state.push.clone();
    Ok(ws
        .on_upgrade(move |socket| handle_connection(socket, hub, principal.id))
        .into_response())
}

/// Relays reminder events to the client until either side closes.
async fn handle_connection(socket: WebSocket, hub: PushHub, user_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let (conn_id, mut events) = hub.register(user_id).await;

    info!("{} connected to notifications", user_id);

    if send_event(&mut sender, &PushEvent::Ready).await {
        loop {
            tokio::select! {
                event = events.recv() => {
                    // Replaced by a newer connection
                    let Some(event) = event else { break };
                    if !send_event(&mut sender, &event).await {
                        break;
                    }
                }
                msg = receiver.next() => {
                    match msg {
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    }
                }
            }
        }
    }

    hub.unregister(user_id, conn_id).await;
    info!("{} disconnected from notifications", user_id);
}

async fn send_event(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    event: &PushEvent,
) -> bool {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode push event: {}", e);
            return true;
        }
    };
    sender.send(Message::Text(text.into())).await.is_ok()
}
