//! WebSocket connection lifecycle: side assignment, read/write loops.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::GatewayState;

/// Handle a new WebSocket connection.
pub async fn handle_ws_connection(state: Arc<GatewayState>, ws: WebSocket) {
    let conn_id = Uuid::new_v4().to_string();
    debug!(conn_id = %conn_id, "New WebSocket connection");

    let (mut ws_tx, mut ws_rx) = ws.split();

    // The hub holds the only sender; once it forgets this connection the
    // writer loop below runs dry and exits.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<String>();

    // The hub logs the assignment and the release.
    if state.hub.connect(&conn_id, event_tx).await.is_none() {
        warn!(conn_id = %conn_id, "Relay hub unavailable, closing connection");
        let _ = ws_tx.send(Message::Close(None)).await;
        return;
    }

    let send_task = tokio::spawn(async move {
        while let Some(msg) = event_rx.recv().await {
            if ws_tx.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg_result) = ws_rx.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                state.hub.inbound(&conn_id, text.as_str().to_owned());
            }
            Ok(Message::Close(_)) => {
                debug!(conn_id = %conn_id, "Client requested close");
                break;
            }
            Ok(Message::Binary(_)) => {
                debug!(conn_id = %conn_id, "Ignoring binary frame");
            }
            Ok(_) => {
                // Axum answers pings itself
            }
            Err(e) => {
                warn!(conn_id = %conn_id, %e, "WebSocket error");
                break;
            }
        }
    }

    state.hub.disconnect(&conn_id);
    send_task.abort();
}
