//! WebSocket handler for realtime subscribers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::api::{ApiError, AppState};

use super::hub::{RealtimeHub, Subscription};
use super::types::Topic;

/// Ping interval for keepalive.
const PING_INTERVAL_SECS: u64 = 30;

/// WebSocket upgrade handler.
///
/// GET /ws/{topic}
///
/// The topic is checked before the upgrade so unknown topics are a 404
/// whether or not the request asked for a WebSocket.
pub async fn ws_handler(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let topic = match topic.parse::<Topic>() {
        Ok(topic) => topic,
        Err(msg) => return ApiError::not_found(msg).into_response(),
    };

    match ws {
        Ok(ws) => {
            debug!("WebSocket upgrade request for {}", topic);
            let hub = state.realtime.clone();
            ws.on_upgrade(move |socket| handle_ws_connection(socket, hub, topic))
        }
        Err(rejection) => rejection.into_response(),
    }
}

/// Pump broadcast frames to one socket until either side goes away.
async fn handle_ws_connection(socket: WebSocket, hub: Arc<RealtimeHub>, topic: Topic) {
    let (mut sender, mut receiver) = socket.split();
    let Subscription { id, mut frames, .. } = hub.connect(topic);
    let shutdown = hub.shutdown_token();

    let mut ping_interval = tokio::time::interval(Duration::from_secs(PING_INTERVAL_SECS));
    // The first tick completes immediately.
    ping_interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }

            frame = frames.recv() => match frame {
                Ok(frame) => {
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Client {} on {} lagged, skipped {} frames", id, topic, skipped);
                }
                Err(RecvError::Closed) => break,
            },

            _ = ping_interval.tick() => {
                if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }

            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => {
                    info!("Client {} closed connection to {}", id, topic);
                    break;
                }
                Some(Ok(_)) => {
                    // Subscribers have nothing to say; pongs and chatter are dropped.
                }
                Some(Err(e)) => {
                    debug!("WebSocket error for client {}: {}", id, e);
                    break;
                }
            },
        }
    }

    hub.disconnect(topic, id);
}
