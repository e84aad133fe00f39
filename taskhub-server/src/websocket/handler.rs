//! WebSocket upgrade and per-connection pump.
//!
//! Browsers cannot attach headers to an upgrade request, so the token rides
//! in as a query parameter and goes through the same pipeline steps as a
//! bearer header. Identity comes from the verified claims, never from
//! client-supplied query fields.

use axum::{
    extract::{
        Query, State,
        ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use taskhub_core::realtime::SEND_QUEUE_DEPTH;
use taskhub_core::{Decision, Identity};
use taskhub_model::Claims;
use tokio::sync::mpsc;

use crate::errors::AppError;
use crate::infra::app_state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Result<Response, AppError> {
    let token = query
        .token
        .ok_or_else(|| AppError::bad_request("Missing credentials"))?;

    let decision = state.access.authenticate(&token).map_err(|err| {
        tracing::error!(error = %err, "revocation check failed");
        AppError::unauthorized("Unauthorized - revocation check unavailable")
    })?;
    let claims = match decision {
        Decision::Allow(Identity::User(claims)) => claims,
        Decision::Allow(Identity::Anonymous) => {
            return Err(AppError::unauthorized("Unauthorized - No token provided"));
        }
        Decision::Deny(reason) => {
            return Err(AppError::unauthorized(format!(
                "Unauthorized - {}",
                reason.message()
            )));
        }
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, claims)))
}

async fn handle_socket(socket: WebSocket, state: AppState, claims: Claims) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel(SEND_QUEUE_DEPTH);

    let conn_id = state
        .registry
        .add_connection(tx, claims.sub, claims.username.clone());

    // Writer: drain the outbound queue into the socket. Exits when the
    // registry drops the connection (sender closes) or the peer goes away.
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match serde_json::to_string(&message) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(Utf8Bytes::from(json))).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to encode outbound frame");
                }
            }
        }
    });

    // Reader: control frames only. Replies flow through the connection's
    // own queue so they stay ordered with broadcasts.
    while let Some(message) = ws_receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if let Some(reply) = state.dispatcher.handle_client_frame(text.as_str()) {
                    let Some(connection) = state.registry.get_connection(&conn_id) else {
                        break;
                    };
                    if connection.send(reply).is_err() {
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Err(err) => {
                tracing::debug!(connection_id = %conn_id, error = %err, "websocket error");
                break;
            }
            // Protocol-level ping/pong and binary frames need no reply here.
            _ => {}
        }
    }

    state.registry.remove_connection(conn_id);
}
