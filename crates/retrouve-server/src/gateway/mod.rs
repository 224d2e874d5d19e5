//! Realtime gateway: the bidirectional event channel between client
//! sessions and the chat subsystem.
//!
//! Each WebSocket connection gets an unbounded outbox drained by a writer
//! task, so direct replies and room broadcasts share one ordered pipe per
//! session. Inbound frames are parsed into [`ClientEvent`] at the boundary
//! and dispatched to typed handlers; a handler failure is answered with a
//! structured failure event and never tears down the connection.

pub mod handlers;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use retrouve_shared::protocol::{ClientEvent, ServerEvent};

use crate::api::AppState;
use crate::rooms::Outbox;

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let conn_id = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<ServerEvent>();

    let writer = tokio::spawn(async move {
        while let Some(event) = outbox_rx.recv().await {
            let text = match event.to_json() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "failed to encode server event");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    tracing::debug!(conn = %conn_id, "session connected");

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => dispatch(&state, conn_id, &outbox, &text).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // binary/ping/pong ignored
            Err(e) => {
                tracing::debug!(conn = %conn_id, error = %e, "socket error");
                break;
            }
        }
    }

    // Partial writes committed by an in-flight handler stay committed; a
    // disconnect only cleans up room membership.
    state.rooms.leave_all(conn_id).await;
    drop(outbox);
    let _ = writer.await;

    tracing::debug!(conn = %conn_id, "session disconnected");
}

async fn dispatch(state: &AppState, conn_id: Uuid, outbox: &Outbox, text: &str) {
    let event = match ClientEvent::from_json(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(conn = %conn_id, error = %e, "malformed client frame");
            let _ = outbox.send(ServerEvent::error("Malformed event payload"));
            return;
        }
    };

    handlers::handle(state, conn_id, outbox, event).await;
}
