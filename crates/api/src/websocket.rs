// crates/api/src/websocket.rs

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use livecap_core::{ClientMessage, SessionEvent, PROTOCOL_VERSION};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::ApiHandlers;

/// One connected live-caption client. Joined to a single session room at
/// a time; a `join` control message switches rooms without reconnecting.
pub async fn handle_live_stream(
    socket: WebSocket,
    session_id: String,
    handlers: Arc<ApiHandlers>,
) {
    let mut session_id = session_id;
    let mut room = handlers.hub.subscribe(&session_id);

    info!("Live stream connected to session {}", session_id);

    let (mut sender, mut receiver) = socket.split();

    let welcome = json!({
        "v": PROTOCOL_VERSION,
        "type": "welcome",
        "session_id": session_id,
        "live": handlers.captions.is_live(&session_id),
    });
    if sender.send(Message::Text(welcome.to_string())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = room.recv() => match event {
                Ok(event) => {
                    if forward_event(&event, &mut sender).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // At-most-once delivery: the client keeps its
                    // subscription and misses the skipped events.
                    warn!(
                        "Subscriber lagged on session {}, {} events dropped",
                        session_id, skipped
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Room for session {} closed", session_id);
                    break;
                }
            },
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if handle_client_message(
                        &text,
                        &mut session_id,
                        &mut room,
                        &mut sender,
                        &handlers,
                    )
                    .await
                    {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("WebSocket error on session {}: {}", session_id, e);
                    break;
                }
            },
        }
    }

    info!("Live stream disconnected from session {}", session_id);
}

async fn forward_event(
    event: &SessionEvent,
    sender: &mut SplitSink<WebSocket, Message>,
) -> Result<(), ()> {
    match event.to_wire() {
        Ok(wire) => sender.send(Message::Text(wire)).await.map_err(|_| ()),
        Err(e) => {
            error!("Failed to serialize event: {}", e);
            Ok(())
        }
    }
}

/// Returns true when the connection should close.
async fn handle_client_message(
    text: &str,
    session_id: &mut String,
    room: &mut broadcast::Receiver<SessionEvent>,
    sender: &mut SplitSink<WebSocket, Message>,
    handlers: &Arc<ApiHandlers>,
) -> bool {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            debug!("Unparseable client message: {}", e);
            let _ = send_error(sender, &format!("Bad message: {}", e)).await;
            return false;
        }
    };

    match message {
        ClientMessage::Join { session_id: next } => {
            *room = handlers.hub.subscribe(&next);
            *session_id = next;
            let joined = json!({
                "v": PROTOCOL_VERSION,
                "type": "joined",
                "session_id": session_id,
                "live": handlers.captions.is_live(session_id),
            });
            let _ = sender.send(Message::Text(joined.to_string())).await;
            false
        }
        ClientMessage::Leave => true,
        ClientMessage::UpdateStyle { style } => {
            if let Err(e) = handlers.captions.update_style(session_id, style) {
                let _ = send_error(sender, &e.to_string()).await;
            }
            false
        }
        ClientMessage::AddLanguage { language } => {
            if let Err(e) = handlers.captions.add_target_language(session_id, &language) {
                let _ = send_error(sender, &e.to_string()).await;
            }
            false
        }
        ClientMessage::RemoveLanguage { language } => {
            if let Err(e) = handlers
                .captions
                .remove_target_language(session_id, &language)
            {
                let _ = send_error(sender, &e.to_string()).await;
            }
            false
        }
        ClientMessage::Ping => {
            let pong = json!({
                "v": PROTOCOL_VERSION,
                "type": "pong",
                "timestamp": chrono::Utc::now(),
            });
            let _ = sender.send(Message::Text(pong.to_string())).await;
            false
        }
    }
}

async fn send_error(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &str,
) -> Result<(), axum::Error> {
    let error = json!({
        "v": PROTOCOL_VERSION,
        "type": "error",
        "message": message,
    });
    sender.send(Message::Text(error.to_string())).await
}
