use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use warp::ws::{Message, WebSocket};

use crate::session::SessionManager;
use quickdraw_types::ClientMessage;

pub mod connection;
pub mod handlers;

pub use connection::{ConnectionId, ConnectionManager};
use handlers::MessageHandler;

pub async fn handle_connection(
    websocket: WebSocket,
    connection_manager: Arc<ConnectionManager>,
    session_manager: Arc<SessionManager>,
) {
    let connection_id = ConnectionId::new();
    info!("New WebSocket connection: {}", connection_id);

    let (mut ws_sender, mut ws_receiver) = websocket.split();

    // Create connection and get receiver for outgoing messages
    let message_receiver = connection_manager.create_connection(connection_id).await;

    let Some(round_sender) = connection_manager.sender(connection_id).await else {
        error!("Connection {} vanished before its session started", connection_id);
        return;
    };
    session_manager
        .create_session(connection_id, round_sender)
        .await;

    let message_handler = MessageHandler::new(
        connection_id,
        connection_manager.clone(),
        session_manager.clone(),
    );

    // Handle incoming messages
    let incoming_handler = {
        let message_handler = message_handler.clone();

        async move {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(msg) => {
                        if msg.is_close() {
                            break;
                        }
                        if let Err(e) = handle_message(msg, &message_handler).await {
                            error!("Error handling message for {}: {}", connection_id, e);
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("WebSocket error for {}: {}", connection_id, e);
                        break;
                    }
                }
            }
        }
    };

    // Handle outgoing messages
    let outgoing_handler = {
        async move {
            let mut receiver = message_receiver;

            while let Some(message) = receiver.recv().await {
                let json = match serde_json::to_string(&message) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize message: {:?}", e);
                        continue;
                    }
                };

                if let Err(e) = ws_sender.send(Message::text(json)).await {
                    warn!("Failed to send message to {}: {:?}", connection_id, e);
                    break;
                }
            }
        }
    };

    // Run both handlers concurrently
    tokio::select! {
        _ = incoming_handler => {},
        _ = outgoing_handler => {},
    }

    // Exits the round, which also stops its countdown
    info!("Connection {} disconnected", connection_id);
    message_handler.handle_disconnect().await;
    connection_manager.remove_connection(connection_id).await;
}

/// Close sockets that stayed silent longer than `timeout`. Ending the
/// session stops the round's countdown and drops the last outgoing sender,
/// so the socket task sees its channel close and shuts down.
pub async fn close_inactive_connections(
    connection_manager: &ConnectionManager,
    session_manager: &SessionManager,
    timeout: Duration,
) -> Vec<ConnectionId> {
    let inactive = connection_manager
        .cleanup_inactive_connections(timeout)
        .await;

    for id in &inactive {
        session_manager.end_session(*id).await;
    }

    inactive
}

async fn handle_message(msg: Message, message_handler: &MessageHandler) -> Result<(), String> {
    // Only handle text messages
    if !msg.is_text() {
        return Ok(());
    }

    let text = msg.to_str().map_err(|_| "Invalid text message")?;

    // A malformed message is answered, not fatal
    let client_message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            warn!("Invalid JSON message: {}", e);
            return message_handler
                .send_error(format!("Invalid message: {}", e))
                .await;
        }
    };

    message_handler
        .handle_message(client_message)
        .await
        .map_err(|e| format!("Message handling error: {}", e))
}
