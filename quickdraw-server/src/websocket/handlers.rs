use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::session::SessionManager;
use crate::websocket::connection::{ConnectionId, ConnectionManager};
use quickdraw_core::RoundStateMachine;
use quickdraw_types::{ClientMessage, ServerMessage};

#[derive(Clone)]
pub struct MessageHandler {
    connection_id: ConnectionId,
    connection_manager: Arc<ConnectionManager>,
    session_manager: Arc<SessionManager>,
}

impl MessageHandler {
    pub fn new(
        connection_id: ConnectionId,
        connection_manager: Arc<ConnectionManager>,
        session_manager: Arc<SessionManager>,
    ) -> Self {
        Self {
            connection_id,
            connection_manager,
            session_manager,
        }
    }

    pub async fn handle_message(&self, message: ClientMessage) -> Result<(), String> {
        self.connection_manager
            .update_activity(self.connection_id)
            .await;

        match message {
            ClientMessage::SetupGame {
                player_names,
                category,
            } => self.handle_setup_game(player_names, category).await,
            ClientMessage::StartGame => {
                self.round().await?.start_game().await;
                Ok(())
            }
            ClientMessage::SubmitWord { word } => self.handle_submit_word(word).await,
            ClientMessage::PauseGame => {
                self.round().await?.pause_game().await;
                Ok(())
            }
            ClientMessage::ResumeGame => {
                self.round().await?.resume_game().await;
                Ok(())
            }
            ClientMessage::ExitGame => {
                self.round().await?.exit_game().await;
                Ok(())
            }
            ClientMessage::Heartbeat => self.send_message(ServerMessage::HeartbeatAck).await,
        }
    }

    pub async fn handle_disconnect(&self) {
        info!("Handling disconnect for connection {}", self.connection_id);
        self.session_manager.end_session(self.connection_id).await;
    }

    /// Tell the client its message could not be used
    pub async fn send_error(&self, message: impl Into<String>) -> Result<(), String> {
        self.send_message(ServerMessage::Error {
            message: message.into(),
        })
        .await
    }

    async fn handle_setup_game(
        &self,
        player_names: Vec<String>,
        category: Option<String>,
    ) -> Result<(), String> {
        match self
            .session_manager
            .setup_game(self.connection_id, &player_names, category.as_deref())
            .await
        {
            Ok(snapshot) => {
                debug!(
                    "Connection {} set up a game in '{}'",
                    self.connection_id, snapshot.category.name
                );
                Ok(())
            }
            Err(e) => {
                warn!("Setup rejected for {}: {}", self.connection_id, e);
                self.send_error(e.to_string()).await
            }
        }
    }

    async fn handle_submit_word(&self, word: String) -> Result<(), String> {
        let accepted = self.round().await?.submit_word(&word).await;
        self.send_message(ServerMessage::WordResult { word, accepted })
            .await
    }

    async fn round(&self) -> Result<RoundStateMachine, String> {
        self.session_manager
            .get_round(self.connection_id)
            .await
            .ok_or_else(|| format!("No game session for connection {}", self.connection_id))
    }

    async fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.connection_manager
            .send_to_connection(self.connection_id, message)
            .await
    }
}
