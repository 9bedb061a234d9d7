use quickdraw_core::{RoundStateMachine, SettingsStore, TICK_PERIOD, WordCatalog};
use quickdraw_types::{RoundSnapshot, ServerMessage};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::websocket::connection::ConnectionId;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No game session for this connection")]
    SessionNotFound,
    #[error("Player names must not be blank")]
    BlankPlayerName,
    #[error("A game needs between {min} and {max} players, got {count}")]
    InvalidRosterSize { count: usize, min: u32, max: u32 },
    #[error("Settings unavailable: {0}")]
    SettingsUnavailable(#[from] anyhow::Error),
}

struct Session {
    round: RoundStateMachine,
    forwarder: JoinHandle<()>,
}

/// One round per connected client
pub struct SessionManager {
    sessions: RwLock<HashMap<ConnectionId, Session>>,
    catalog: Arc<WordCatalog>,
    settings_store: SettingsStore,
    tick_period: Duration,
}

impl SessionManager {
    pub fn new(catalog: Arc<WordCatalog>, settings_store: SettingsStore) -> Self {
        Self::new_with_tick_period(catalog, settings_store, TICK_PERIOD)
    }

    pub fn new_with_tick_period(
        catalog: Arc<WordCatalog>,
        settings_store: SettingsStore,
        tick_period: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            catalog,
            settings_store,
            tick_period,
        }
    }

    /// Create the connection's round and forward every snapshot it publishes
    /// as a `RoundUpdate`. An existing session for the connection is replaced.
    pub async fn create_session(
        &self,
        connection_id: ConnectionId,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> RoundStateMachine {
        let round = RoundStateMachine::new_with_tick_period(
            self.catalog.clone(),
            self.settings_store.clone(),
            self.tick_period,
        );

        let mut updates = round.subscribe();
        let forwarder = tokio::spawn(async move {
            // Ends when the round is dropped or the socket goes away
            while updates.changed().await.is_ok() {
                let snapshot = updates.borrow_and_update().clone();
                if sender.send(ServerMessage::RoundUpdate { snapshot }).is_err() {
                    break;
                }
            }
        });

        let session = Session {
            round: round.clone(),
            forwarder,
        };

        if let Some(previous) = self.sessions.write().await.insert(connection_id, session) {
            warn!("Replacing existing session for {}", connection_id);
            close(previous).await;
        }

        info!("Created session for {}", connection_id);
        round
    }

    pub async fn get_round(&self, connection_id: ConnectionId) -> Option<RoundStateMachine> {
        self.sessions
            .read()
            .await
            .get(&connection_id)
            .map(|session| session.round.clone())
    }

    /// Validate the roster against the saved player limits, then set up a
    /// fresh round
    pub async fn setup_game(
        &self,
        connection_id: ConnectionId,
        player_names: &[String],
        category: Option<&str>,
    ) -> Result<RoundSnapshot, SessionError> {
        let round = self
            .get_round(connection_id)
            .await
            .ok_or(SessionError::SessionNotFound)?;

        let names: Vec<&str> = player_names.iter().map(|name| name.trim()).collect();
        if names.iter().any(|name| name.is_empty()) {
            return Err(SessionError::BlankPlayerName);
        }

        let settings = self.settings_store.load().await?;
        let count = names.len();
        if count < settings.min_players as usize || count > settings.max_players as usize {
            return Err(SessionError::InvalidRosterSize {
                count,
                min: settings.min_players,
                max: settings.max_players,
            });
        }

        round.setup_new_game(names.as_slice(), category).await;
        Ok(round.snapshot())
    }

    /// Exit the connection's round and stop forwarding its updates
    pub async fn end_session(&self, connection_id: ConnectionId) {
        let session = self.sessions.write().await.remove(&connection_id);
        match session {
            Some(session) => {
                close(session).await;
                info!("Ended session for {}", connection_id);
            }
            None => debug!("No session to end for {}", connection_id),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

async fn close(session: Session) {
    session.round.exit_game().await;
    session.forwarder.abort();
}
