#![allow(dead_code)]

use quickdraw_core::{SettingsStore, WordCatalog};
use quickdraw_server::session::SessionManager;
use quickdraw_server::websocket::handlers::MessageHandler;
use quickdraw_server::websocket::{ConnectionId, ConnectionManager};
use quickdraw_types::{ClientMessage, GamePhase, RoundSnapshot, ServerMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Test setup that provides all necessary components
pub struct TestServerSetup {
    pub connection_manager: Arc<ConnectionManager>,
    pub session_manager: Arc<SessionManager>,
    pub settings_store: SettingsStore,
    pub catalog: Arc<WordCatalog>,
}

impl TestServerSetup {
    pub fn new() -> Self {
        Self::with_store(SettingsStore::in_memory())
    }

    pub fn with_store(settings_store: SettingsStore) -> Self {
        let catalog = Arc::new(WordCatalog::builtin());
        Self {
            connection_manager: Arc::new(ConnectionManager::new()),
            session_manager: Arc::new(SessionManager::new(
                catalog.clone(),
                settings_store.clone(),
            )),
            settings_store,
            catalog,
        }
    }

    pub fn routes(
        &self,
    ) -> impl warp::Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone + 'static
    {
        quickdraw_server::create_routes(
            self.connection_manager.clone(),
            self.session_manager.clone(),
            self.settings_store.clone(),
            self.catalog.clone(),
        )
    }

    /// Registers a connection with its own session, the way the socket
    /// handler does
    pub async fn connect(&self) -> TestClient {
        let connection_id = ConnectionId::new();
        let receiver = self
            .connection_manager
            .create_connection(connection_id)
            .await;
        let sender = self
            .connection_manager
            .sender(connection_id)
            .await
            .expect("connection was just created");
        self.session_manager
            .create_session(connection_id, sender)
            .await;

        TestClient {
            connection_id,
            handler: MessageHandler::new(
                connection_id,
                self.connection_manager.clone(),
                self.session_manager.clone(),
            ),
            receiver,
        }
    }
}

pub struct TestClient {
    pub connection_id: ConnectionId,
    pub handler: MessageHandler,
    pub receiver: mpsc::UnboundedReceiver<ServerMessage>,
}

impl TestClient {
    pub async fn send(&self, message: ClientMessage) {
        self.handler
            .handle_message(message)
            .await
            .expect("message should be handled");
    }

    pub async fn setup(&self, players: &[&str], category: &str) {
        self.send(ClientMessage::SetupGame {
            player_names: players.iter().map(|p| p.to_string()).collect(),
            category: Some(category.to_string()),
        })
        .await;
    }

    /// Next message, failing the test if none arrives in time
    pub async fn next_message(&mut self) -> ServerMessage {
        tokio::time::timeout(Duration::from_secs(5), self.receiver.recv())
            .await
            .expect("timed out waiting for a server message")
            .expect("connection closed")
    }

    /// Skip messages until one matches
    pub async fn wait_for(&mut self, check_fn: impl Fn(&ServerMessage) -> bool) -> ServerMessage {
        loop {
            let message = self.next_message().await;
            if check_fn(&message) {
                return message;
            }
        }
    }

    /// Skip round updates until one is in the given phase
    pub async fn wait_for_phase(&mut self, phase: GamePhase) -> RoundSnapshot {
        let message = self
            .wait_for(|m| matches!(m, ServerMessage::RoundUpdate { snapshot } if snapshot.phase == phase))
            .await;
        extract_snapshot(message)
    }

    pub async fn wait_for_word_result(&mut self) -> (String, bool) {
        match self
            .wait_for(|m| matches!(m, ServerMessage::WordResult { .. }))
            .await
        {
            ServerMessage::WordResult { word, accepted } => (word, accepted),
            other => panic!("Expected WordResult, got {:?}", other),
        }
    }

    pub async fn wait_for_error(&mut self) -> String {
        match self
            .wait_for(|m| matches!(m, ServerMessage::Error { .. }))
            .await
        {
            ServerMessage::Error { message } => message,
            other => panic!("Expected Error, got {:?}", other),
        }
    }
}

pub fn extract_snapshot(message: ServerMessage) -> RoundSnapshot {
    match message {
        ServerMessage::RoundUpdate { snapshot } => snapshot,
        other => panic!("Expected RoundUpdate, got {:?}", other),
    }
}
