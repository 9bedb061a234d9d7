#![allow(dead_code)]

use quickdraw_core::{
    RoundEvent, RoundEventHandler, RoundStateMachine, SettingsStore, WordCatalog,
};
use quickdraw_types::{GameSettings, Player, RoundSnapshot};
use std::sync::{Arc, Mutex};

/// Creates a round backed by the built-in catalog and an empty in-memory store
pub fn create_test_round() -> RoundStateMachine {
    RoundStateMachine::new(Arc::new(WordCatalog::builtin()), SettingsStore::in_memory())
}

/// Creates a round whose store already holds the given settings
pub async fn create_round_with_settings(settings: GameSettings) -> RoundStateMachine {
    let store = SettingsStore::in_memory();
    store.save(&settings).await.unwrap();
    RoundStateMachine::new(Arc::new(WordCatalog::builtin()), store)
}

/// Sets up and starts a Colors round for the given players
pub async fn start_colors_round(round: &RoundStateMachine, players: &[&str]) {
    round.setup_new_game(players, Some("Colors")).await;
    round.start_game().await;
}

/// Event collector for testing event emissions
#[derive(Clone)]
pub struct EventCollector {
    events: Arc<Mutex<Vec<RoundEvent>>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn get_events(&self) -> Vec<RoundEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_event(&self) -> Option<RoundEvent> {
        self.events.lock().unwrap().last().cloned()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn has_event_type(&self, check_fn: impl Fn(&RoundEvent) -> bool) -> bool {
        self.events.lock().unwrap().iter().any(check_fn)
    }
}

impl RoundEventHandler for EventCollector {
    fn handle_event(&mut self, event: RoundEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Helper to get player by name
pub fn get_player_by_name<'a>(snapshot: &'a RoundSnapshot, name: &str) -> Option<&'a Player> {
    snapshot.players.iter().find(|p| p.name == name)
}

/// Name of the player whose turn it is
pub fn active_name(snapshot: &RoundSnapshot) -> String {
    snapshot
        .active_player()
        .map(|p| p.name.clone())
        .unwrap_or_default()
}
