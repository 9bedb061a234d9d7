use async_trait::async_trait;
use quickdraw_types::{
    Category, GamePhase, GameSettings, Player, RoundSnapshot, WordRejection, normalize_word,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::countdown::{Countdown, Generation, TICK_PERIOD, TickHandler};
use crate::game_events::{RoundEvent, RoundEventBus, RoundEventHandler};
use crate::settings::SettingsStore;
use crate::word_catalog::WordCatalog;

/// Everything the state machine owns about the round in progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundState {
    pub phase: GamePhase,
    pub players: Vec<Player>,
    pub active_player_index: usize,
    pub category: Category,
    pub used_words: HashSet<String>, // Normalized
    pub last_entered_word: String,   // Raw input
    pub loser: Option<Player>,
    pub time_remaining: u32,
    pub paused_time_remaining: Option<u32>,
    pub settings: GameSettings,
}

impl Default for RoundState {
    fn default() -> Self {
        let settings = GameSettings::default();
        Self {
            phase: GamePhase::Setup,
            players: Vec::new(),
            active_player_index: 0,
            category: Category::default(),
            used_words: HashSet::new(),
            last_entered_word: String::new(),
            loser: None,
            time_remaining: settings.timer_duration_seconds,
            paused_time_remaining: None,
            settings,
        }
    }
}

impl RoundState {
    /// A freshly set up round: scores zero, first player active
    pub fn new(player_names: &[impl AsRef<str>], category: Category, settings: GameSettings) -> Self {
        let players = player_names
            .iter()
            .enumerate()
            .map(|(index, name)| Player {
                is_active: index == 0,
                ..Player::new(name.as_ref())
            })
            .collect();

        Self {
            phase: GamePhase::Ready,
            players,
            category,
            time_remaining: settings.timer_duration_seconds,
            settings,
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            phase: self.phase,
            players: self.players.clone(),
            active_player_index: self.active_player_index,
            category: self.category.clone(),
            used_word_count: self.used_words.len(),
            last_entered_word: self.last_entered_word.clone(),
            loser: self.loser.clone(),
            time_remaining: self.time_remaining,
            settings: self.settings,
        }
    }

    pub fn active_player(&self) -> Option<&Player> {
        self.players.get(self.active_player_index)
    }

    fn full_duration(&self) -> u32 {
        self.settings.timer_duration_seconds
    }

    /// Decide whether a word counts, returning its normalized form
    pub fn evaluate(&self, word: &str) -> Result<String, WordRejection> {
        if self.phase != GamePhase::Playing {
            return Err(WordRejection::NotPlaying);
        }

        let normalized = normalize_word(word);
        if normalized.is_empty() {
            return Err(WordRejection::Blank);
        }
        if self.used_words.contains(&normalized) {
            return Err(WordRejection::AlreadyUsed);
        }
        if !self.category.contains_word(&normalized) {
            return Err(WordRejection::NotInCategory);
        }

        Ok(normalized)
    }

    /// Credit the active player and pass the turn on
    fn accept(&mut self, raw: &str, normalized: String) {
        self.used_words.insert(normalized);

        let current = self.active_player_index;
        self.players[current].score += 1;

        let next = (current + 1) % self.players.len();
        for (index, player) in self.players.iter_mut().enumerate() {
            player.is_active = index == next;
        }

        self.active_player_index = next;
        self.last_entered_word = raw.to_string();
        self.time_remaining = self.full_duration();
    }

    fn time_out(&mut self) {
        self.phase = GamePhase::Finished;
        self.loser = self.active_player().cloned();
    }
}

#[derive(Debug)]
struct RoundInner {
    state: RoundState,
    countdown: Countdown,
    events: RoundEventBus,
}

#[derive(Debug)]
struct RoundShared {
    inner: Mutex<RoundInner>,
    snapshots: watch::Sender<RoundSnapshot>,
}

impl RoundShared {
    fn publish(&self, state: &RoundState) {
        self.snapshots.send_replace(state.snapshot());
    }
}

#[async_trait]
impl TickHandler for RoundShared {
    async fn on_tick(&self, generation: Generation) -> bool {
        let mut guard = self.inner.lock().await;
        let RoundInner {
            state,
            countdown,
            events,
        } = &mut *guard;

        if !countdown.is_current(generation) || state.phase != GamePhase::Playing {
            debug!("Discarding stale tick from generation {}", generation);
            return false;
        }

        state.time_remaining = state.time_remaining.saturating_sub(1);

        if state.time_remaining > 0 {
            self.publish(state);
            return true;
        }

        state.time_out();
        countdown.cancel();

        if let Some(loser) = state.loser.clone() {
            info!("{} ran out of time", loser.name);
            events.publish(RoundEvent::PlayerTimedOut { loser });
        }
        self.publish(state);
        false
    }
}

/// Owns one round and applies intents to it one at a time. Cloning gives
/// another handle to the same round.
#[derive(Clone)]
pub struct RoundStateMachine {
    shared: Arc<RoundShared>,
    catalog: Arc<WordCatalog>,
    settings_store: SettingsStore,
}

impl RoundStateMachine {
    pub fn new(catalog: Arc<WordCatalog>, settings_store: SettingsStore) -> Self {
        Self::new_with_tick_period(catalog, settings_store, TICK_PERIOD)
    }

    pub fn new_with_tick_period(
        catalog: Arc<WordCatalog>,
        settings_store: SettingsStore,
        tick_period: Duration,
    ) -> Self {
        let state = RoundState::default();
        let (snapshots, _) = watch::channel(state.snapshot());

        let inner = RoundInner {
            state,
            countdown: Countdown::with_period(tick_period),
            events: RoundEventBus::new(),
        };

        Self {
            shared: Arc::new(RoundShared {
                inner: Mutex::new(inner),
                snapshots,
            }),
            catalog,
            settings_store,
        }
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> RoundSnapshot {
        self.shared.snapshots.borrow().clone()
    }

    /// Receive a snapshot after every state change
    pub fn subscribe(&self) -> watch::Receiver<RoundSnapshot> {
        self.shared.snapshots.subscribe()
    }

    pub async fn add_event_handler(&self, handler: Box<dyn RoundEventHandler>) {
        self.shared.inner.lock().await.events.add_handler(handler);
    }

    pub async fn is_word_used(&self, word: &str) -> bool {
        let inner = self.shared.inner.lock().await;
        inner.state.used_words.contains(&normalize_word(word))
    }

    pub fn catalog(&self) -> &WordCatalog {
        &self.catalog
    }

    /// Hard reset into a new round, callable from any phase. Unknown
    /// categories fall back to a random one and unreadable settings fall back
    /// to the defaults; setup itself never fails.
    pub async fn setup_new_game(&self, player_names: &[impl AsRef<str>], category_name: Option<&str>) {
        if player_names.is_empty() {
            warn!("Ignoring setup with an empty roster");
            return;
        }

        let category = self.catalog.resolve(category_name).clone();
        let settings = match self.settings_store.load().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                GameSettings::default()
            }
        };

        let mut guard = self.shared.inner.lock().await;
        let RoundInner {
            state,
            countdown,
            events,
        } = &mut *guard;

        countdown.cancel();
        *state = RoundState::new(player_names, category, settings);

        info!(
            "Set up game with {} players in category '{}'",
            state.players.len(),
            state.category.name
        );
        events.publish(RoundEvent::GameSetUp {
            players: state.players.clone(),
            category: state.category.name.clone(),
            timer_duration_seconds: settings.timer_duration_seconds,
        });
        self.shared.publish(state);
    }

    /// READY -> PLAYING, starting the countdown at the configured duration
    pub async fn start_game(&self) {
        let mut guard = self.shared.inner.lock().await;
        let RoundInner {
            state,
            countdown,
            events,
        } = &mut *guard;

        if state.phase != GamePhase::Ready {
            debug!("Ignoring start in phase {:?}", state.phase);
            return;
        }

        state.phase = GamePhase::Playing;
        state.time_remaining = state.full_duration();
        state.paused_time_remaining = None;
        countdown.start(Arc::downgrade(&self.shared));

        info!("Game started with {}s on the clock", state.time_remaining);
        events.publish(RoundEvent::GameStarted {
            time_remaining: state.time_remaining,
        });
        self.shared.publish(state);
    }

    /// Returns true iff the word was accepted for the active player. Any
    /// rejection leaves the round untouched.
    pub async fn submit_word(&self, word: &str) -> bool {
        let mut guard = self.shared.inner.lock().await;
        let RoundInner {
            state,
            countdown,
            events,
        } = &mut *guard;

        let normalized = match state.evaluate(word) {
            Ok(normalized) => normalized,
            Err(reason) => {
                debug!("Rejected '{}': {:?}", word, reason);
                events.publish(RoundEvent::WordRejected {
                    word: word.to_string(),
                    reason,
                });
                return false;
            }
        };

        let player = state
            .active_player()
            .map(|p| p.name.clone())
            .unwrap_or_default();

        state.accept(word, normalized);
        countdown.start(Arc::downgrade(&self.shared));

        let next_player = state
            .active_player()
            .map(|p| p.name.clone())
            .unwrap_or_default();

        info!("{} played '{}', {} is up", player, word, next_player);
        events.publish(RoundEvent::WordAccepted {
            player,
            word: word.to_string(),
            next_player,
        });
        self.shared.publish(state);
        true
    }

    /// PLAYING -> PAUSED, freezing the remaining time
    pub async fn pause_game(&self) {
        let mut guard = self.shared.inner.lock().await;
        let RoundInner {
            state,
            countdown,
            events,
        } = &mut *guard;

        if state.phase != GamePhase::Playing {
            return;
        }

        countdown.cancel();
        state.phase = GamePhase::Paused;
        state.paused_time_remaining = Some(state.time_remaining);

        info!("Game paused at {}s", state.time_remaining);
        events.publish(RoundEvent::GamePaused {
            time_remaining: state.time_remaining,
        });
        self.shared.publish(state);
    }

    /// PAUSED -> PLAYING, ticking on from the frozen time
    pub async fn resume_game(&self) {
        let mut guard = self.shared.inner.lock().await;
        let RoundInner {
            state,
            countdown,
            events,
        } = &mut *guard;

        if state.phase != GamePhase::Paused {
            return;
        }

        let time_remaining = state
            .paused_time_remaining
            .take()
            .unwrap_or_else(|| state.full_duration());

        state.phase = GamePhase::Playing;
        state.time_remaining = time_remaining;
        countdown.start(Arc::downgrade(&self.shared));

        info!("Game resumed at {}s", time_remaining);
        events.publish(RoundEvent::GameResumed { time_remaining });
        self.shared.publish(state);
    }

    /// Any phase -> EXIT
    pub async fn exit_game(&self) {
        let mut guard = self.shared.inner.lock().await;
        let RoundInner {
            state,
            countdown,
            events,
        } = &mut *guard;

        countdown.cancel();
        state.phase = GamePhase::Exit;

        info!("Game exited");
        events.publish(RoundEvent::GameExited);
        self.shared.publish(state);
    }
}
