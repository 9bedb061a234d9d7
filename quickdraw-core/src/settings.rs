use anyhow::Result;
use async_trait::async_trait;
use quickdraw_types::{DEFAULT_MAX_PLAYERS, DEFAULT_MIN_PLAYERS, GameSettings, SettingsUpdate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const SETTINGS_BUCKET: &str = "quickdraw_settings";

pub const KEY_TIMER_DURATION: &str = "timer_duration";
pub const KEY_MIN_PLAYERS: &str = "min_players";
pub const KEY_MAX_PLAYERS: &str = "max_players";
pub const KEY_SOUND_EFFECTS: &str = "sound_effects";
pub const KEY_VIBRATION: &str = "vibration";

pub const MIN_TIMER_SECONDS: u32 = 5;
pub const MAX_TIMER_SECONDS: u32 = 60;
pub const MIN_PLAYERS_FLOOR: u32 = 2;
pub const MIN_PLAYERS_CEILING: u32 = 4;
pub const MAX_PLAYERS_CEILING: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Bool(bool),
    Int(i64),
}

impl StoredValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            StoredValue::Int(value) => Some(*value),
            StoredValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StoredValue::Bool(value) => Some(*value),
            StoredValue::Int(_) => None,
        }
    }
}

/// Writes staged for a single commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    entries: Vec<(String, StoredValue)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: &str, value: StoredValue) -> &mut Self {
        self.entries.retain(|(existing, _)| existing != key);
        self.entries.push((key.to_string(), value));
        self
    }

    pub fn entries(&self) -> &[(String, StoredValue)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Namespaced key-value storage. `commit` must apply a whole batch or nothing.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<StoredValue>>;

    async fn commit(&self, bucket: &str, batch: WriteBatch) -> Result<()>;
}

/// Process-local store, used by tests and sessions without a database.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    values: RwLock<HashMap<(String, String), StoredValue>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<StoredValue>> {
        let values = self.values.read().await;
        Ok(values.get(&(bucket.to_string(), key.to_string())).copied())
    }

    async fn commit(&self, bucket: &str, batch: WriteBatch) -> Result<()> {
        let mut values = self.values.write().await;
        for (key, value) in batch.entries {
            values.insert((bucket.to_string(), key), value);
        }
        Ok(())
    }
}

/// Loads and saves [`GameSettings`] through a [`KeyValueStore`].
#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryKeyValueStore::new()))
    }

    /// Read persisted settings. Missing or unusable values fall back to their
    /// defaults field by field.
    pub async fn load(&self) -> Result<GameSettings> {
        let defaults = GameSettings::default();

        let mut settings = GameSettings {
            timer_duration_seconds: self
                .read_int(KEY_TIMER_DURATION, defaults.timer_duration_seconds, is_valid_timer)
                .await?,
            min_players: self
                .read_int(KEY_MIN_PLAYERS, defaults.min_players, |v| {
                    (MIN_PLAYERS_FLOOR..=MIN_PLAYERS_CEILING).contains(&v)
                })
                .await?,
            max_players: self
                .read_int(KEY_MAX_PLAYERS, defaults.max_players, |v| {
                    (MIN_PLAYERS_FLOOR..=MAX_PLAYERS_CEILING).contains(&v)
                })
                .await?,
            enable_sound_effects: self
                .read_bool(KEY_SOUND_EFFECTS, defaults.enable_sound_effects)
                .await?,
            enable_vibration: self
                .read_bool(KEY_VIBRATION, defaults.enable_vibration)
                .await?,
        };

        if settings.min_players > settings.max_players {
            warn!(
                "Stored player range {}..{} is inverted, using defaults",
                settings.min_players, settings.max_players
            );
            settings.min_players = DEFAULT_MIN_PLAYERS;
            settings.max_players = DEFAULT_MAX_PLAYERS;
        }

        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Persist all five fields in one commit
    pub async fn save(&self, settings: &GameSettings) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch
            .put(
                KEY_TIMER_DURATION,
                StoredValue::Int(settings.timer_duration_seconds.into()),
            )
            .put(KEY_MIN_PLAYERS, StoredValue::Int(settings.min_players.into()))
            .put(KEY_MAX_PLAYERS, StoredValue::Int(settings.max_players.into()))
            .put(
                KEY_SOUND_EFFECTS,
                StoredValue::Bool(settings.enable_sound_effects),
            )
            .put(KEY_VIBRATION, StoredValue::Bool(settings.enable_vibration));

        self.store.commit(SETTINGS_BUCKET, batch).await?;
        info!("Saved settings: {:?}", settings);
        Ok(())
    }

    async fn read_int(&self, key: &str, default: u32, valid: impl Fn(u32) -> bool) -> Result<u32> {
        let Some(stored) = self.store.get(SETTINGS_BUCKET, key).await? else {
            return Ok(default);
        };

        match stored.as_int().and_then(|v| u32::try_from(v).ok()) {
            Some(value) if valid(value) => Ok(value),
            _ => {
                warn!("Ignoring stored {} = {:?}, using {}", key, stored, default);
                Ok(default)
            }
        }
    }

    async fn read_bool(&self, key: &str, default: bool) -> Result<bool> {
        let Some(stored) = self.store.get(SETTINGS_BUCKET, key).await? else {
            return Ok(default);
        };

        Ok(stored.as_bool().unwrap_or_else(|| {
            warn!("Ignoring stored {} = {:?}, using {}", key, stored, default);
            default
        }))
    }
}

fn is_valid_timer(seconds: u32) -> bool {
    (MIN_TIMER_SECONDS..=MAX_TIMER_SECONDS).contains(&seconds)
}

/// In-memory draft of the settings being edited. Setters silently ignore
/// values that are out of range or would break `min_players <= max_players`;
/// each returns whether the change was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsEditor {
    draft: GameSettings,
}

impl SettingsEditor {
    pub fn new(settings: GameSettings) -> Self {
        Self { draft: settings }
    }

    pub fn settings(&self) -> &GameSettings {
        &self.draft
    }

    pub fn into_settings(self) -> GameSettings {
        self.draft
    }

    pub fn update_timer_duration(&mut self, seconds: u32) -> bool {
        if !is_valid_timer(seconds) {
            return false;
        }
        self.draft.timer_duration_seconds = seconds;
        true
    }

    pub fn update_min_players(&mut self, count: u32) -> bool {
        let ceiling = MIN_PLAYERS_CEILING.min(self.draft.max_players);
        if !(MIN_PLAYERS_FLOOR..=ceiling).contains(&count) {
            return false;
        }
        self.draft.min_players = count;
        true
    }

    pub fn update_max_players(&mut self, count: u32) -> bool {
        if count < self.draft.min_players || count > MAX_PLAYERS_CEILING {
            return false;
        }
        self.draft.max_players = count;
        true
    }

    pub fn toggle_sound_effects(&mut self) {
        self.draft.enable_sound_effects = !self.draft.enable_sound_effects;
    }

    pub fn toggle_vibration(&mut self) {
        self.draft.enable_vibration = !self.draft.enable_vibration;
    }

    pub fn reset_to_defaults(&mut self) {
        self.draft = GameSettings::default();
    }

    /// Apply a partial update, returning the names of the fields that were
    /// rejected. The player range is applied in whichever order lets both
    /// bounds move.
    pub fn apply(&mut self, update: &SettingsUpdate) -> Vec<String> {
        let mut rejected = Vec::new();

        if let Some(seconds) = update.timer_duration_seconds {
            if !self.update_timer_duration(seconds) {
                rejected.push("timer_duration_seconds".to_string());
            }
        }

        match (update.min_players, update.max_players) {
            (Some(min), Some(max)) => {
                let min_applied = self.update_min_players(min);
                let max_applied = self.update_max_players(max);
                // Raising both bounds needs max to move first
                let min_applied = min_applied || self.update_min_players(min);
                if !min_applied {
                    rejected.push("min_players".to_string());
                }
                if !max_applied {
                    rejected.push("max_players".to_string());
                }
            }
            (Some(min), None) => {
                if !self.update_min_players(min) {
                    rejected.push("min_players".to_string());
                }
            }
            (None, Some(max)) => {
                if !self.update_max_players(max) {
                    rejected.push("max_players".to_string());
                }
            }
            (None, None) => {}
        }

        if let Some(enabled) = update.enable_sound_effects {
            self.draft.enable_sound_effects = enabled;
        }
        if let Some(enabled) = update.enable_vibration {
            self.draft.enable_vibration = enabled;
        }

        rejected
    }
}

impl From<GameSettings> for SettingsEditor {
    fn from(settings: GameSettings) -> Self {
        Self::new(settings)
    }
}
