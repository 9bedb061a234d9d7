use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub const DEFAULT_TIMER_DURATION_SECONDS: u32 = 15;
pub const DEFAULT_MIN_PLAYERS: u32 = 2;
pub const DEFAULT_MAX_PLAYERS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GameSettings {
    pub timer_duration_seconds: u32,
    pub min_players: u32,
    pub max_players: u32,
    pub enable_sound_effects: bool,
    pub enable_vibration: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            timer_duration_seconds: DEFAULT_TIMER_DURATION_SECONDS,
            min_players: DEFAULT_MIN_PLAYERS,
            max_players: DEFAULT_MAX_PLAYERS,
            enable_sound_effects: true,
            enable_vibration: true,
        }
    }
}

/// Partial settings change as sent by a settings editor. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettingsUpdate {
    pub timer_duration_seconds: Option<u32>,
    pub min_players: Option<u32>,
    pub max_players: Option<u32>,
    pub enable_sound_effects: Option<bool>,
    pub enable_vibration: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettingsResponse {
    pub settings: GameSettings,
    pub rejected_fields: Vec<String>,
}
