use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::player::Player;
use crate::settings::GameSettings;

/// Trimmed, lowercased form used for duplicate and category checks.
pub fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Category {
    pub name: String,
    pub words: Vec<String>,
    pub difficulty: Difficulty,
}

impl Category {
    pub fn new(name: impl Into<String>, words: &[&str]) -> Self {
        Self {
            name: name.into(),
            words: words.iter().map(|w| w.to_string()).collect(),
            difficulty: Difficulty::Medium,
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Case-insensitive membership check. Blank input never matches.
    pub fn contains_word(&self, word: &str) -> bool {
        let word = normalize_word(word);
        if word.is_empty() {
            return false;
        }
        self.words.iter().any(|w| normalize_word(w) == word)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategorySummary {
    pub name: String,
    pub difficulty: Difficulty,
    pub word_count: usize,
}

impl From<&Category> for CategorySummary {
    fn from(category: &Category) -> Self {
        CategorySummary {
            name: category.name.clone(),
            difficulty: category.difficulty,
            word_count: category.words.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum GamePhase {
    #[default]
    Setup, // Choosing players and category
    Ready,    // Set up, countdown not started
    Playing,  // Countdown running
    Paused,   // Countdown frozen
    Finished, // Someone timed out
    Exit,     // Control handed back to the caller
}

/// Read-only view of a round, published after every state change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoundSnapshot {
    pub phase: GamePhase,
    pub players: Vec<Player>,
    pub active_player_index: usize,
    pub category: Category,
    pub used_word_count: usize,
    pub last_entered_word: String,
    pub loser: Option<Player>,
    pub time_remaining: u32,
    pub settings: GameSettings,
}

impl RoundSnapshot {
    pub fn active_player(&self) -> Option<&Player> {
        self.players.get(self.active_player_index)
    }
}
