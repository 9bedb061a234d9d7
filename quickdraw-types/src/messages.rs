use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::RoundSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ClientMessage {
    SetupGame {
        player_names: Vec<String>,
        category: Option<String>,
    },
    StartGame,
    SubmitWord { word: String },
    PauseGame,
    ResumeGame,
    ExitGame,
    Heartbeat,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ServerMessage {
    RoundUpdate { snapshot: RoundSnapshot },
    WordResult { word: String, accepted: bool },
    HeartbeatAck,
    Error { message: String },
}
