use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Failure codes a speech recognizer can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum SpeechError {
    Audio,
    Client,
    InsufficientPermissions,
    Network,
    NetworkTimeout,
    NoMatch,
    RecognizerBusy,
    Server,
    SpeechTimeout,
    Unknown,
}

impl SpeechError {
    pub fn message(&self) -> &'static str {
        match self {
            SpeechError::Audio => "Audio recording error",
            SpeechError::Client => "Client side error",
            SpeechError::InsufficientPermissions => "Insufficient permissions",
            SpeechError::Network => "Network error",
            SpeechError::NetworkTimeout => "Network timeout",
            SpeechError::NoMatch => "No match found",
            SpeechError::RecognizerBusy => "RecognitionService busy",
            SpeechError::Server => "Server error",
            SpeechError::SpeechTimeout => "No speech input",
            SpeechError::Unknown => "Unknown error",
        }
    }
}

impl std::fmt::Display for SpeechError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Why a submitted word did not count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum WordRejection {
    NotPlaying,
    Blank,
    AlreadyUsed,
    NotInCategory,
}
