//! Spoken input. Recognition itself is a platform capability behind
//! [`SpeechRecognizer`]; a recognized phrase goes through
//! [`RoundStateMachine::submit_word`] exactly like typed input.
//!
//! Status text shown next to the microphone button is published through a
//! watch channel. Error and invalid-word messages clear themselves after a
//! short delay unless a newer status replaced them first.

use async_trait::async_trait;
use quickdraw_types::SpeechError;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::permissions::{MicrophoneAccess, PermissionGate, request_microphone};
use crate::round::RoundStateMachine;

pub const ERROR_STATUS_TTL: Duration = Duration::from_secs(3);
pub const INVALID_WORD_STATUS_TTL: Duration = Duration::from_secs(2);

pub const LISTENING_STATUS: &str = "Listening...";
pub const PROCESSING_STATUS: &str = "Processing...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageModel {
    FreeForm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionRequest {
    pub locale: String,
    pub language_model: LanguageModel,
    pub max_results: u32,
    pub partial_results: bool,
}

impl RecognitionRequest {
    pub fn free_form(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            language_model: LanguageModel::FreeForm,
            max_results: 1,
            partial_results: true,
        }
    }
}

/// Platform speech-to-text. Yields at most one phrase per request.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(
        &self,
        request: &RecognitionRequest,
        progress: &SpeechProgress,
    ) -> Result<Option<String>, SpeechError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeechStatus {
    pub text: String,
    pub listening: bool,
}

#[derive(Debug)]
struct StatusLine {
    sender: watch::Sender<SpeechStatus>,
    generation: AtomicU64,
}

impl StatusLine {
    fn new() -> Self {
        let (sender, _) = watch::channel(SpeechStatus::default());
        Self {
            sender,
            generation: AtomicU64::new(0),
        }
    }

    fn set(&self, text: String, listening: bool) -> u64 {
        let mut generation = 0;
        self.sender.send_modify(|status| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            status.text = text;
            status.listening = listening;
        });
        generation
    }

    fn set_listening(&self, listening: bool) {
        self.sender.send_if_modified(|status| {
            let changed = status.listening != listening;
            status.listening = listening;
            changed
        });
    }

    /// Show a message that clears itself after `ttl`
    fn set_transient(self: &Arc<Self>, text: String, ttl: Duration) {
        let generation = self.set(text, false);
        let line = Arc::downgrade(self);

        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let Some(line) = line.upgrade() else {
                return;
            };
            line.sender.send_if_modified(|status| {
                if line.generation.load(Ordering::SeqCst) != generation {
                    return false;
                }
                status.text.clear();
                true
            });
        });
    }
}

/// Handed to the recognizer so it can report progress while listening
#[derive(Debug, Clone)]
pub struct SpeechProgress {
    status: Arc<StatusLine>,
}

impl SpeechProgress {
    pub fn ready_for_speech(&self) {
        self.status.set(LISTENING_STATUS.to_string(), true);
    }

    pub fn partial_result(&self, heard: &str) {
        self.status.set(format!("Heard: {}", heard), true);
    }

    pub fn end_of_speech(&self) {
        self.status.set(PROCESSING_STATUS.to_string(), false);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Accepted(String),
    Rejected(String),
    NothingHeard,
    Failed(SpeechError),
    PermissionRequired(MicrophoneAccess),
}

/// Feeds recognized speech into a round
#[derive(Clone)]
pub struct SpeechInput {
    round: RoundStateMachine,
    status: Arc<StatusLine>,
}

impl SpeechInput {
    pub fn new(round: RoundStateMachine) -> Self {
        Self {
            round,
            status: Arc::new(StatusLine::new()),
        }
    }

    pub fn status(&self) -> SpeechStatus {
        self.status.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SpeechStatus> {
        self.status.sender.subscribe()
    }

    pub fn progress(&self) -> SpeechProgress {
        SpeechProgress {
            status: self.status.clone(),
        }
    }

    pub fn stop_listening(&self) {
        self.status.set_listening(false);
    }

    /// Run one capture: check the microphone permission, listen, and submit
    /// whatever was heard.
    pub async fn capture(
        &self,
        gate: &dyn PermissionGate,
        recognizer: &dyn SpeechRecognizer,
        locale: &str,
    ) -> CaptureOutcome {
        let access = request_microphone(gate).await;
        if access != MicrophoneAccess::Ready {
            if let Some(rationale) = access.rationale() {
                self.status.set(rationale.to_string(), false);
            }
            return CaptureOutcome::PermissionRequired(access);
        }

        self.status.set(LISTENING_STATUS.to_string(), true);

        let request = RecognitionRequest::free_form(locale);
        let result = recognizer.recognize(&request, &self.progress()).await;

        match result {
            Err(error) => {
                warn!("Speech recognition failed: {:?}", error);
                self.status
                    .set_transient(error.message().to_string(), ERROR_STATUS_TTL);
                CaptureOutcome::Failed(error)
            }
            Ok(None) => {
                debug!("Recognizer returned no phrase");
                self.stop_listening();
                CaptureOutcome::NothingHeard
            }
            Ok(Some(phrase)) => {
                self.status.set(format!("\"{}\"", phrase), false);

                if self.round.submit_word(&phrase).await {
                    CaptureOutcome::Accepted(phrase)
                } else {
                    self.status.set_transient(
                        format!("\"{}\" - Not valid for this category", phrase),
                        INVALID_WORD_STATUS_TTL,
                    );
                    CaptureOutcome::Rejected(phrase)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{AlwaysGranted, MICROPHONE_RATIONALE, PermissionOutcome};
    use crate::settings::SettingsStore;
    use crate::word_catalog::WordCatalog;
    use quickdraw_types::GamePhase;

    struct ScriptedRecognizer {
        partial: Option<&'static str>,
        result: Result<Option<String>, SpeechError>,
    }

    impl ScriptedRecognizer {
        fn hears(phrase: &str) -> Self {
            Self {
                partial: None,
                result: Ok(Some(phrase.to_string())),
            }
        }

        fn fails(error: SpeechError) -> Self {
            Self {
                partial: None,
                result: Err(error),
            }
        }
    }

    #[async_trait]
    impl SpeechRecognizer for ScriptedRecognizer {
        async fn recognize(
            &self,
            request: &RecognitionRequest,
            progress: &SpeechProgress,
        ) -> Result<Option<String>, SpeechError> {
            assert_eq!(request.language_model, LanguageModel::FreeForm);
            assert_eq!(request.max_results, 1);

            progress.ready_for_speech();
            if let Some(partial) = self.partial {
                progress.partial_result(partial);
            }
            progress.end_of_speech();
            self.result.clone()
        }
    }

    struct DeniedGate(PermissionOutcome);

    #[async_trait]
    impl PermissionGate for DeniedGate {
        fn is_granted(&self) -> bool {
            false
        }

        async fn request(&self) -> PermissionOutcome {
            self.0
        }
    }

    async fn playing_round() -> RoundStateMachine {
        let round =
            RoundStateMachine::new(Arc::new(WordCatalog::builtin()), SettingsStore::in_memory());
        round.setup_new_game(&["Alice", "Bob"], Some("Colors")).await;
        round.start_game().await;
        round
    }

    #[tokio::test(start_paused = true)]
    async fn test_recognized_word_is_submitted() {
        let round = playing_round().await;
        let speech = SpeechInput::new(round.clone());

        let outcome = speech
            .capture(&AlwaysGranted, &ScriptedRecognizer::hears("Purple"), "en-US")
            .await;

        assert_eq!(outcome, CaptureOutcome::Accepted("Purple".to_string()));
        assert_eq!(speech.status().text, "\"Purple\"");
        assert!(!speech.status().listening);

        let snapshot = round.snapshot();
        assert_eq!(snapshot.players[0].score, 1);
        assert_eq!(snapshot.last_entered_word, "Purple");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_word_message_clears_after_two_seconds() {
        let round = playing_round().await;
        let speech = SpeechInput::new(round.clone());

        let outcome = speech
            .capture(&AlwaysGranted, &ScriptedRecognizer::hears("Banana"), "en-US")
            .await;

        assert_eq!(outcome, CaptureOutcome::Rejected("Banana".to_string()));
        assert_eq!(
            speech.status().text,
            "\"Banana\" - Not valid for this category"
        );
        assert_eq!(round.snapshot().players[0].score, 0);

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert!(!speech.status().text.is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(speech.status().text.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_message_clears_after_three_seconds() {
        let round = playing_round().await;
        let speech = SpeechInput::new(round.clone());

        let outcome = speech
            .capture(
                &AlwaysGranted,
                &ScriptedRecognizer::fails(SpeechError::NetworkTimeout),
                "en-US",
            )
            .await;

        assert_eq!(outcome, CaptureOutcome::Failed(SpeechError::NetworkTimeout));
        assert_eq!(speech.status().text, "Network timeout");
        assert_eq!(round.snapshot().phase, GamePhase::Playing);

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert_eq!(speech.status().text, "Network timeout");

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(speech.status().text.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_status_survives_old_clear() {
        let round = playing_round().await;
        let speech = SpeechInput::new(round.clone());

        speech
            .capture(
                &AlwaysGranted,
                &ScriptedRecognizer::fails(SpeechError::NoMatch),
                "en-US",
            )
            .await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        speech.progress().partial_result("gre");

        // The pending clear from the error must not wipe the newer status
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(speech.status().text, "Heard: gre");
        assert!(speech.status().listening);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_results_are_published() {
        let round = playing_round().await;
        let speech = SpeechInput::new(round);
        let mut updates = speech.subscribe();

        let recognizer = ScriptedRecognizer {
            partial: Some("bl"),
            result: Ok(None),
        };
        let outcome = speech.capture(&AlwaysGranted, &recognizer, "en-US").await;

        assert_eq!(outcome, CaptureOutcome::NothingHeard);
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().text, PROCESSING_STATUS);
        assert!(!speech.status().listening);
    }

    #[tokio::test]
    async fn test_capture_requires_permission() {
        let round = playing_round().await;
        let speech = SpeechInput::new(round.clone());

        let outcome = speech
            .capture(
                &DeniedGate(PermissionOutcome::PermanentlyDenied),
                &ScriptedRecognizer::hears("Red"),
                "en-US",
            )
            .await;

        assert_eq!(
            outcome,
            CaptureOutcome::PermissionRequired(MicrophoneAccess::OpenSystemSettings)
        );
        assert_eq!(round.snapshot().players[0].score, 0);
        assert!(speech.status().text.is_empty());
    }

    #[tokio::test]
    async fn test_soft_denial_shows_rationale() {
        let round = playing_round().await;
        let speech = SpeechInput::new(round.clone());

        let outcome = speech
            .capture(
                &DeniedGate(PermissionOutcome::Denied),
                &ScriptedRecognizer::hears("Red"),
                "en-US",
            )
            .await;

        assert_eq!(
            outcome,
            CaptureOutcome::PermissionRequired(MicrophoneAccess::ShowRationale)
        );
        assert_eq!(speech.status().text, MICROPHONE_RATIONALE);
        assert!(!speech.status().listening);
        assert_eq!(round.snapshot().players[0].score, 0);
    }

    #[test]
    fn test_every_error_has_a_message() {
        let errors = [
            SpeechError::Audio,
            SpeechError::Client,
            SpeechError::InsufficientPermissions,
            SpeechError::Network,
            SpeechError::NetworkTimeout,
            SpeechError::NoMatch,
            SpeechError::RecognizerBusy,
            SpeechError::Server,
            SpeechError::SpeechTimeout,
            SpeechError::Unknown,
        ];

        for error in errors {
            assert!(!error.message().is_empty());
        }
        assert_eq!(SpeechError::SpeechTimeout.message(), "No speech input");
    }
}
