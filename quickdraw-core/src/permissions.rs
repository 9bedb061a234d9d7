//! Microphone permission flow. The platform supplies a [`PermissionGate`];
//! this module only decides what the front-end should do next.

use async_trait::async_trait;
use tracing::info;

pub const MICROPHONE_RATIONALE: &str = "To play this game, we need access to your microphone to recognize spoken words. Without this permission, you won't be able to play the game using voice.";

/// Result of asking the platform for a permission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    Granted,
    /// Refused, but asking again is allowed
    Denied,
    /// Refused for good; only the system settings can change it
    PermanentlyDenied,
}

#[async_trait]
pub trait PermissionGate: Send + Sync {
    fn is_granted(&self) -> bool;

    async fn request(&self) -> PermissionOutcome;
}

/// What the front-end should do about microphone access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicrophoneAccess {
    Ready,
    ShowRationale,
    OpenSystemSettings,
}

impl MicrophoneAccess {
    /// Explanation to show before asking again, only after a soft denial
    pub fn rationale(&self) -> Option<&'static str> {
        match self {
            MicrophoneAccess::ShowRationale => Some(MICROPHONE_RATIONALE),
            MicrophoneAccess::Ready | MicrophoneAccess::OpenSystemSettings => None,
        }
    }
}

pub async fn request_microphone(gate: &dyn PermissionGate) -> MicrophoneAccess {
    if gate.is_granted() {
        return MicrophoneAccess::Ready;
    }

    match gate.request().await {
        PermissionOutcome::Granted => MicrophoneAccess::Ready,
        PermissionOutcome::Denied => {
            info!("Microphone permission denied, showing rationale");
            MicrophoneAccess::ShowRationale
        }
        PermissionOutcome::PermanentlyDenied => {
            info!("Microphone permission permanently denied");
            MicrophoneAccess::OpenSystemSettings
        }
    }
}

/// Gate for hosts without a permission model
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

#[async_trait]
impl PermissionGate for AlwaysGranted {
    fn is_granted(&self) -> bool {
        true
    }

    async fn request(&self) -> PermissionOutcome {
        PermissionOutcome::Granted
    }
}
