//! User-presence prompt presentation.

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::types::PromptSpec;

/// Terminal response from a presented prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    /// The user passed the biometric or credential check.
    Confirmed,
    /// The check ran and did not match the user.
    Rejected,
    /// The user dismissed the prompt.
    Dismissed,
}

/// A challenge handed to the platform prompt UI.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    /// Unique id of this presentation, used for dismissal.
    pub challenge_id: Uuid,
    /// Alias whose use triggered the challenge; empty for standalone
    /// presence checks.
    pub alias: String,
    /// Display strings.
    pub prompt: PromptSpec,
}

/// Presents biometric/credential prompts on behalf of the gate.
///
/// Presentation is non-blocking: `present` hands the prompt to the
/// platform UI and returns a receiver that resolves once the user answers.
/// The gate enforces the bounded wait and calls [`Self::dismiss`] when it
/// gives up, so implementations never own timeout logic.
pub trait PromptPresenter: Send + Sync {
    /// Begins presenting `request`.
    ///
    /// The returned receiver resolves with the user's terminal response.
    /// Dropping the sender side without answering is treated as a
    /// dismissal.
    fn present(&self, request: PromptRequest) -> oneshot::Receiver<PromptOutcome>;

    /// Tears down a pending presentation (bounded wait elapsed or caller
    /// cancellation). Must release any platform prompt state for
    /// `challenge_id`; dismissing an already-resolved challenge is a
    /// no-op.
    fn dismiss(&self, challenge_id: Uuid);
}
