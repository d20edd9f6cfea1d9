//! Session-level error taxonomy
//!
//! Every service failure is converted into one of these at the controller
//! boundary; nothing below the controller surfaces as an uncaught fault.

use thiserror::Error;

use crate::domain::MalformedPlacementError;

/// Errors reported by the session controller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Liveness probe failed; no session state is created
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Clue or layout request failed, or returned nothing usable
    #[error("Generation failed: {0}")]
    GenerationFailure(String),

    /// Layout service returned placements that contradict its grid
    #[error("Malformed placement: {0}")]
    MalformedPlacement(#[from] MalformedPlacementError),

    /// Assistant reply failed; the transcript receives a fallback message
    #[error("Chat failed: {0}")]
    ChatFailure(String),

    /// Rejected synchronously; no request issued, no state change
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A newer generation request started before this one finished
    #[error("Superseded by a newer generation request")]
    Superseded,

    #[error("Controller channel closed")]
    ChannelError,
}

impl SessionError {
    /// Malformed layout data counts as a generation failure
    pub fn is_generation_failure(&self) -> bool {
        matches!(self, SessionError::GenerationFailure(_) | SessionError::MalformedPlacement(_))
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, SessionError::InvalidInput(_))
    }
}
