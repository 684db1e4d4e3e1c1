//! Error types for voice operations
//!
//! These never reach the state machine: a failed operation is turned into an
//! `Abort` event for its epoch.

use tadka_core::GatewayError;
use thiserror::Error;

/// Result type alias for voice operations
pub type VoiceResult<T> = Result<T, VoiceError>;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Assistant request failed: {0}")]
    Assistant(#[from] GatewayError),
}
