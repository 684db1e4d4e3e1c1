//! # Tadka Voice
//!
//! Voice assistant overlay for Tadka Tales: a listening/speaking state
//! machine whose async operations are stamped with an epoch so that a late
//! completion after `close` or a restart has no effect.
//!
//! ```text
//!  user action ──► VoiceOverlay ──► VoiceSession (state + epoch)
//!                      │  spawn(epoch)          ▲
//!                      ▼                        │ completion(epoch)
//!   SpeechRecognizer / Responder / SpeechSynthesizer
//! ```

pub mod error;
pub mod operation;
pub mod overlay;
pub mod state;

pub use error::{VoiceError, VoiceResult};
pub use operation::{
    AssistantResponder, EchoResponder, Responder, SimulatedRecognizer, SimulatedSynthesizer,
    SpeechRecognizer, SpeechSynthesizer, VoiceConfig,
};
pub use overlay::{quick_actions, Controls, OverlayEvent, VoiceOverlay};
pub use state::{Epoch, IgnoreReason, Outcome, VoiceEvent, VoiceSession, VoiceState};
