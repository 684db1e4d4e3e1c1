//! Voice interaction state machine
//!
//! ```text
//!            StartListening                RecognitionComplete(e)
//!   Idle ─────────────────────► Listening ─────────────────────► TranscriptReady
//!    ▲  ◄──── StopListening ────┘                                  │        │
//!    │                                            StartListening ◄─┘        │ StartSpeaking
//!    └──────────────── SpeechComplete(e) ◄──── Speaking ◄───────────────────┘
//! ```
//!
//! `Close` resets to `Idle` from anywhere. Entering `Listening` or `Speaking`
//! stamps a fresh epoch; completions carry the epoch they were issued under
//! and are ignored once it is no longer current.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// Generation counter for in-flight operations.
pub type Epoch = u64;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "transcript", rename_all = "snake_case")]
pub enum VoiceState {
    #[default]
    Idle,
    Listening,
    TranscriptReady(String),
    Speaking(String),
}

impl VoiceState {
    pub fn is_listening(&self) -> bool {
        matches!(self, VoiceState::Listening)
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self, VoiceState::Speaking(_))
    }

    /// Transcript, present only in `TranscriptReady` and `Speaking`.
    pub fn transcript(&self) -> Option<&str> {
        match self {
            VoiceState::TranscriptReady(t) | VoiceState::Speaking(t) => Some(t),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            VoiceState::Idle => "idle",
            VoiceState::Listening => "listening",
            VoiceState::TranscriptReady(_) => "transcript_ready",
            VoiceState::Speaking(_) => "speaking",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    StartListening,
    /// User cancel while listening; discards any partial recognition.
    StopListening,
    RecognitionComplete { epoch: Epoch, text: String },
    StartSpeaking,
    SpeechComplete { epoch: Epoch },
    /// The operation for `epoch` failed; return to `Idle`.
    Abort { epoch: Epoch },
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Completion from an epoch that is no longer current.
    StaleEpoch,
    /// Event has no transition from the current state.
    NotApplicable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Ignored(IgnoreReason),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

/// One overlay's voice session. Owned by a single overlay; never shared.
#[derive(Debug, Clone, Default)]
pub struct VoiceSession {
    state: VoiceState,
    epoch: Epoch,
    started_at: Option<DateTime<Utc>>,
}

impl VoiceSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &VoiceState {
        &self.state
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// When the current listening/speaking cycle began; `None` while idle.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn transcript(&self) -> Option<&str> {
        self.state.transcript()
    }

    /// Apply one event. Never fails; inapplicable or stale events leave the
    /// session untouched and report why.
    pub fn apply(&mut self, event: VoiceEvent) -> Outcome {
        let from = self.state.name();
        let outcome = self.transition(event);
        match outcome {
            Outcome::Applied => debug!(
                from,
                to = self.state.name(),
                epoch = self.epoch,
                "Voice transition"
            ),
            Outcome::Ignored(reason) => {
                debug!(state = from, epoch = self.epoch, ?reason, "Voice event ignored")
            }
        }
        outcome
    }

    fn transition(&mut self, event: VoiceEvent) -> Outcome {
        let state = std::mem::take(&mut self.state);
        let (next, outcome) = match (state, event) {
            (VoiceState::Idle | VoiceState::TranscriptReady(_), VoiceEvent::StartListening) => {
                self.advance();
                self.started_at = Some(Utc::now());
                (VoiceState::Listening, Outcome::Applied)
            }
            (VoiceState::Listening, VoiceEvent::StopListening) => {
                self.advance();
                (VoiceState::Idle, Outcome::Applied)
            }
            (VoiceState::Listening, VoiceEvent::RecognitionComplete { epoch, text }) => {
                if epoch != self.epoch {
                    (VoiceState::Listening, Outcome::Ignored(IgnoreReason::StaleEpoch))
                } else if text.trim().is_empty() {
                    // Nothing was heard.
                    self.advance();
                    (VoiceState::Idle, Outcome::Applied)
                } else {
                    (VoiceState::TranscriptReady(text), Outcome::Applied)
                }
            }
            (VoiceState::TranscriptReady(text), VoiceEvent::StartSpeaking) => {
                self.advance();
                (VoiceState::Speaking(text), Outcome::Applied)
            }
            (VoiceState::Speaking(text), VoiceEvent::SpeechComplete { epoch }) => {
                if epoch != self.epoch {
                    (VoiceState::Speaking(text), Outcome::Ignored(IgnoreReason::StaleEpoch))
                } else {
                    (VoiceState::Idle, Outcome::Applied)
                }
            }
            (state @ (VoiceState::Listening | VoiceState::Speaking(_)), VoiceEvent::Abort { epoch }) => {
                if epoch != self.epoch {
                    (state, Outcome::Ignored(IgnoreReason::StaleEpoch))
                } else {
                    self.advance();
                    (VoiceState::Idle, Outcome::Applied)
                }
            }
            (_, VoiceEvent::Close) => {
                self.advance();
                (VoiceState::Idle, Outcome::Applied)
            }
            (
                state,
                VoiceEvent::RecognitionComplete { epoch, .. }
                | VoiceEvent::SpeechComplete { epoch }
                | VoiceEvent::Abort { epoch },
            ) if epoch != self.epoch => (state, Outcome::Ignored(IgnoreReason::StaleEpoch)),
            (state, _) => (state, Outcome::Ignored(IgnoreReason::NotApplicable)),
        };
        if matches!(next, VoiceState::Idle) {
            self.started_at = None;
        }
        self.state = next;
        outcome
    }

    fn advance(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }
}
