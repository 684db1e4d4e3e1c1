//! Voice overlay driver.
//!
//! Owns one [`VoiceSession`] and runs recognition/playback as spawned tasks
//! stamped with the epoch they were started under. User actions transition
//! the session synchronously; task completions go back through the same
//! session and are dropped when their epoch is stale.

use crate::operation::{
    EchoResponder, Responder, SimulatedRecognizer, SimulatedSynthesizer, SpeechRecognizer,
    SpeechSynthesizer, VoiceConfig,
};
use crate::state::{Epoch, IgnoreReason, Outcome, VoiceEvent, VoiceSession, VoiceState};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tadka_core::{Locale, Translator};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Notifications for whoever renders the overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent {
    StateChanged { state: VoiceState, epoch: Epoch },
    /// The reply text chosen for playback.
    Replying { epoch: Epoch, text: String },
    OperationFailed { epoch: Epoch, message: String },
    /// A completion arrived after its epoch was invalidated.
    StaleCompletion { epoch: Epoch },
}

/// Which controls the overlay shows for the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub start: bool,
    pub stop: bool,
    pub respond: bool,
}

impl Controls {
    pub fn for_state(state: &VoiceState) -> Self {
        let busy = state.is_listening() || state.is_speaking();
        Self {
            start: !busy,
            stop: state.is_listening(),
            respond: state.transcript().is_some() && !state.is_speaking(),
        }
    }
}

/// Quick-action labels for `locale`.
pub fn quick_actions(t: &Translator) -> Vec<String> {
    ["quickStartCooking", "quickNextStep", "quickRepeatInstruction"]
        .into_iter()
        .map(|key| t.t(key).to_string())
        .collect()
}

#[derive(Clone)]
struct Shared {
    session: Arc<Mutex<VoiceSession>>,
    event_tx: mpsc::UnboundedSender<OverlayEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, VoiceSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `event` and report it. The notification is sent while the
    /// session lock is held, so the receiver sees transitions in the order
    /// they were applied. Returns the outcome and the epoch after applying.
    fn dispatch(&self, event: VoiceEvent) -> (Outcome, Epoch) {
        let mut session = self.lock();
        self.apply_locked(&mut session, event)
    }

    fn apply_locked(&self, session: &mut VoiceSession, event: VoiceEvent) -> (Outcome, Epoch) {
        let completion_epoch = match &event {
            VoiceEvent::RecognitionComplete { epoch, .. }
            | VoiceEvent::SpeechComplete { epoch }
            | VoiceEvent::Abort { epoch } => Some(*epoch),
            _ => None,
        };
        let outcome = session.apply(event);
        let epoch = session.epoch();
        match outcome {
            Outcome::Applied => self.emit(OverlayEvent::StateChanged {
                state: session.state().clone(),
                epoch,
            }),
            Outcome::Ignored(IgnoreReason::StaleEpoch) => {
                if let Some(stale) = completion_epoch {
                    debug!(stale, current = epoch, "Dropping stale voice completion");
                    self.emit(OverlayEvent::StaleCompletion { epoch: stale });
                }
            }
            Outcome::Ignored(IgnoreReason::NotApplicable) => {}
        }
        (outcome, epoch)
    }

    /// Abort `epoch` and report the failure under the same lock.
    fn fail(&self, epoch: Epoch, message: String) {
        let mut session = self.lock();
        let (outcome, _) = self.apply_locked(&mut session, VoiceEvent::Abort { epoch });
        if outcome.is_applied() {
            warn!(epoch, "Voice operation failed: {}", message);
            self.emit(OverlayEvent::OperationFailed { epoch, message });
        }
    }

    /// Send `event` only if `epoch` is still current, checked and sent under
    /// one lock. Otherwise reports the completion as stale.
    fn emit_if_current(&self, epoch: Epoch, event: OverlayEvent) -> bool {
        let session = self.lock();
        if session.epoch() == epoch {
            self.emit(event);
            true
        } else {
            debug!(stale = epoch, current = session.epoch(), "Dropping stale voice reply");
            self.emit(OverlayEvent::StaleCompletion { epoch });
            false
        }
    }

    fn emit(&self, event: OverlayEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("Overlay event receiver dropped");
        }
    }
}

/// Voice assistant overlay: activation, controls and the async operations.
pub struct VoiceOverlay {
    shared: Shared,
    recognizer: Arc<dyn SpeechRecognizer>,
    responder: Arc<dyn Responder>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    locale: Locale,
    active: bool,
    task: Option<JoinHandle<()>>,
}

impl VoiceOverlay {
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        responder: Arc<dyn Responder>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        locale: Locale,
    ) -> (Self, mpsc::UnboundedReceiver<OverlayEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let overlay = Self {
            shared: Shared {
                session: Arc::new(Mutex::new(VoiceSession::new())),
                event_tx,
            },
            recognizer,
            responder,
            synthesizer,
            locale,
            active: false,
            task: None,
        };
        (overlay, event_rx)
    }

    /// Timer-driven backends that echo the transcript.
    pub fn simulated(
        config: &VoiceConfig,
        locale: Locale,
    ) -> (Self, mpsc::UnboundedReceiver<OverlayEvent>) {
        Self::new(
            Arc::new(SimulatedRecognizer::new(config)),
            Arc::new(EchoResponder),
            Arc::new(SimulatedSynthesizer::new(config)),
            locale,
        )
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Show or hide the overlay. Hiding closes the session.
    pub fn toggle_active(&mut self) -> bool {
        if self.active {
            self.close();
        } else {
            self.active = true;
            info!("Voice assistant enabled");
        }
        self.active
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Applies to operations started after the change.
    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    pub fn state(&self) -> VoiceState {
        self.shared.lock().state().clone()
    }

    pub fn epoch(&self) -> Epoch {
        self.shared.lock().epoch()
    }

    pub fn transcript(&self) -> Option<String> {
        self.shared.lock().transcript().map(str::to_string)
    }

    pub fn controls(&self) -> Controls {
        Controls::for_state(self.shared.lock().state())
    }

    /// Locale key of the status line, if one is shown.
    pub fn status_key(&self) -> Option<&'static str> {
        match self.shared.lock().state() {
            VoiceState::Listening => Some("listening"),
            VoiceState::Speaking(_) => Some("speaking"),
            _ => None,
        }
    }

    /// Begin recognition. Spawns onto the current tokio runtime.
    pub fn start_listening(&mut self) -> Outcome {
        let (outcome, epoch) = self.shared.dispatch(VoiceEvent::StartListening);
        if !outcome.is_applied() {
            return outcome;
        }
        let shared = self.shared.clone();
        let recognizer = Arc::clone(&self.recognizer);
        let locale = self.locale;
        self.replace_task(tokio::spawn(async move {
            match recognizer.recognize(locale).await {
                Ok(text) => {
                    shared.dispatch(VoiceEvent::RecognitionComplete { epoch, text });
                }
                Err(e) => shared.fail(epoch, e.to_string()),
            }
        }));
        outcome
    }

    pub fn stop_listening(&mut self) -> Outcome {
        let (outcome, _) = self.shared.dispatch(VoiceEvent::StopListening);
        if outcome.is_applied() {
            self.abort_task();
        }
        outcome
    }

    /// Speak a reply to the ready transcript.
    pub fn respond(&mut self) -> Outcome {
        let (outcome, epoch, transcript) = {
            let mut session = self.shared.lock();
            let (outcome, epoch) = self
                .shared
                .apply_locked(&mut session, VoiceEvent::StartSpeaking);
            let transcript = session.transcript().unwrap_or_default().to_string();
            (outcome, epoch, transcript)
        };
        if !outcome.is_applied() {
            return outcome;
        }
        let shared = self.shared.clone();
        let responder = Arc::clone(&self.responder);
        let synthesizer = Arc::clone(&self.synthesizer);
        let locale = self.locale;
        self.replace_task(tokio::spawn(async move {
            let reply = match responder.respond(&transcript, locale).await {
                Ok(reply) => reply,
                Err(e) => return shared.fail(epoch, e.to_string()),
            };
            let replying = OverlayEvent::Replying {
                epoch,
                text: reply.clone(),
            };
            if !shared.emit_if_current(epoch, replying) {
                return;
            }
            match synthesizer.speak(&reply, locale).await {
                Ok(()) => {
                    shared.dispatch(VoiceEvent::SpeechComplete { epoch });
                }
                Err(e) => shared.fail(epoch, e.to_string()),
            }
        }));
        outcome
    }

    /// Full reset: back to idle, transcript cleared, in-flight work
    /// invalidated, overlay hidden. Safe from any state.
    pub fn close(&mut self) -> Outcome {
        let (outcome, _) = self.shared.dispatch(VoiceEvent::Close);
        self.abort_task();
        if self.active {
            self.active = false;
            info!("Voice assistant disabled");
        }
        outcome
    }

    fn replace_task(&mut self, handle: JoinHandle<()>) {
        self.abort_task();
        self.task = Some(handle);
    }

    fn abort_task(&mut self) {
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
    }
}

impl Drop for VoiceOverlay {
    fn drop(&mut self) {
        self.abort_task();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controls_follow_state() {
        assert_eq!(
            Controls::for_state(&VoiceState::Idle),
            Controls {
                start: true,
                stop: false,
                respond: false
            }
        );
        assert_eq!(
            Controls::for_state(&VoiceState::Listening),
            Controls {
                start: false,
                stop: true,
                respond: false
            }
        );
        assert_eq!(
            Controls::for_state(&VoiceState::TranscriptReady("dal".to_string())),
            Controls {
                start: true,
                stop: false,
                respond: true
            }
        );
        assert_eq!(
            Controls::for_state(&VoiceState::Speaking("dal".to_string())),
            Controls::default()
        );
    }

    #[test]
    fn quick_actions_are_localized() {
        assert_eq!(
            quick_actions(&Translator::bundled(Locale::En)),
            vec!["Start cooking", "Next step", "Repeat instruction"]
        );
        assert_eq!(
            quick_actions(&Translator::bundled(Locale::Hi))[1],
            "अगला कदम"
        );
    }
}
