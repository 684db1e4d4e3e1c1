//! Async operations behind the overlay: recognition, reply, playback.
//!
//! The simulated backends stand in for a browser speech API by sleeping on
//! tokio timers; swap in a real backend by implementing the same trait.

use crate::error::VoiceResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tadka_core::{AssistantClient, Locale};
use tracing::debug;

/// Timing for the simulated backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// How long simulated recognition "listens" (default: 3000ms)
    pub recognition_delay_ms: u64,
    /// How long simulated playback lasts (default: 2000ms)
    pub speech_delay_ms: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            recognition_delay_ms: 3000,
            speech_delay_ms: 2000,
        }
    }
}

impl VoiceConfig {
    pub fn recognition_delay(&self) -> Duration {
        Duration::from_millis(self.recognition_delay_ms)
    }

    pub fn speech_delay(&self) -> Duration {
        Duration::from_millis(self.speech_delay_ms)
    }
}

/// Speech to text. Returns the recognized utterance; empty means nothing heard.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self, locale: Locale) -> VoiceResult<String>;
}

/// Turns a transcript into the text to speak back.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, transcript: &str, locale: Locale) -> VoiceResult<String>;
}

/// Text to speech. Resolves when playback has finished.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn speak(&self, text: &str, locale: Locale) -> VoiceResult<()>;
}

/// Fixed utterance per locale after a delay.
#[derive(Debug, Clone)]
pub struct SimulatedRecognizer {
    delay: Duration,
    english: String,
    hindi: String,
}

impl SimulatedRecognizer {
    pub fn new(config: &VoiceConfig) -> Self {
        Self {
            delay: config.recognition_delay(),
            english: "I want to cook butter chicken".to_string(),
            hindi: "मैं बटर चिकन बनाना चाहता हूं".to_string(),
        }
    }

    pub fn with_utterance(mut self, locale: Locale, text: impl Into<String>) -> Self {
        match locale {
            Locale::En => self.english = text.into(),
            Locale::Hi => self.hindi = text.into(),
        }
        self
    }
}

impl Default for SimulatedRecognizer {
    fn default() -> Self {
        Self::new(&VoiceConfig::default())
    }
}

#[async_trait]
impl SpeechRecognizer for SimulatedRecognizer {
    async fn recognize(&self, locale: Locale) -> VoiceResult<String> {
        tokio::time::sleep(self.delay).await;
        let text = match locale {
            Locale::En => &self.english,
            Locale::Hi => &self.hindi,
        };
        Ok(text.clone())
    }
}

/// Sleeps for the configured playback time.
#[derive(Debug, Clone)]
pub struct SimulatedSynthesizer {
    delay: Duration,
}

impl SimulatedSynthesizer {
    pub fn new(config: &VoiceConfig) -> Self {
        Self {
            delay: config.speech_delay(),
        }
    }
}

impl Default for SimulatedSynthesizer {
    fn default() -> Self {
        Self::new(&VoiceConfig::default())
    }
}

#[async_trait]
impl SpeechSynthesizer for SimulatedSynthesizer {
    async fn speak(&self, text: &str, locale: Locale) -> VoiceResult<()> {
        debug!(%locale, chars = text.chars().count(), "Simulated playback");
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Speaks the transcript back unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoResponder;

#[async_trait]
impl Responder for EchoResponder {
    async fn respond(&self, transcript: &str, _locale: Locale) -> VoiceResult<String> {
        Ok(transcript.to_string())
    }
}

/// Asks the cooking assistant endpoint for a reply.
#[derive(Clone)]
pub struct AssistantResponder {
    client: AssistantClient,
}

impl AssistantResponder {
    pub fn new(client: AssistantClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Responder for AssistantResponder {
    async fn respond(&self, transcript: &str, _locale: Locale) -> VoiceResult<String> {
        Ok(self.client.ask(transcript).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn simulated_recognition_waits_then_answers_in_locale() {
        let recognizer = SimulatedRecognizer::default();
        let start = tokio::time::Instant::now();
        let text = recognizer.recognize(Locale::Hi).await.unwrap();
        assert_eq!(text, "मैं बटर चिकन बनाना चाहता हूं");
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_playback_takes_configured_time() {
        let synth = SimulatedSynthesizer::new(&VoiceConfig {
            recognition_delay_ms: 10,
            speech_delay_ms: 500,
        });
        let start = tokio::time::Instant::now();
        synth.speak("hello", Locale::En).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[test]
    fn echo_returns_transcript() {
        let reply = tokio_test::block_on(EchoResponder.respond("next step", Locale::En)).unwrap();
        assert_eq!(reply, "next step");
    }
}
