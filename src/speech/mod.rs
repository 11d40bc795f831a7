//! Speech synthesis and playback boundary.

pub mod elevenlabs;
pub mod pcm;
pub mod player;

#[cfg(feature = "playback")]
pub mod cpal_player;

pub use elevenlabs::{ElevenLabsSynthesizer, VoiceSettings};
pub use player::{AudioPlayer, NullPlayer, RecordingPlayer};

use crate::error::{Result, VoxlateError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Trait for text-to-speech engines.
///
/// `synthesize_and_play` blocks until the audio has been played (or the
/// engine gave up). Failures are reported by the caller and never retried.
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` and play it to the configured output.
    fn synthesize_and_play(&self, text: &str) -> Result<()>;

    /// Name for logging.
    fn name(&self) -> &str;
}

impl<T: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Arc<T> {
    fn synthesize_and_play(&self, text: &str) -> Result<()> {
        (**self).synthesize_and_play(text)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Synthesizer that speaks nothing; used when speech output is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSynthesizer;

impl SpeechSynthesizer for SilentSynthesizer {
    fn synthesize_and_play(&self, text: &str) -> Result<()> {
        tracing::debug!(text, "speech disabled, skipping synthesis");
        Ok(())
    }

    fn name(&self) -> &str {
        "silent"
    }
}

/// Mock synthesizer for testing.
///
/// Records every spoken text in order, optionally sleeps to simulate
/// playback and fails for configured inputs.
#[derive(Debug, Default)]
pub struct MockSynthesizer {
    spoken: Mutex<Vec<String>>,
    delay: Duration,
    fail_on: Vec<String>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block for `delay` on every call, like a real playback would.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail whenever the text equals `text`.
    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on.push(text.to_string());
        self
    }

    /// Texts received so far, in call order.
    pub fn spoken(&self) -> Vec<String> {
        self.spoken
            .lock()
            .map(|spoken| spoken.clone())
            .unwrap_or_default()
    }
}

impl SpeechSynthesizer for MockSynthesizer {
    fn synthesize_and_play(&self, text: &str) -> Result<()> {
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.push(text.to_string());
        }
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.fail_on.iter().any(|f| f == text) {
            return Err(VoxlateError::Synthesis {
                message: "mock synthesis failure".to_string(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
