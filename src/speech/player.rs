//! Audio output for synthesized speech.

use crate::error::Result;
use std::sync::Mutex;

/// Pluggable audio output. `play` blocks until playback has finished.
pub trait AudioPlayer: Send + Sync {
    /// Play mono 16-bit PCM at `sample_rate`.
    fn play(&self, samples: &[i16], sample_rate: u32) -> Result<()>;

    /// Name for logging.
    fn name(&self) -> &str {
        "player"
    }
}

impl<T: AudioPlayer + ?Sized> AudioPlayer for std::sync::Arc<T> {
    fn play(&self, samples: &[i16], sample_rate: u32) -> Result<()> {
        (**self).play(samples, sample_rate)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Player that discards audio; used when no output backend is compiled in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPlayer;

impl AudioPlayer for NullPlayer {
    fn play(&self, samples: &[i16], sample_rate: u32) -> Result<()> {
        tracing::debug!(
            samples = samples.len(),
            sample_rate,
            "no audio backend, discarding synthesized audio"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

/// Player that keeps every buffer it is asked to play (for testing).
#[derive(Debug, Default)]
pub struct RecordingPlayer {
    played: Mutex<Vec<Vec<i16>>>,
}

impl RecordingPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers played so far.
    pub fn played(&self) -> Vec<Vec<i16>> {
        self.played
            .lock()
            .map(|played| played.clone())
            .unwrap_or_default()
    }
}

impl AudioPlayer for RecordingPlayer {
    fn play(&self, samples: &[i16], _sample_rate: u32) -> Result<()> {
        if let Ok(mut played) = self.played.lock() {
            played.push(samples.to_vec());
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Default player for this build: cpal when compiled in, otherwise [`NullPlayer`].
#[cfg(feature = "playback")]
pub fn default_player(device: &str) -> Box<dyn AudioPlayer> {
    Box::new(crate::speech::cpal_player::CpalPlayer::new(device))
}

/// Default player for this build: cpal when compiled in, otherwise [`NullPlayer`].
#[cfg(not(feature = "playback"))]
pub fn default_player(_device: &str) -> Box<dyn AudioPlayer> {
    Box::new(NullPlayer)
}
