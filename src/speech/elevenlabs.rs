//! ElevenLabs streaming text-to-speech.
//!
//! Requests raw PCM (`pcm_<rate>`), collects the streamed body, normalizes
//! its peak level and hands it to an [`AudioPlayer`].

use crate::config::SpeechConfig;
use crate::defaults;
use crate::error::{Result, VoxlateError};
use crate::speech::SpeechSynthesizer;
use crate::speech::pcm;
use crate::speech::player::AudioPlayer;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Voice settings sent with every synthesis request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
    pub speed: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.55,
            similarity_boost: 0.9,
            style: 0.2,
            use_speaker_boost: true,
            speed: 0.8,
        }
    }
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

/// Text-to-speech through the ElevenLabs streaming endpoint.
pub struct ElevenLabsSynthesizer {
    api_url: String,
    api_key: String,
    voice_id: String,
    model_id: String,
    sample_rate: u32,
    voice_settings: VoiceSettings,
    normalize_target: i16,
    max_gain: f32,
    player: Box<dyn AudioPlayer>,
    client: reqwest::blocking::Client,
}

impl ElevenLabsSynthesizer {
    /// Build from the `[speech]` config section.
    ///
    /// # Errors
    /// Returns `ConfigInvalidValue` when no API key is configured.
    pub fn from_config(config: &SpeechConfig, player: Box<dyn AudioPlayer>) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| VoxlateError::ConfigInvalidValue {
                key: "speech.api_key".to_string(),
                message: "an ElevenLabs API key is required (set EL_KEY)".to_string(),
            })?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| VoxlateError::Synthesis {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
            voice_id: config.voice_id.clone(),
            model_id: config.model_id.clone(),
            sample_rate: config.sample_rate,
            voice_settings: config.voice,
            normalize_target: config.normalize_target,
            max_gain: config.max_gain,
            player,
            client,
        })
    }

    /// Streaming endpoint URL for the configured voice and PCM format.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}/stream?output_format=pcm_{}",
            self.api_url, self.voice_id, self.sample_rate
        )
    }

    /// Fetch raw PCM bytes for `text`.
    fn fetch_pcm(&self, text: &str) -> Result<Vec<u8>> {
        let request = SynthesisRequest {
            text,
            model_id: &self.model_id,
            voice_settings: self.voice_settings,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("xi-api-key", &self.api_key)
            .json(&request)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| VoxlateError::Synthesis {
                message: e.to_string(),
            })?;

        let bytes = response.bytes().map_err(|e| VoxlateError::Synthesis {
            message: format!("audio stream interrupted: {e}"),
        })?;
        Ok(bytes.to_vec())
    }

    /// Normalize raw PCM and play it. Payloads too short to hold audio are skipped.
    fn play_pcm(&self, bytes: &[u8]) -> Result<()> {
        if bytes.len() < defaults::MIN_AUDIO_BYTES {
            tracing::debug!(bytes = bytes.len(), "synthesized audio too short, skipping");
            return Ok(());
        }

        let samples = pcm::normalize(
            &pcm::samples_from_le_bytes(bytes),
            self.normalize_target,
            self.max_gain,
        );
        self.player.play(&samples, self.sample_rate)
    }
}

impl SpeechSynthesizer for ElevenLabsSynthesizer {
    fn synthesize_and_play(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let bytes = self.fetch_pcm(text)?;
        self.play_pcm(&bytes)
    }

    fn name(&self) -> &str {
        &self.model_id
    }
}
