use crate::defaults;
use crate::error::{Result, VoxlateError};
use crate::pipeline::PipelineConfig;
use crate::review::ReviewTarget;
use crate::speech::VoiceSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineSection,
    pub translation: TranslationConfig,
    pub speech: SpeechConfig,
    pub review: ReviewConfig,
}

/// Segmentation, flush and shutdown timing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSection {
    pub flush_grace_ms: u64,
    pub min_utterance_chars: usize,
    pub poll_interval_ms: u64,
    pub drain_timeout_ms: u64,
    pub worker_join_timeout_ms: u64,
}

/// Translation engine (Ollama generate endpoint)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranslationConfig {
    pub source_language: String,
    pub target_language: String,
    pub url: String,
    pub model: String,
    pub connect_timeout_ms: u64,
    pub timeout_ms: u64,
}

/// Speech synthesis engine (ElevenLabs) and playback
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub api_url: String,
    pub voice_id: String,
    pub model_id: String,
    pub sample_rate: u32,
    pub timeout_ms: u64,
    pub voice: VoiceSettings,
    pub output_device: String,
    pub normalize_target: i16,
    pub max_gain: f32,
}

/// Interactive review step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReviewConfig {
    pub enabled: bool,
    pub target: ReviewTarget,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            flush_grace_ms: defaults::FLUSH_GRACE_MS,
            min_utterance_chars: defaults::MIN_UTTERANCE_CHARS,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            drain_timeout_ms: defaults::DRAIN_TIMEOUT_MS,
            worker_join_timeout_ms: defaults::WORKER_JOIN_TIMEOUT_MS,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            source_language: defaults::SOURCE_LANGUAGE.to_string(),
            target_language: defaults::TARGET_LANGUAGE.to_string(),
            url: defaults::TRANSLATION_URL.to_string(),
            model: defaults::TRANSLATION_MODEL.to_string(),
            connect_timeout_ms: defaults::TRANSLATION_CONNECT_TIMEOUT_MS,
            timeout_ms: defaults::TRANSLATION_TIMEOUT_MS,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            api_url: defaults::SPEECH_API_URL.to_string(),
            voice_id: defaults::SPEECH_VOICE_ID.to_string(),
            model_id: defaults::SPEECH_MODEL_ID.to_string(),
            sample_rate: defaults::PCM_SAMPLE_RATE,
            timeout_ms: defaults::SPEECH_TIMEOUT_MS,
            voice: VoiceSettings::default(),
            output_device: defaults::OUTPUT_DEVICE.to_string(),
            normalize_target: defaults::NORMALIZE_TARGET,
            max_gain: defaults::MAX_GAIN,
        }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target: ReviewTarget::default(),
        }
    }
}

/// Reads a non-empty environment variable.
fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Reads a numeric environment variable; unparseable values are ignored.
fn env_millis(key: &str) -> Option<u64> {
    let raw = env_value(key)?;
    match raw.parse() {
        Ok(ms) => Some(ms),
        Err(_) => {
            tracing::warn!("ignoring {key}={raw}: expected milliseconds");
            None
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only a missing file falls back to defaults; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                tracing::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOXLATE_SOURCE_LANGUAGE / VOXLATE_TARGET_LANGUAGE → translation languages
    /// - VOXLATE_FLUSH_GRACE_MS → pipeline.flush_grace_ms
    /// - OLLAMA_URL / OLLAMA_MODEL → translation engine
    /// - EL_KEY / EL_VOICE_ID / EL_TTS_MODEL → speech engine
    /// - VIRTUAL_SINK_NAME, VOXLATE_OUTPUT_DEVICE → speech.output_device
    ///
    /// Empty values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(lang) = env_value("VOXLATE_SOURCE_LANGUAGE") {
            self.translation.source_language = lang;
        }
        if let Some(lang) = env_value("VOXLATE_TARGET_LANGUAGE") {
            self.translation.target_language = lang;
        }
        if let Some(ms) = env_millis("VOXLATE_FLUSH_GRACE_MS") {
            self.pipeline.flush_grace_ms = ms;
        }

        if let Some(url) = env_value("OLLAMA_URL") {
            self.translation.url = url;
        }
        if let Some(model) = env_value("OLLAMA_MODEL") {
            self.translation.model = model;
        }

        if let Some(key) = env_value("EL_KEY") {
            self.speech.api_key = Some(key);
        }
        if let Some(voice) = env_value("EL_VOICE_ID") {
            self.speech.voice_id = voice;
        }
        if let Some(model) = env_value("EL_TTS_MODEL") {
            self.speech.model_id = model;
        }

        // VOXLATE_OUTPUT_DEVICE wins over the shared sink name
        if let Some(sink) = env_value("VIRTUAL_SINK_NAME") {
            self.speech.output_device = sink;
        }
        if let Some(device) = env_value("VOXLATE_OUTPUT_DEVICE") {
            self.speech.output_device = device;
        }

        self
    }

    /// Reject values that would stall or disable the pipeline.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("pipeline.flush_grace_ms", self.pipeline.flush_grace_ms),
            ("pipeline.poll_interval_ms", self.pipeline.poll_interval_ms),
            ("pipeline.drain_timeout_ms", self.pipeline.drain_timeout_ms),
            (
                "pipeline.worker_join_timeout_ms",
                self.pipeline.worker_join_timeout_ms,
            ),
            (
                "translation.connect_timeout_ms",
                self.translation.connect_timeout_ms,
            ),
            ("translation.timeout_ms", self.translation.timeout_ms),
            ("speech.timeout_ms", self.speech.timeout_ms),
        ];
        if let Some((key, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(VoxlateError::ConfigInvalidValue {
                key: (*key).to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if self.pipeline.min_utterance_chars == 0 {
            return Err(VoxlateError::ConfigInvalidValue {
                key: "pipeline.min_utterance_chars".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.speech.sample_rate == 0 {
            return Err(VoxlateError::ConfigInvalidValue {
                key: "speech.sample_rate".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.speech.normalize_target <= 0 {
            return Err(VoxlateError::ConfigInvalidValue {
                key: "speech.normalize_target".to_string(),
                message: "must be a positive sample level".to_string(),
            });
        }
        if !(self.speech.max_gain.is_finite() && self.speech.max_gain >= 1.0) {
            return Err(VoxlateError::ConfigInvalidValue {
                key: "speech.max_gain".to_string(),
                message: "must be at least 1.0".to_string(),
            });
        }
        for (key, value) in [
            ("translation.source_language", &self.translation.source_language),
            ("translation.target_language", &self.translation.target_language),
        ] {
            if value.trim().is_empty() {
                return Err(VoxlateError::ConfigInvalidValue {
                    key: key.to_string(),
                    message: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Pipeline timing and language settings.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            grace_period: Duration::from_millis(self.pipeline.flush_grace_ms),
            min_chars: self.pipeline.min_utterance_chars,
            poll_interval: Duration::from_millis(self.pipeline.poll_interval_ms),
            drain_timeout: Duration::from_millis(self.pipeline.drain_timeout_ms),
            worker_join_timeout: Duration::from_millis(self.pipeline.worker_join_timeout_ms),
            source_language: self.translation.source_language.clone(),
            target_language: self.translation.target_language.clone(),
            review_target: self.review.target,
        }
    }

    /// Serialize to TOML, omitting the API key.
    pub fn to_toml(&self) -> Result<String> {
        let mut redacted = self.clone();
        redacted.speech.api_key = None;
        toml::to_string_pretty(&redacted).map_err(|e| VoxlateError::ConfigParse {
            message: e.to_string(),
        })
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/voxlate/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> Result<std::path::PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("voxlate").join("config.toml"))
            .ok_or_else(|| VoxlateError::Other("could not determine config directory".to_string()))
    }
}
