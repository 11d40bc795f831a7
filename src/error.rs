//! Error types for voxlate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxlateError {
    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Translation engine errors
    #[error("Translation failed: {message}")]
    Translation { message: String },

    // Speech synthesis and playback errors
    #[error("Speech synthesis failed: {message}")]
    Synthesis { message: String },

    #[error("Audio output device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio output failed: {message}")]
    AudioOutput { message: String },

    // Review step errors
    #[error("Review failed: {message}")]
    Review { message: String },

    // Transcript feed errors
    #[error("Transcript feed error: {message}")]
    Feed { message: String },

    // Shutdown errors (reported, never fatal)
    #[error("Shutdown timed out waiting for {stage} after {waited_ms}ms")]
    ShutdownTimeout { stage: String, waited_ms: u64 },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl VoxlateError {
    /// Whether the error is a transient engine failure.
    ///
    /// Transient failures skip the remaining stage of the current utterance
    /// and are never retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            VoxlateError::Translation { .. }
                | VoxlateError::Synthesis { .. }
                | VoxlateError::AudioOutput { .. }
                | VoxlateError::AudioDeviceNotFound { .. }
        )
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoxlateError>;
