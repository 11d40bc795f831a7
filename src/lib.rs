//! voxlate - live speech relay
//!
//! Turns a live transcript stream into ordered, translated, spoken
//! utterances: segment → queue → translate → speak, one at a time.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod feed;
pub mod pipeline;
pub mod review;
pub mod speech;
pub mod translate;

// Composition root - needs the terminal reviewer and engine clients
#[cfg(feature = "cli")]
pub mod app;

// Collaborator traits (translate → review → speak)
pub use review::{ReviewTarget, Reviewer};
pub use speech::{AudioPlayer, SpeechSynthesizer};
pub use translate::Translator;

// Pipeline
pub use pipeline::{
    ErrorReporter, Pipeline, PipelineConfig, PipelineHandle, ShutdownReport, TranscriptEvent,
    Utterance,
};

// Error handling
pub use error::{Result, VoxlateError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
