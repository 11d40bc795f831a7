//! Error reporting for pipeline stages.
//!
//! Errors raised while an utterance is processed never leave the worker; they
//! are handed to an [`ErrorReporter`] and the utterance degrades to silence.

use crate::error::VoxlateError;

/// Trait for reporting stage errors.
pub trait ErrorReporter: Send + Sync {
    /// Reports an error from a pipeline stage.
    fn report(&self, stage: &str, error: &VoxlateError);
}

/// Reporter that writes through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, stage: &str, error: &VoxlateError) {
        if error.is_transient() {
            tracing::warn!(stage, "{error}");
        } else {
            tracing::error!(stage, "{error}");
        }
    }
}
