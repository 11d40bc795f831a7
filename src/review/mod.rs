//! Optional review step between translation preview and speech.
//!
//! A reviewer sees the source utterance together with its machine
//! translation and may edit one of them, depending on [`ReviewTarget`].
//! Returning `None` means the review was cancelled and the unedited text
//! is used.

#[cfg(feature = "cli")]
pub mod terminal;

#[cfg(feature = "cli")]
pub use terminal::TerminalReviewer;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Which text the reviewer edits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ReviewTarget {
    /// Edit the source text; the edited source is then translated.
    #[default]
    Source,
    /// Edit the machine translation; the edited text is spoken as is.
    Translation,
}

/// What the reviewer is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewRequest<'a> {
    pub original: &'a str,
    pub machine_translation: &'a str,
    pub target: ReviewTarget,
}

impl<'a> ReviewRequest<'a> {
    /// The text offered for editing, also the fallback on cancellation.
    pub fn editable(&self) -> &'a str {
        match self.target {
            ReviewTarget::Source => self.original,
            ReviewTarget::Translation => self.machine_translation,
        }
    }
}

/// Trait for the synchronous review collaborator.
pub trait Reviewer: Send + Sync {
    /// Review one utterance. `Ok(None)` means cancelled / no input.
    fn review(&self, request: &ReviewRequest<'_>) -> Result<Option<String>>;

    /// Name for logging.
    fn name(&self) -> &str;
}

impl<T: Reviewer + ?Sized> Reviewer for Arc<T> {
    fn review(&self, request: &ReviewRequest<'_>) -> Result<Option<String>> {
        (**self).review(request)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Reviewer that replays scripted answers (for testing).
///
/// Each call pops the next answer; `None` answers simulate cancellation. When
/// the script runs out every further review is cancelled.
#[derive(Debug, Default)]
pub struct ScriptedReviewer {
    answers: Mutex<VecDeque<Option<String>>>,
    seen: Mutex<Vec<(String, String)>>,
}

impl ScriptedReviewer {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(|a| a.map(Into::into)).collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// `(original, machine_translation)` pairs shown so far.
    pub fn seen(&self) -> Vec<(String, String)> {
        self.seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }
}

impl Reviewer for ScriptedReviewer {
    fn review(&self, request: &ReviewRequest<'_>) -> Result<Option<String>> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((
                request.original.to_string(),
                request.machine_translation.to_string(),
            ));
        }
        Ok(self
            .answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .flatten())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
