//! Interactive review on the controlling terminal.

use crate::error::{Result, VoxlateError};
use crate::review::{ReviewRequest, Reviewer};
use owo_colors::OwoColorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

const RULE_WIDTH: usize = 60;

/// Shows each utterance with its translation and lets the user edit the
/// reviewed text on a pre-filled line. Ctrl+C / Ctrl+D keep the unedited text.
///
/// The line editor is opened per review on the processor thread, so only one
/// prompt can ever be on screen.
pub struct TerminalReviewer {
    source_language: String,
}

impl TerminalReviewer {
    pub fn new(source_language: &str) -> Self {
        Self {
            source_language: source_language.to_string(),
        }
    }
}

impl Reviewer for TerminalReviewer {
    fn review(&self, request: &ReviewRequest<'_>) -> Result<Option<String>> {
        eprintln!("\n{}", "=".repeat(RULE_WIDTH));
        eprintln!(
            "{} {}",
            format!("[Voice {}]:", self.source_language).dimmed(),
            request.original
        );
        if !request.machine_translation.is_empty() {
            eprintln!("{} {}", "[Preview]:".dimmed(), request.machine_translation);
        }
        eprintln!("{}", "-".repeat(RULE_WIDTH));

        let mut editor = DefaultEditor::new().map_err(|e| VoxlateError::Review {
            message: format!("failed to open terminal editor: {e}"),
        })?;
        match editor.readline_with_initial("Edit: ", (request.editable(), "")) {
            Ok(line) => Ok(Some(line.trim().to_string())),
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
            Err(e) => Err(VoxlateError::Review {
                message: e.to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "terminal"
    }
}
