//! Data types for the utterance pipeline.

use std::fmt;
use std::time::Instant;

/// One complete unit of source-language speech, ready for translation.
///
/// Immutable once it enters the work queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    /// Trimmed source text.
    pub text: String,
    /// Monotonically increasing sequence number (enqueue order).
    pub sequence: u64,
    /// Whether the utterance was emitted by a silence flush rather than punctuation.
    pub forced: bool,
    /// Timestamp when the sentence boundary (or flush) was detected.
    pub created: Instant,
}

impl Utterance {
    /// Creates a new utterance.
    pub fn new(text: String, sequence: u64, forced: bool) -> Self {
        Self {
            text,
            sequence,
            forced,
            created: Instant::now(),
        }
    }
}

/// A transcript event as seen at the recognizer boundary.
///
/// The recognizer's native event shape is reduced to these three fields once,
/// before anything reaches the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptEvent {
    /// Transcribed text of the segment.
    pub text: String,
    /// The segment text will not be revised any more.
    pub is_final: bool,
    /// The recognizer detected the end of vocal activity.
    pub speech_final: bool,
}

impl TranscriptEvent {
    /// A finalized segment that does not end the speech turn.
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            speech_final: false,
        }
    }

    /// A finalized segment that also closes the speech turn.
    pub fn end_of_speech(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            speech_final: true,
        }
    }
}

/// Processing stage of a dequeued utterance.
///
/// Queued utterances have no stage; they are items in the work queue. Without
/// review the order is `Translating → Speaking → Done`. With review the
/// preview translation comes first: `Translating → InReview → Speaking`, plus
/// a second `Translating` after `InReview` when an edited source has to be
/// translated again. Any stage short-circuits to `Done` on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Translating,
    InReview,
    Speaking,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::InReview => "review",
            Stage::Translating => "translate",
            Stage::Speaking => "speak",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Progress notifications emitted by the sequential processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorEvent {
    /// Utterance `sequence` entered `stage`.
    StageEntered { sequence: u64, stage: Stage },
    /// Utterance `sequence` reached `Done`; `spoken` is the text handed to
    /// synthesis, or `None` when the utterance degraded to silence.
    Finished {
        sequence: u64,
        spoken: Option<String>,
    },
}
