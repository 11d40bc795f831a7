//! Incremental sentence segmentation of the transcript stream.
//!
//! Final transcript fragments are accumulated in a carry buffer. After every
//! append the buffer is re-split at sentence boundaries (one of `. ! ?`
//! followed by whitespace); complete sentences go to the work queue and the
//! unterminated tail stays in the buffer until more text or a forced flush
//! arrives.

use crate::defaults;
use crate::pipeline::queue::WorkQueue;
use crate::pipeline::types::Utterance;
use std::sync::{Mutex, MutexGuard};

const TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Splits `text` into complete sentences and an unterminated remainder.
///
/// A boundary sits after a terminator that is followed by whitespace; the
/// whitespace run itself belongs to neither side. The final segment counts as
/// complete when it ends in a terminator (trailing whitespace allowed), in
/// which case the remainder is empty.
pub fn split_sentences(text: &str) -> (Vec<&str>, &str) {
    let mut complete = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if ch.is_whitespace() && prev.is_some_and(|p| TERMINATORS.contains(&p)) {
            complete.push(&text[start..idx]);
            start = text.len();
            while let Some(&(next_idx, next)) = chars.peek() {
                if !next.is_whitespace() {
                    start = next_idx;
                    break;
                }
                chars.next();
            }
        }
        prev = Some(ch);
    }

    let rest = &text[start..];
    if rest.trim_end().ends_with(TERMINATORS) {
        complete.push(rest);
        return (complete, "");
    }
    (complete, rest)
}

/// Returns true if a trimmed segment is worth speaking.
///
/// Single tokens shorter than `min_chars` are recognizer noise; anything
/// containing a space is kept regardless of length.
pub fn passes_noise_filter(text: &str, min_chars: usize) -> bool {
    !text.is_empty() && (text.chars().count() >= min_chars || text.contains(' '))
}

/// Carry buffer plus the next sequence number, guarded together.
#[derive(Debug, Default)]
struct CarryState {
    buffer: String,
    next_sequence: u64,
}

/// Accumulates transcript fragments and emits complete utterances.
///
/// All buffer reads and writes are serialized by one lock. Emission happens
/// under the same lock, so concurrent `append`/`force_flush` calls can never
/// reorder utterances in the queue.
pub struct Segmenter {
    state: Mutex<CarryState>,
    queue: WorkQueue<Utterance>,
    min_chars: usize,
}

impl Segmenter {
    /// Creates a segmenter that emits into `queue`.
    pub fn new(queue: WorkQueue<Utterance>) -> Self {
        Self {
            state: Mutex::new(CarryState::default()),
            queue,
            min_chars: defaults::MIN_UTTERANCE_CHARS,
        }
    }

    /// Sets the minimum length of a single-token utterance.
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// Appends a final transcript fragment and emits every sentence it completes.
    ///
    /// Returns the number of utterances enqueued.
    pub fn append(&self, fragment: &str) -> usize {
        let mut state = self.lock();

        let fragment = fragment.trim();
        let joined = if state.buffer.is_empty() {
            fragment.to_string()
        } else {
            format!("{} {}", state.buffer, fragment).trim().to_string()
        };
        if joined.is_empty() {
            state.buffer.clear();
            return 0;
        }

        let (complete, rest) = split_sentences(&joined);
        let mut emitted = 0;
        for sentence in complete {
            if self.emit(&mut state, sentence, false) {
                emitted += 1;
            }
        }
        state.buffer = rest.trim().to_string();
        emitted
    }

    /// Emits whatever remains in the carry buffer, terminated or not.
    ///
    /// The buffer is cleared unconditionally. Idempotent when already empty.
    /// Returns true if an utterance was enqueued.
    pub fn force_flush(&self) -> bool {
        let mut state = self.lock();
        let leftover = std::mem::take(&mut state.buffer);
        self.emit(&mut state, &leftover, true)
    }

    /// Current carry buffer content.
    pub fn carry(&self) -> String {
        self.lock().buffer.clone()
    }

    /// Number of utterances emitted so far.
    pub fn emitted(&self) -> u64 {
        self.lock().next_sequence
    }

    fn emit(&self, state: &mut CarryState, segment: &str, forced: bool) -> bool {
        let text = segment.trim();
        if !passes_noise_filter(text, self.min_chars) {
            if !text.is_empty() {
                tracing::debug!(segment = text, "dropping short segment");
            }
            return false;
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        tracing::debug!(sequence, forced, text, "utterance ready");
        self.queue
            .enqueue(Utterance::new(text.to_string(), sequence, forced));
        true
    }

    fn lock(&self) -> MutexGuard<'_, CarryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
