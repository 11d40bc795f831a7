//! Transcript feed: the recognizer boundary.
//!
//! The recognizer (or a bridge in front of it) writes one event per line.
//! A line is either a JSON object carrying the transcript and its two flags,
//! or plain text, which counts as a finished sentence followed by a pause.

use crate::error::{Result, VoxlateError};
use crate::pipeline::TranscriptEvent;
use crossbeam_channel::Sender;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::thread::{self, JoinHandle};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireEvent {
    text: Option<String>,
    transcript: Option<String>,
    channel: Option<WireChannel>,
    is_final: bool,
    speech_final: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireChannel {
    alternatives: Vec<WireAlternative>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireAlternative {
    transcript: String,
}

impl WireEvent {
    fn into_event(self) -> TranscriptEvent {
        let text = self
            .text
            .or(self.transcript)
            .or_else(|| {
                self.channel
                    .and_then(|c| c.alternatives.into_iter().next())
                    .map(|a| a.transcript)
            })
            .unwrap_or_default();
        TranscriptEvent {
            text,
            is_final: self.is_final,
            speech_final: self.speech_final,
        }
    }
}

/// Parses one feed line.
///
/// Returns `None` for blank lines. JSON objects keep their flags (missing
/// flags are false); anything else is a final segment that ends the turn.
pub fn parse_line(line: &str) -> Option<TranscriptEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if line.starts_with('{') {
        match serde_json::from_str::<WireEvent>(line) {
            Ok(wire) => return Some(wire.into_event()),
            Err(e) => tracing::debug!("feed line is not a transcript object ({e}), using as text"),
        }
    }

    Some(TranscriptEvent::end_of_speech(line))
}

/// Opens the feed: a file (or FIFO) when given, stdin otherwise.
pub fn open(input: Option<&Path>) -> Result<Box<dyn BufRead + Send>> {
    match input {
        Some(path) => {
            let file = File::open(path).map_err(|e| VoxlateError::Feed {
                message: format!("cannot open {}: {e}", path.display()),
            })?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

/// Reads `reader` line by line on a background thread and sends every parsed
/// event to `tx`.
///
/// The thread ends at EOF, on a read error, or once the receiver is gone; its
/// result is the number of events sent. Dropping the sender at the end is how
/// the consumer learns the feed is exhausted.
pub fn spawn_reader<R>(reader: R, tx: Sender<TranscriptEvent>) -> Result<JoinHandle<Result<usize>>>
where
    R: BufRead + Send + 'static,
{
    let handle = thread::Builder::new()
        .name("voxlate-feed".to_string())
        .spawn(move || {
            let mut sent = 0;
            for line in reader.lines() {
                let line = line.map_err(|e| VoxlateError::Feed {
                    message: format!("read failed: {e}"),
                })?;
                let Some(event) = parse_line(&line) else {
                    continue;
                };
                if tx.send(event).is_err() {
                    break;
                }
                sent += 1;
            }
            tracing::debug!(events = sent, "transcript feed ended");
            Ok(sent)
        })?;
    Ok(handle)
}
