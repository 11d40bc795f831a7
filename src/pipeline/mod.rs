//! Utterance pipeline.
//!
//! Transcript fragments are cut into utterances by the segmenter, queued in
//! order, and consumed by a single worker thread that translates and speaks
//! them one at a time. A silence timer flushes unterminated speech.

pub mod controller;
pub mod error;
pub mod flush;
pub mod processor;
pub mod queue;
pub mod segmenter;
pub mod types;

pub use controller::{Pipeline, PipelineConfig, PipelineHandle, ShutdownReport};
pub use error::{ErrorReporter, LogReporter};
pub use flush::FlushScheduler;
pub use processor::{ProcessorConfig, ProcessorRunner, SequentialProcessor};
pub use queue::WorkQueue;
pub use segmenter::{Segmenter, passes_noise_filter, split_sentences};
pub use types::{ProcessorEvent, Stage, TranscriptEvent, Utterance};
