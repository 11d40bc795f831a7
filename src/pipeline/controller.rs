//! Pipeline controller: wires transcript events to the segmenter and flush
//! timer, owns the sequential processor, and performs the shutdown drain.

use crate::defaults;
use crate::error::{Result, VoxlateError};
use crate::pipeline::error::{ErrorReporter, LogReporter};
use crate::pipeline::flush::FlushScheduler;
use crate::pipeline::processor::{ProcessorConfig, ProcessorRunner, SequentialProcessor};
use crate::pipeline::queue::WorkQueue;
use crate::pipeline::segmenter::Segmenter;
use crate::pipeline::types::{ProcessorEvent, TranscriptEvent, Utterance};
use crate::review::{ReviewTarget, Reviewer};
use crate::speech::SpeechSynthesizer;
use crate::translate::Translator;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Silence after end-of-speech before the carry buffer is force-flushed
    pub grace_period: Duration,
    /// Minimum length of a single-token utterance
    pub min_chars: usize,
    /// Work queue poll interval
    pub poll_interval: Duration,
    /// Upper bound on waiting for queued utterances at shutdown
    pub drain_timeout: Duration,
    /// Upper bound on waiting for the worker thread after the drain
    pub worker_join_timeout: Duration,
    pub source_language: String,
    pub target_language: String,
    pub review_target: ReviewTarget,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_millis(defaults::FLUSH_GRACE_MS),
            min_chars: defaults::MIN_UTTERANCE_CHARS,
            poll_interval: Duration::from_millis(defaults::POLL_INTERVAL_MS),
            drain_timeout: Duration::from_millis(defaults::DRAIN_TIMEOUT_MS),
            worker_join_timeout: Duration::from_millis(defaults::WORKER_JOIN_TIMEOUT_MS),
            source_language: defaults::SOURCE_LANGUAGE.to_string(),
            target_language: defaults::TARGET_LANGUAGE.to_string(),
            review_target: ReviewTarget::default(),
        }
    }
}

impl PipelineConfig {
    fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
            poll_interval: self.poll_interval,
            min_chars: self.min_chars,
            review_target: self.review_target,
        }
    }
}

/// Outcome of [`PipelineHandle::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// A carry buffer remainder was emitted as a final utterance.
    pub flushed_remainder: bool,
    /// Every queued utterance finished before the drain timeout.
    pub drained: bool,
    /// The worker thread exited before the join timeout.
    pub worker_joined: bool,
}

impl ShutdownReport {
    /// True when nothing was abandoned.
    pub fn is_clean(&self) -> bool {
        self.drained && self.worker_joined
    }
}

/// Translation relay: Segmenter → WorkQueue → SequentialProcessor.
pub struct Pipeline {
    config: PipelineConfig,
    error_reporter: Arc<dyn ErrorReporter>,
    event_tx: Option<crossbeam_channel::Sender<ProcessorEvent>>,
}

impl Pipeline {
    /// Creates a new pipeline with the default error reporter.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            error_reporter: Arc::new(LogReporter),
            event_tx: None,
        }
    }

    /// Sets a custom error reporter.
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.error_reporter = reporter;
        self
    }

    /// Sets a channel that receives processor progress events.
    pub fn with_event_sender(mut self, tx: crossbeam_channel::Sender<ProcessorEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Starts the sequential processor and returns the handle that accepts
    /// transcript events.
    ///
    /// # Errors
    /// Returns `Io` if the worker thread cannot be spawned.
    pub fn start(
        self,
        translator: Arc<dyn Translator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        reviewer: Option<Arc<dyn Reviewer>>,
    ) -> Result<PipelineHandle> {
        let queue = WorkQueue::new();
        let stop = Arc::new(AtomicBool::new(false));
        let processing = Arc::new(AtomicBool::new(false));

        let mut processor = SequentialProcessor::new(
            self.config.processor_config(),
            translator,
            synthesizer,
            self.error_reporter.clone(),
        );
        if let Some(reviewer) = reviewer {
            processor = processor.with_reviewer(reviewer);
        }
        if let Some(tx) = self.event_tx {
            processor = processor.with_event_sender(tx);
        }
        let runner = processor.spawn(queue.clone(), stop.clone(), processing.clone())?;

        let segmenter =
            Arc::new(Segmenter::new(queue.clone()).with_min_chars(self.config.min_chars));
        let flush_target = Arc::clone(&segmenter);
        let scheduler = FlushScheduler::new(move || {
            flush_target.force_flush();
        });

        tracing::info!(
            from = %self.config.source_language,
            to = %self.config.target_language,
            grace_ms = self.config.grace_period.as_millis() as u64,
            "pipeline started"
        );

        Ok(PipelineHandle {
            config: self.config,
            error_reporter: self.error_reporter,
            segmenter,
            scheduler,
            queue,
            stop,
            processing,
            runner,
        })
    }
}

/// Handle to a running pipeline.
///
/// Event methods take `&self`, so the handle can be shared with the thread
/// that delivers recognizer events.
pub struct PipelineHandle {
    config: PipelineConfig,
    error_reporter: Arc<dyn ErrorReporter>,
    segmenter: Arc<Segmenter>,
    scheduler: FlushScheduler,
    queue: WorkQueue<Utterance>,
    stop: Arc<AtomicBool>,
    processing: Arc<AtomicBool>,
    runner: ProcessorRunner,
}

impl PipelineHandle {
    /// Routes one recognizer event.
    ///
    /// Events with empty text are ignored entirely. A final segment cancels
    /// the flush timer and is appended; end-of-speech arms the timer.
    pub fn on_transcript(&self, event: &TranscriptEvent) {
        if event.text.trim().is_empty() {
            return;
        }
        if event.is_final {
            self.on_transcript_final(&event.text);
        }
        if event.speech_final {
            self.on_speech_end();
        }
    }

    /// A finalized recognition segment: speech resumed, so the pending
    /// flush is cancelled before the text is appended.
    pub fn on_transcript_final(&self, text: &str) {
        self.scheduler.cancel();
        let emitted = self.segmenter.append(text);
        if emitted > 0 {
            tracing::debug!(emitted, "utterances queued");
        }
    }

    /// End of vocal activity: flush the carry buffer after the grace period
    /// unless speech resumes first.
    pub fn on_speech_end(&self) {
        self.scheduler.schedule(self.config.grace_period);
    }

    /// True while the processor is working on an utterance.
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Utterances queued or in flight.
    pub fn pending(&self) -> usize {
        self.queue.unfinished()
    }

    /// Current carry buffer content.
    pub fn carry(&self) -> String {
        self.segmenter.carry()
    }

    /// Drains and stops the pipeline.
    ///
    /// Cancels the flush timer, flushes the carry buffer once, sets the stop
    /// signal, waits up to the drain timeout for the queue, then up to the
    /// join timeout for the worker. Timeouts are reported and shutdown
    /// proceeds; the worker is detached if it does not exit.
    pub fn shutdown(self) -> ShutdownReport {
        let started = Instant::now();

        self.scheduler.cancel();
        let flushed_remainder = self.segmenter.force_flush();
        self.stop.store(true, Ordering::SeqCst);

        let pending = self.queue.unfinished();
        if pending > 0 {
            tracing::info!(pending, "draining queued utterances");
        }

        let drained = self.queue.join(self.config.drain_timeout);
        if !drained {
            self.error_reporter.report(
                "shutdown",
                &VoxlateError::ShutdownTimeout {
                    stage: "queue drain".to_string(),
                    waited_ms: self.config.drain_timeout.as_millis() as u64,
                },
            );
        }

        let worker_joined = self.runner.join_timeout(self.config.worker_join_timeout);
        if !worker_joined {
            self.error_reporter.report(
                "shutdown",
                &VoxlateError::ShutdownTimeout {
                    stage: "processor".to_string(),
                    waited_ms: self.config.worker_join_timeout.as_millis() as u64,
                },
            );
        }

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            drained,
            worker_joined,
            "pipeline stopped"
        );

        ShutdownReport {
            flushed_remainder,
            drained,
            worker_joined,
        }
    }
}
