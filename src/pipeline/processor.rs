//! Sequential processor: one utterance at a time, start to finish.
//!
//! A single worker thread pulls utterances from the work queue and takes each
//! through review (optional), translation and speech before touching the
//! next one. Every failure degrades the current utterance to silence; nothing
//! except the stop signal ends the loop.

use crate::defaults;
use crate::error::VoxlateError;
use crate::pipeline::error::ErrorReporter;
use crate::pipeline::queue::WorkQueue;
use crate::pipeline::segmenter::passes_noise_filter;
use crate::pipeline::types::{ProcessorEvent, Stage, Utterance};
use crate::review::{ReviewRequest, ReviewTarget, Reviewer};
use crate::speech::SpeechSynthesizer;
use crate::translate::Translator;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Configuration for the sequential processor.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Language of the incoming utterances.
    pub source_language: String,
    /// Language spoken out.
    pub target_language: String,
    /// Queue poll interval; bounds stop-signal latency.
    pub poll_interval: Duration,
    /// Minimum single-token length accepted for translation.
    pub min_chars: usize,
    /// Which text the reviewer edits.
    pub review_target: ReviewTarget,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            source_language: defaults::SOURCE_LANGUAGE.to_string(),
            target_language: defaults::TARGET_LANGUAGE.to_string(),
            poll_interval: Duration::from_millis(defaults::POLL_INTERVAL_MS),
            min_chars: defaults::MIN_UTTERANCE_CHARS,
            review_target: ReviewTarget::default(),
        }
    }
}

/// Marks one dequeued utterance as in flight.
///
/// Dropping it clears the processing flag and marks the queue item done, on
/// every exit path including unwinding.
struct InFlight<'a> {
    queue: &'a WorkQueue<Utterance>,
    processing: &'a AtomicBool,
}

impl<'a> InFlight<'a> {
    fn begin(queue: &'a WorkQueue<Utterance>, processing: &'a AtomicBool) -> Self {
        processing.store(true, Ordering::SeqCst);
        Self { queue, processing }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.processing.store(false, Ordering::SeqCst);
        self.queue.mark_done();
    }
}

/// Takes utterances through review, translation and speech.
pub struct SequentialProcessor {
    config: ProcessorConfig,
    translator: Arc<dyn Translator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    reviewer: Option<Arc<dyn Reviewer>>,
    error_reporter: Arc<dyn ErrorReporter>,
    event_tx: Option<crossbeam_channel::Sender<ProcessorEvent>>,
}

impl SequentialProcessor {
    /// Creates a processor without a review step.
    pub fn new(
        config: ProcessorConfig,
        translator: Arc<dyn Translator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        error_reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            config,
            translator,
            synthesizer,
            reviewer: None,
            error_reporter,
            event_tx: None,
        }
    }

    /// Enables the review step.
    pub fn with_reviewer(mut self, reviewer: Arc<dyn Reviewer>) -> Self {
        self.reviewer = Some(reviewer);
        self
    }

    /// Sets a channel that receives stage transitions (non-blocking).
    pub fn with_event_sender(mut self, tx: crossbeam_channel::Sender<ProcessorEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Spawns the worker thread.
    ///
    /// The worker keeps taking utterances until `stop` is set and a poll comes
    /// back empty, so everything queued before shutdown is still processed.
    pub fn spawn(
        self,
        queue: WorkQueue<Utterance>,
        stop: Arc<AtomicBool>,
        processing: Arc<AtomicBool>,
    ) -> std::io::Result<ProcessorRunner> {
        let handle = thread::Builder::new()
            .name("voxlate-processor".to_string())
            .spawn(move || self.run(&queue, &stop, &processing))?;
        Ok(ProcessorRunner {
            handle: Some(handle),
        })
    }

    /// Worker loop.
    fn run(&self, queue: &WorkQueue<Utterance>, stop: &AtomicBool, processing: &AtomicBool) {
        tracing::debug!(
            translator = self.translator.name(),
            synthesizer = self.synthesizer.name(),
            review = self.reviewer.as_ref().map(|r| r.name()),
            "processor started"
        );

        loop {
            let Some(utterance) = queue.dequeue(self.config.poll_interval) else {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                continue;
            };

            let _in_flight = InFlight::begin(queue, processing);
            let sequence = utterance.sequence;
            let outcome = catch_unwind(AssertUnwindSafe(|| self.process(utterance)));
            if outcome.is_err() {
                self.error_reporter.report(
                    "processor",
                    &VoxlateError::Other(format!("utterance {sequence} panicked, skipped")),
                );
                self.emit(ProcessorEvent::Finished {
                    sequence,
                    spoken: None,
                });
            }
        }

        tracing::debug!("processor stopped");
    }

    /// Processes a single utterance to completion.
    ///
    /// Returns the text handed to speech synthesis, or `None` when the
    /// utterance degraded to silence.
    pub fn process(&self, utterance: Utterance) -> Option<String> {
        let sequence = utterance.sequence;
        let started = Instant::now();
        tracing::debug!(
            sequence,
            forced = utterance.forced,
            queued_ms = utterance.created.elapsed().as_millis() as u64,
            "utterance dequeued"
        );

        let spoken = self.speakable_text(&utterance).and_then(|text| {
            self.enter(sequence, Stage::Speaking);
            match self.synthesizer.synthesize_and_play(&text) {
                Ok(()) => Some(text),
                Err(e) => {
                    self.error_reporter.report("speak", &e);
                    None
                }
            }
        });

        self.enter(sequence, Stage::Done);
        tracing::debug!(
            sequence,
            elapsed_ms = started.elapsed().as_millis() as u64,
            spoken = spoken.is_some(),
            "utterance done"
        );
        self.emit(ProcessorEvent::Finished {
            sequence,
            spoken: spoken.clone(),
        });
        spoken
    }

    /// Runs review and translation; `None` means nothing to say.
    fn speakable_text(&self, utterance: &Utterance) -> Option<String> {
        let sequence = utterance.sequence;
        let source = utterance.text.as_str();

        let text = match &self.reviewer {
            None => {
                self.enter(sequence, Stage::Translating);
                self.translate(source)
            }
            Some(reviewer) => {
                self.enter(sequence, Stage::Translating);
                let preview = self.translate(source);
                self.enter(sequence, Stage::InReview);
                let request = ReviewRequest {
                    original: source,
                    machine_translation: &preview,
                    target: self.config.review_target,
                };
                let reviewed = self.review(reviewer.as_ref(), &request);
                match self.config.review_target {
                    ReviewTarget::Translation => reviewed,
                    ReviewTarget::Source if reviewed == source => preview,
                    ReviewTarget::Source => {
                        self.enter(sequence, Stage::Translating);
                        self.translate(&reviewed)
                    }
                }
            }
        };

        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// Review with fallback to the unedited text on cancellation or error.
    fn review(&self, reviewer: &dyn Reviewer, request: &ReviewRequest<'_>) -> String {
        match reviewer.review(request) {
            Ok(Some(edited)) => edited.trim().to_string(),
            Ok(None) => request.editable().to_string(),
            Err(e) => {
                self.error_reporter.report("review", &e);
                request.editable().to_string()
            }
        }
    }

    /// Translate, mapping every failure to the empty string.
    fn translate(&self, text: &str) -> String {
        let text = text.trim();
        if !passes_noise_filter(text, self.config.min_chars) {
            tracing::debug!(text, "nothing to translate");
            return String::new();
        }

        match self.translator.translate(
            text,
            &self.config.source_language,
            &self.config.target_language,
        ) {
            Ok(translated) => translated.trim().to_string(),
            Err(e) => {
                self.error_reporter.report("translate", &e);
                String::new()
            }
        }
    }

    fn enter(&self, sequence: u64, stage: Stage) {
        tracing::trace!(sequence, %stage, "stage");
        self.emit(ProcessorEvent::StageEntered { sequence, stage });
    }

    fn emit(&self, event: ProcessorEvent) {
        if let Some(ref tx) = self.event_tx
            && tx.try_send(event).is_err()
        {
            // Listener gone or full; events are best-effort
        }
    }
}

/// Handle to the running worker thread.
pub struct ProcessorRunner {
    handle: Option<JoinHandle<()>>,
}

impl ProcessorRunner {
    /// Returns true once the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Waits up to `timeout` for the worker to exit.
    ///
    /// Returns true if it exited (a panicked worker is logged and counts as
    /// exited). After the deadline the thread is detached.
    pub fn join_timeout(mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let poll_interval = Duration::from_millis(10);

        while !self.is_finished() {
            if Instant::now() >= deadline {
                // Dropping the JoinHandle detaches the thread
                return false;
            }
            thread::sleep(poll_interval);
        }

        if let Some(handle) = self.handle.take()
            && let Err(panic_info) = handle.join()
        {
            let msg = panic_info
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
                .unwrap_or("unknown panic");
            tracing::error!("processor thread panicked: {msg}");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::error::LogReporter;
    use crate::review::ScriptedReviewer;
    use crate::speech::MockSynthesizer;
    use crate::translate::MockTranslator;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockReporter {
        errors: Mutex<Vec<(String, String)>>,
    }

    impl ErrorReporter for MockReporter {
        fn report(&self, stage: &str, error: &VoxlateError) {
            self.errors
                .lock()
                .unwrap()
                .push((stage.to_string(), error.to_string()));
        }
    }

    fn config() -> ProcessorConfig {
        ProcessorConfig {
            source_language: "pt-BR".to_string(),
            target_language: "en".to_string(),
            poll_interval: Duration::from_millis(10),
            ..Default::default()
        }
    }

    fn utterance(text: &str, sequence: u64) -> Utterance {
        Utterance::new(text.to_string(), sequence, false)
    }

    #[test]
    fn test_translates_then_speaks() {
        let synth = Arc::new(MockSynthesizer::new());
        let processor = SequentialProcessor::new(
            config(),
            Arc::new(MockTranslator::new()),
            synth.clone(),
            Arc::new(LogReporter),
        );

        let spoken = processor.process(utterance("Olá mundo.", 0));

        assert_eq!(spoken.as_deref(), Some("[en] Olá mundo."));
        assert_eq!(synth.spoken(), vec!["[en] Olá mundo."]);
    }

    #[test]
    fn test_translation_failure_skips_speech() {
        let synth = Arc::new(MockSynthesizer::new());
        let reporter = Arc::new(MockReporter::default());
        let processor = SequentialProcessor::new(
            config(),
            Arc::new(MockTranslator::new().failing_on("Quebrou tudo.")),
            synth.clone(),
            reporter.clone(),
        );

        assert_eq!(processor.process(utterance("Quebrou tudo.", 0)), None);
        assert!(synth.spoken().is_empty());

        let errors = reporter.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "translate");
    }

    #[test]
    fn test_empty_translation_is_silence() {
        let synth = Arc::new(MockSynthesizer::new());
        let processor = SequentialProcessor::new(
            config(),
            Arc::new(MockTranslator::new().with_response("   ")),
            synth.clone(),
            Arc::new(LogReporter),
        );

        assert_eq!(processor.process(utterance("Alguma coisa", 0)), None);
        assert!(synth.spoken().is_empty());
    }

    #[test]
    fn test_short_input_never_reaches_translator() {
        let translator = Arc::new(MockTranslator::new());
        let processor = SequentialProcessor::new(
            config(),
            translator.clone(),
            Arc::new(MockSynthesizer::new()),
            Arc::new(LogReporter),
        );

        assert_eq!(processor.process(utterance("é", 0)), None);
        assert!(translator.calls().is_empty());
    }

    #[test]
    fn test_synthesis_failure_is_reported_not_propagated() {
        let reporter = Arc::new(MockReporter::default());
        let processor = SequentialProcessor::new(
            config(),
            Arc::new(MockTranslator::new().with_response("boom")),
            Arc::new(MockSynthesizer::new().failing_on("boom")),
            reporter.clone(),
        );

        assert_eq!(processor.process(utterance("Qualquer frase", 0)), None);
        assert_eq!(reporter.errors.lock().unwrap()[0].0, "speak");
    }

    #[test]
    fn test_stage_events_without_review() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let processor = SequentialProcessor::new(
            config(),
            Arc::new(MockTranslator::new()),
            Arc::new(MockSynthesizer::new()),
            Arc::new(LogReporter),
        )
        .with_event_sender(tx);

        processor.process(utterance("Bom dia.", 7));

        assert_eq!(
            stages(&rx),
            vec![Stage::Translating, Stage::Speaking, Stage::Done]
        );
    }

    #[test]
    fn test_failed_translation_short_circuits_to_done() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let processor = SequentialProcessor::new(
            config(),
            Arc::new(MockTranslator::new().failing_on("Falha aqui.")),
            Arc::new(MockSynthesizer::new()),
            Arc::new(LogReporter),
        )
        .with_event_sender(tx);

        processor.process(utterance("Falha aqui.", 1));

        let events: Vec<ProcessorEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                ProcessorEvent::StageEntered {
                    sequence: 1,
                    stage: Stage::Translating
                },
                ProcessorEvent::StageEntered {
                    sequence: 1,
                    stage: Stage::Done
                },
                ProcessorEvent::Finished {
                    sequence: 1,
                    spoken: None
                },
            ]
        );
    }

    #[test]
    fn test_source_review_edit_is_translated() {
        let translator = Arc::new(MockTranslator::new());
        let reviewer = Arc::new(ScriptedReviewer::new([Some("Olá pessoal.")]));
        let processor = SequentialProcessor::new(
            config(),
            translator.clone(),
            Arc::new(MockSynthesizer::new()),
            Arc::new(LogReporter),
        )
        .with_reviewer(reviewer.clone());

        let spoken = processor.process(utterance("Olá mundo.", 0));

        assert_eq!(spoken.as_deref(), Some("[en] Olá pessoal."));
        assert_eq!(translator.calls(), vec!["Olá mundo.", "Olá pessoal."]);
        assert_eq!(
            reviewer.seen(),
            vec![("Olá mundo.".to_string(), "[en] Olá mundo.".to_string())]
        );
    }

    fn stages(rx: &crossbeam_channel::Receiver<ProcessorEvent>) -> Vec<Stage> {
        rx.try_iter()
            .filter_map(|e| match e {
                ProcessorEvent::StageEntered { stage, .. } => Some(stage),
                ProcessorEvent::Finished { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_stage_order_with_source_review() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let processor = SequentialProcessor::new(
            config(),
            Arc::new(MockTranslator::new()),
            Arc::new(MockSynthesizer::new()),
            Arc::new(LogReporter),
        )
        .with_reviewer(Arc::new(ScriptedReviewer::new([None, Some("Olá pessoal.")])))
        .with_event_sender(tx);

        // Cancelled review reuses the preview
        processor.process(utterance("Olá mundo.", 0));
        assert_eq!(
            stages(&rx),
            vec![Stage::Translating, Stage::InReview, Stage::Speaking, Stage::Done]
        );

        // Edited source is translated again after review
        processor.process(utterance("Olá mundo.", 1));
        assert_eq!(
            stages(&rx),
            vec![
                Stage::Translating,
                Stage::InReview,
                Stage::Translating,
                Stage::Speaking,
                Stage::Done
            ]
        );
    }

    #[test]
    fn test_stage_order_with_translation_review() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let processor = SequentialProcessor::new(
            ProcessorConfig {
                review_target: ReviewTarget::Translation,
                ..config()
            },
            Arc::new(MockTranslator::new()),
            Arc::new(MockSynthesizer::new()),
            Arc::new(LogReporter),
        )
        .with_reviewer(Arc::new(ScriptedReviewer::new([Some("Hi all.")])))
        .with_event_sender(tx);

        processor.process(utterance("Olá mundo.", 0));
        assert_eq!(
            stages(&rx),
            vec![Stage::Translating, Stage::InReview, Stage::Speaking, Stage::Done]
        );
    }

    #[test]
    fn test_source_review_cancel_falls_back_to_preview() {
        let translator = Arc::new(MockTranslator::new());
        let reviewer = Arc::new(ScriptedReviewer::new([None::<String>]));
        let processor = SequentialProcessor::new(
            config(),
            translator.clone(),
            Arc::new(MockSynthesizer::new()),
            Arc::new(LogReporter),
        )
        .with_reviewer(reviewer);

        let spoken = processor.process(utterance("Olá mundo.", 0));

        assert_eq!(spoken.as_deref(), Some("[en] Olá mundo."));
        // Unedited source: the preview is reused, no second call
        assert_eq!(translator.calls().len(), 1);
    }

    #[test]
    fn test_translation_review_edit_is_spoken_verbatim() {
        let translator = Arc::new(MockTranslator::new());
        let synth = Arc::new(MockSynthesizer::new());
        let reviewer = Arc::new(ScriptedReviewer::new([Some("Hi everyone.")]));
        let processor = SequentialProcessor::new(
            ProcessorConfig {
                review_target: ReviewTarget::Translation,
                ..config()
            },
            translator.clone(),
            synth.clone(),
            Arc::new(LogReporter),
        )
        .with_reviewer(reviewer);

        processor.process(utterance("Olá mundo.", 0));

        assert_eq!(synth.spoken(), vec!["Hi everyone."]);
        assert_eq!(translator.calls().len(), 1);
    }

    #[test]
    fn test_translation_review_cancel_speaks_machine_translation() {
        let synth = Arc::new(MockSynthesizer::new());
        let processor = SequentialProcessor::new(
            ProcessorConfig {
                review_target: ReviewTarget::Translation,
                ..config()
            },
            Arc::new(MockTranslator::new()),
            synth.clone(),
            Arc::new(LogReporter),
        )
        .with_reviewer(Arc::new(ScriptedReviewer::new([None::<String>])));

        processor.process(utterance("Olá mundo.", 0));

        assert_eq!(synth.spoken(), vec!["[en] Olá mundo."]);
    }

    #[test]
    fn test_review_clearing_text_means_silence() {
        let synth = Arc::new(MockSynthesizer::new());
        let processor = SequentialProcessor::new(
            ProcessorConfig {
                review_target: ReviewTarget::Translation,
                ..config()
            },
            Arc::new(MockTranslator::new()),
            synth.clone(),
            Arc::new(LogReporter),
        )
        .with_reviewer(Arc::new(ScriptedReviewer::new([Some("")])));

        assert_eq!(processor.process(utterance("Olá mundo.", 0)), None);
        assert!(synth.spoken().is_empty());
    }

    #[test]
    fn test_worker_drains_queue_before_honouring_stop() {
        let queue = WorkQueue::new();
        for (i, text) in ["Primeira frase.", "Segunda frase.", "Terceira frase."]
            .iter()
            .enumerate()
        {
            queue.enqueue(utterance(text, i as u64));
        }

        let synth = Arc::new(MockSynthesizer::new().with_delay(Duration::from_millis(20)));
        let stop = Arc::new(AtomicBool::new(true));
        let processing = Arc::new(AtomicBool::new(false));
        let runner = SequentialProcessor::new(
            config(),
            Arc::new(MockTranslator::new()),
            synth.clone(),
            Arc::new(LogReporter),
        )
        .spawn(queue.clone(), stop, processing.clone())
        .unwrap();

        assert!(queue.join(Duration::from_secs(5)));
        assert!(runner.join_timeout(Duration::from_secs(1)));
        assert_eq!(synth.spoken().len(), 3);
        assert!(!processing.load(Ordering::SeqCst));
    }

    #[test]
    fn test_worker_survives_failures() {
        let queue = WorkQueue::new();
        queue.enqueue(utterance("Falha aqui.", 0));
        queue.enqueue(utterance("Isto funciona.", 1));

        let synth = Arc::new(MockSynthesizer::new());
        let stop = Arc::new(AtomicBool::new(false));
        let runner = SequentialProcessor::new(
            config(),
            Arc::new(MockTranslator::new().failing_on("Falha aqui.")),
            synth.clone(),
            Arc::new(LogReporter),
        )
        .spawn(queue.clone(), stop.clone(), Arc::new(AtomicBool::new(false)))
        .unwrap();

        assert!(queue.join(Duration::from_secs(5)));
        stop.store(true, Ordering::SeqCst);
        assert!(runner.join_timeout(Duration::from_secs(1)));
        assert_eq!(synth.spoken(), vec!["[en] Isto funciona."]);
    }

    #[test]
    fn test_panicking_collaborator_does_not_kill_worker() {
        struct PanickingTranslator;
        impl Translator for PanickingTranslator {
            fn translate(&self, text: &str, _: &str, _: &str) -> crate::error::Result<String> {
                if text.starts_with("Pânico") {
                    panic!("translator exploded");
                }
                Ok(text.to_string())
            }
            fn name(&self) -> &str {
                "panicking"
            }
        }

        let queue = WorkQueue::new();
        queue.enqueue(utterance("Pânico geral.", 0));
        queue.enqueue(utterance("Tudo calmo.", 1));

        let synth = Arc::new(MockSynthesizer::new());
        let stop = Arc::new(AtomicBool::new(false));
        let runner = SequentialProcessor::new(
            config(),
            Arc::new(PanickingTranslator),
            synth.clone(),
            Arc::new(LogReporter),
        )
        .spawn(queue.clone(), stop.clone(), Arc::new(AtomicBool::new(false)))
        .unwrap();

        assert!(queue.join(Duration::from_secs(5)));
        stop.store(true, Ordering::SeqCst);
        assert!(runner.join_timeout(Duration::from_secs(1)));
        assert_eq!(synth.spoken(), vec!["Tudo calmo."]);
    }

    #[test]
    fn test_join_timeout_detaches_stuck_worker() {
        let queue = WorkQueue::new();
        queue.enqueue(utterance("Demora muito.", 0));

        let stop = Arc::new(AtomicBool::new(true));
        let runner = SequentialProcessor::new(
            config(),
            Arc::new(MockTranslator::new()),
            Arc::new(MockSynthesizer::new().with_delay(Duration::from_millis(500))),
            Arc::new(LogReporter),
        )
        .spawn(queue, stop, Arc::new(AtomicBool::new(false)))
        .unwrap();

        // Wait until the worker is inside the slow synthesis call
        thread::sleep(Duration::from_millis(100));
        let start = Instant::now();
        assert!(!runner.join_timeout(Duration::from_millis(50)));
        assert!(start.elapsed() < Duration::from_millis(400));
    }
}
