//! Application logic for voxlate.
//!
//! Builds the engine clients from the configuration, starts the pipeline and
//! relays the transcript feed into it until the feed ends or a shutdown is
//! requested. Then drains.

use crate::config::Config;
use crate::error::Result;
use crate::feed;
use crate::pipeline::{
    Pipeline, PipelineHandle, ProcessorEvent, ShutdownReport, TranscriptEvent,
};
use crate::review::{Reviewer, TerminalReviewer};
use crate::speech::player::default_player;
use crate::speech::{ElevenLabsSynthesizer, SilentSynthesizer, SpeechSynthesizer};
use crate::translate::{OllamaTranslator, Translator};
use crossbeam_channel::{Receiver, select};
use std::io::{IsTerminal, Write};
use std::path::Path;
use std::sync::Arc;

/// Engine clients the pipeline talks to.
pub struct Collaborators {
    pub translator: Arc<dyn Translator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub reviewer: Option<Arc<dyn Reviewer>>,
}

/// Whether the interactive reviewer can own the terminal.
///
/// The review prompt reads from the terminal, so it cannot share stdin with
/// the transcript feed.
fn review_available(input: Option<&Path>) -> bool {
    input.is_some() && std::io::stdin().is_terminal()
}

/// Build the collaborators described by `config`.
///
/// # Errors
/// Returns a config error when speech is enabled without an API key, or if
/// an HTTP client cannot be built.
pub fn build_collaborators(config: &Config, input: Option<&Path>) -> Result<Collaborators> {
    let translator = OllamaTranslator::from_config(&config.translation)?
        .with_min_chars(config.pipeline.min_utterance_chars);
    tracing::info!(
        url = %config.translation.url,
        model = %config.translation.model,
        "translation engine"
    );

    let synthesizer: Arc<dyn SpeechSynthesizer> = if config.speech.enabled {
        let player = default_player(&config.speech.output_device);
        tracing::info!(
            voice = %config.speech.voice_id,
            model = %config.speech.model_id,
            player = player.name(),
            "speech engine"
        );
        Arc::new(ElevenLabsSynthesizer::from_config(&config.speech, player)?)
    } else {
        tracing::info!("speech disabled, translations are printed only");
        Arc::new(SilentSynthesizer)
    };

    let reviewer: Option<Arc<dyn Reviewer>> = if !config.review.enabled {
        None
    } else if review_available(input) {
        Some(Arc::new(TerminalReviewer::new(
            &config.translation.source_language,
        )))
    } else {
        tracing::warn!("review needs a terminal and --input for the feed; review disabled");
        None
    };

    Ok(Collaborators {
        translator: Arc::new(translator),
        synthesizer,
        reviewer,
    })
}

/// Run the relay until the feed ends or `shutdown` fires, then drain.
///
/// Blocking; call from a plain thread or `spawn_blocking`.
pub fn run(config: &Config, input: Option<&Path>, shutdown: Receiver<()>) -> Result<ShutdownReport> {
    config.validate()?;
    let collaborators = build_collaborators(config, input)?;

    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let handle = Pipeline::new(config.pipeline_config())
        .with_event_sender(event_tx)
        .start(
            collaborators.translator,
            collaborators.synthesizer,
            collaborators.reviewer,
        )?;

    let (feed_tx, feed_rx) = crossbeam_channel::unbounded();
    // The reader is never joined: on Ctrl+C it may be parked in a read on stdin
    let _reader = feed::spawn_reader(feed::open(input)?, feed_tx)?;

    let mut stdout = std::io::stdout();
    let report = relay(handle, &feed_rx, &event_rx, &shutdown, &mut stdout);

    if !report.is_clean() {
        tracing::warn!(
            drained = report.drained,
            worker_joined = report.worker_joined,
            "shutdown left work unfinished"
        );
    }
    Ok(report)
}

/// Route feed events into the pipeline and echo spoken text to `out`.
///
/// Returns after the feed closes or a shutdown message arrives (or its
/// sender is dropped), once the pipeline has drained.
pub fn relay(
    handle: PipelineHandle,
    feed: &Receiver<TranscriptEvent>,
    events: &Receiver<ProcessorEvent>,
    shutdown: &Receiver<()>,
    out: &mut dyn Write,
) -> ShutdownReport {
    // Replaces `events` once the worker side disconnects
    let never = crossbeam_channel::never();
    let mut live_events = events;

    loop {
        select! {
            recv(feed) -> msg => match msg {
                Ok(event) => handle.on_transcript(&event),
                Err(_) => {
                    tracing::info!("transcript feed closed");
                    break;
                }
            },
            recv(live_events) -> msg => match msg {
                Ok(event) => echo(out, &event),
                Err(_) => {
                    tracing::warn!("processor events closed before the feed");
                    live_events = &never;
                }
            },
            recv(shutdown) -> _ => {
                tracing::info!("shutdown requested");
                break;
            },
        }
    }

    let report = handle.shutdown();
    for event in events.try_iter() {
        echo(out, &event);
    }
    report
}

fn echo(out: &mut dyn Write, event: &ProcessorEvent) {
    if let ProcessorEvent::Finished {
        spoken: Some(text), ..
    } = event
        && let Err(e) = writeln!(out, "{text}").and_then(|()| out.flush())
    {
        tracing::debug!("failed to echo spoken text: {e}");
    }
}
