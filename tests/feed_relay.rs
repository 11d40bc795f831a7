//! Feed file → relay → spoken output, configured from a TOML file.
#![cfg(feature = "cli")]

use std::io::{Cursor, Write};
use std::sync::Arc;
use tempfile::NamedTempFile;
use voxlate::app::relay;
use voxlate::config::Config;
use voxlate::feed;
use voxlate::pipeline::Pipeline;
use voxlate::speech::MockSynthesizer;
use voxlate::translate::MockTranslator;

const FEED: &str = r#"{"type":"Metadata","request_id":"r1"}
{"channel":{"alternatives":[{"transcript":"Olá"}]},"is_final":true,"speech_final":false}
{"channel":{"alternatives":[{"transcript":"mundo. Como"}]},"is_final":true,"speech_final":false}
{"text":"vai você","is_final":false,"speech_final":false}
{"text":"vai","is_final":true,"speech_final":true}

Tudo certo por aí?
"#;

fn config_from_file() -> Config {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(
        br#"
        [pipeline]
        flush_grace_ms = 5000
        poll_interval_ms = 10

        [translation]
        target_language = "en"

        [speech]
        enabled = false
        "#,
    )
    .unwrap();
    let config = Config::load(file.path()).unwrap();
    config.validate().unwrap();
    config
}

#[test]
fn feed_lines_become_ordered_speech() {
    let config = config_from_file();
    let synth = Arc::new(MockSynthesizer::new());
    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let handle = Pipeline::new(config.pipeline_config())
        .with_event_sender(event_tx)
        .start(Arc::new(MockTranslator::new()), synth.clone(), None)
        .unwrap();

    let (feed_tx, feed_rx) = crossbeam_channel::unbounded();
    let reader = feed::spawn_reader(Cursor::new(FEED), feed_tx).unwrap();
    let (_shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

    let mut out = Vec::new();
    let report = relay(handle, &feed_rx, &event_rx, &shutdown_rx, &mut out);

    assert_eq!(reader.join().unwrap().unwrap(), 6);
    assert!(report.is_clean());
    // Grace period is longer than the test: "Como vai" is closed by the
    // next line's sentence, not by the timer
    assert_eq!(
        synth.spoken(),
        vec!["[en] Olá mundo.", "[en] Como vai Tudo certo por aí?"]
    );
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "[en] Olá mundo.\n[en] Como vai Tudo certo por aí?\n"
    );
}

#[test]
fn interim_results_are_ignored() {
    let config = config_from_file();
    let synth = Arc::new(MockSynthesizer::new());
    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let handle = Pipeline::new(config.pipeline_config())
        .with_event_sender(event_tx)
        .start(Arc::new(MockTranslator::new()), synth.clone(), None)
        .unwrap();

    let (feed_tx, feed_rx) = crossbeam_channel::unbounded();
    let interim = "{\"text\":\"isto ainda muda\",\"is_final\":false}\n";
    feed::spawn_reader(Cursor::new(interim), feed_tx).unwrap();
    let (_shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

    let mut out = Vec::new();
    let report = relay(handle, &feed_rx, &event_rx, &shutdown_rx, &mut out);

    assert!(!report.flushed_remainder);
    assert!(synth.spoken().is_empty());
    assert!(out.is_empty());
}
