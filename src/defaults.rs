//! Default configuration constants for voxlate.
//!
//! Shared by the config layer, the pipeline and the engine clients so that
//! every component agrees on the same baseline values.

/// Silence duration in milliseconds after end-of-speech before the carry
/// buffer is force-flushed.
///
/// 2 seconds tolerates the short pauses speakers take mid-sentence without
/// holding an unpunctuated tail forever.
pub const FLUSH_GRACE_MS: u64 = 2000;

/// Minimum length (in characters) of a single-token utterance.
///
/// Shorter fragments without an interior space are recognizer noise
/// ("uh", "é", stray punctuation) and are dropped.
pub const MIN_UTTERANCE_CHARS: usize = 4;

/// Work queue poll interval in milliseconds.
///
/// Bounds how long the processor takes to notice the stop signal.
pub const POLL_INTERVAL_MS: u64 = 100;

/// Upper bound for draining queued utterances at shutdown.
pub const DRAIN_TIMEOUT_MS: u64 = 30_000;

/// Upper bound for joining the processor thread after the drain.
pub const WORKER_JOIN_TIMEOUT_MS: u64 = 500;

/// Spoken language of the incoming transcript.
pub const SOURCE_LANGUAGE: &str = "pt-BR";

/// Language the utterances are translated into.
pub const TARGET_LANGUAGE: &str = "English";

/// Ollama generate endpoint used for translation.
pub const TRANSLATION_URL: &str = "http://localhost:11434/api/generate";

/// Translation model served by Ollama.
pub const TRANSLATION_MODEL: &str = "gemma2:2b";

/// Connect timeout for the translation engine.
pub const TRANSLATION_CONNECT_TIMEOUT_MS: u64 = 3000;

/// Total request timeout for the translation engine.
pub const TRANSLATION_TIMEOUT_MS: u64 = 25_000;

/// ElevenLabs API base URL.
pub const SPEECH_API_URL: &str = "https://api.elevenlabs.io";

/// Default ElevenLabs voice.
pub const SPEECH_VOICE_ID: &str = "HDNjMGNzhjXlh3sYMYQI";

/// Default ElevenLabs low-latency model.
pub const SPEECH_MODEL_ID: &str = "eleven_flash_v2_5";

/// Total request timeout for one synthesis call.
pub const SPEECH_TIMEOUT_MS: u64 = 60_000;

/// PCM sample rate requested from the synthesis engine and used for playback.
pub const PCM_SAMPLE_RATE: u32 = 24_000;

/// Playback channel count.
pub const PCM_CHANNELS: u16 = 1;

/// Output device name fragment preferred for playback (virtual microphone sink).
pub const OUTPUT_DEVICE: &str = "VirtualMicSink";

/// Peak level that synthesized audio is normalized towards.
pub const NORMALIZE_TARGET: i16 = 28_000;

/// Maximum gain applied during normalization.
pub const MAX_GAIN: f32 = 3.0;

/// Smallest synthesized payload (in bytes) worth playing.
pub const MIN_AUDIO_BYTES: usize = 4;
