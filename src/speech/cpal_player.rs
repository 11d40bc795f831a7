//! Blocking PCM playback through cpal.
//!
//! Output device choice: a device whose name contains the configured fragment
//! (typically a virtual microphone sink), else any PulseAudio/PipeWire device,
//! else the host default.

use crate::error::{Result, VoxlateError};
use crate::speech::pcm;
use crate::speech::player::AudioPlayer;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::bounded;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Extra time allowed past the nominal buffer duration before giving up.
const PLAYBACK_SLACK: Duration = Duration::from_secs(2);

/// Pick the output device index for `preferred` among `names`.
///
/// The last name containing `preferred` wins, then the last one containing
/// "pulse"; `None` means "use the host default".
pub fn pick_output_device(names: &[String], preferred: &str) -> Option<usize> {
    let preferred = preferred.to_lowercase();
    let mut exact = None;
    let mut pulse = None;
    for (idx, name) in names.iter().enumerate() {
        let lower = name.to_lowercase();
        if !preferred.is_empty() && lower.contains(&preferred) {
            exact = Some(idx);
        }
        if lower.contains("pulse") {
            pulse = Some(idx);
        }
    }
    exact.or(pulse)
}

/// List all audio output device names.
pub fn list_output_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| VoxlateError::AudioOutput {
            message: format!("Failed to enumerate output devices: {}", e),
        })?;
    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

fn find_output_device(preferred: &str) -> Result<cpal::Device> {
    let host = cpal::default_host();

    if let Ok(devices) = host.output_devices() {
        let devices: Vec<cpal::Device> = devices.collect();
        let names: Vec<String> = devices
            .iter()
            .map(|d| d.name().unwrap_or_default())
            .collect();
        if let Some(idx) = pick_output_device(&names, preferred)
            && let Some(device) = devices.into_iter().nth(idx)
        {
            return Ok(device);
        }
    }

    host.default_output_device()
        .ok_or_else(|| VoxlateError::AudioDeviceNotFound {
            device: preferred.to_string(),
        })
}

/// Shared cursor over the buffer being played.
struct Playback<T> {
    samples: Vec<T>,
    position: usize,
}

impl<T: Copy> Playback<T> {
    /// Fill `out` from the buffer, padding with `silence`. Returns true once exhausted.
    fn fill(&mut self, out: &mut [T], silence: T) -> bool {
        let available = self.samples.len() - self.position;
        let n = available.min(out.len());
        out[..n].copy_from_slice(&self.samples[self.position..self.position + n]);
        out[n..].fill(silence);
        self.position += n;
        self.position >= self.samples.len()
    }
}

/// Audio player that writes to a cpal output stream and waits for completion.
#[derive(Debug, Clone)]
pub struct CpalPlayer {
    device: String,
}

impl CpalPlayer {
    /// Create a player preferring output devices whose name contains `device`.
    pub fn new(device: &str) -> Self {
        Self {
            device: device.to_string(),
        }
    }

    fn build_stream(
        &self,
        device: &cpal::Device,
        samples: &[i16],
        sample_rate: u32,
        done_tx: crossbeam_channel::Sender<()>,
    ) -> Result<cpal::Stream> {
        let config = cpal::StreamConfig {
            channels: crate::defaults::PCM_CHANNELS,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            tracing::warn!("audio output stream error: {}", err);
        };

        // Try i16 first, the format the engine delivers
        let playback = Arc::new(Mutex::new(Playback {
            samples: samples.to_vec(),
            position: 0,
        }));
        let tx = done_tx.clone();
        if let Ok(stream) = device.build_output_stream(
            &config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                if let Ok(mut p) = playback.lock()
                    && p.fill(data, 0)
                    && tx.try_send(()).is_err()
                {
                    // Completion already signalled
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        // Float fallback for devices that only expose f32
        let playback = Arc::new(Mutex::new(Playback {
            samples: pcm::to_f32(samples),
            position: 0,
        }));
        device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if let Ok(mut p) = playback.lock()
                        && p.fill(data, 0.0)
                        && done_tx.try_send(()).is_err()
                    {
                        // Completion already signalled
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| VoxlateError::AudioOutput {
                message: format!("Failed to open output stream: {}", e),
            })
    }
}

impl AudioPlayer for CpalPlayer {
    fn play(&self, samples: &[i16], sample_rate: u32) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let device = find_output_device(&self.device)?;
        let (done_tx, done_rx) = bounded(1);
        let stream = self.build_stream(&device, samples, sample_rate, done_tx)?;
        stream.play().map_err(|e| VoxlateError::AudioOutput {
            message: format!("Failed to start playback: {}", e),
        })?;

        let budget = pcm::duration_of(samples.len(), sample_rate) + PLAYBACK_SLACK;
        let finished = done_rx.recv_timeout(budget).is_ok();
        drop(stream);

        if finished {
            Ok(())
        } else {
            Err(VoxlateError::AudioOutput {
                message: format!("playback did not finish within {}ms", budget.as_millis()),
            })
        }
    }

    fn name(&self) -> &str {
        "cpal"
    }
}
