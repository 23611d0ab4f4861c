//! Per-output mixer tick and worker loop.
//!
//! Each output runs its own thread producing one second of interleaved
//! PCM16 per tick (spec.md §4.4): for every output frame, concatenate
//! every live stream's own-channel samples (normalized, gain-scaled)
//! into a scratch array, then reduce that concatenation down to the
//! device's channel count. A device with no live streams stops backend
//! playback and blocks on its streams condition variable until one is
//! added.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use auramix_backend::AudioBackend;
use tracing::{debug, warn};

use crate::device::OutputDevice;
use crate::error::Result;
use crate::volume::{combine, denormalize, normalize};

/// Supplies a stream's owning connection's current volume. Implemented
/// by the connection table in `auramix-server`; kept as a trait here so
/// the mixer has no dependency on the server's connection bookkeeping.
pub trait ConnectionVolumes: Send + Sync {
    fn volume_for(&self, connection_id: u32) -> f32;
}

/// Reduces one frame's concatenated per-stream scratch samples
/// (`scratch`, `total_input_channels` wide) down to `device_channels`
/// samples, per spec.md §4.4 step 7.
fn reduce_channels(scratch: &[f32], device_channels: usize, out: &mut [f32]) {
    let total_input_channels = scratch.len();
    if total_input_channels <= device_channels {
        for (c, slot) in out.iter_mut().enumerate() {
            *slot = scratch[c % total_input_channels];
        }
    } else {
        for (c, slot) in out.iter_mut().enumerate() {
            let start = c * total_input_channels / device_channels;
            let end = ((c + 1) * total_input_channels / device_channels).max(start + 1);
            let mean: f32 = scratch[start..end].iter().sum::<f32>() / (end - start) as f32;
            *slot = mean.clamp(-1.0, 1.0);
        }
    }
}

/// Mixes one second of audio for `device` and hands it to `backend`.
pub fn tick(
    device: &OutputDevice,
    connection_volumes: &dyn ConnectionVolumes,
    backend: &dyn AudioBackend,
) -> Result<()> {
    let frames = device.params.sample_rate as usize;
    let device_channels = device.params.channels as usize;
    let output_gain = device.volume();

    let streams = device.streams_snapshot();
    let total_input_channels: usize = streams.iter().map(|s| s.channels as usize).sum();

    let mut pcm = vec![0i16; frames * device_channels];

    if total_input_channels > 0 {
        let mut scratch = vec![0f32; total_input_channels];
        let mut reduced = vec![0f32; device_channels];
        let mut frame_buf: Vec<i16> = Vec::new();

        for frame in 0..frames {
            let mut offset = 0;
            for stream in &streams {
                let channels = stream.channels as usize;
                frame_buf.clear();
                frame_buf.resize(channels, 0);
                stream.ring.pop_into(&mut frame_buf);
                let gain = combine(
                    stream.volume(),
                    connection_volumes.volume_for(stream.connection_id),
                    output_gain,
                );
                for &sample in &frame_buf {
                    scratch[offset] = normalize(sample) * gain;
                    offset += 1;
                }
            }

            reduce_channels(&scratch, device_channels, &mut reduced);
            let base = frame * device_channels;
            for (c, &value) in reduced.iter().enumerate() {
                pcm[base + c] = denormalize(value);
            }
        }
    }

    backend.queue(device.id, &pcm)?;
    Ok(())
}

/// Owns the worker thread for one output device.
pub struct OutputWorker {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl OutputWorker {
    /// Spawns a thread that ticks `device` once per second while it has
    /// live streams, idling (backend playback stopped) otherwise.
    pub fn spawn(
        device: Arc<OutputDevice>,
        connection_volumes: Arc<dyn ConnectionVolumes>,
        backend: Arc<dyn AudioBackend>,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let worker_running = running.clone();
        let handle = thread::spawn(move || {
            debug!(output_id = device.id, "mixer worker starting");
            while worker_running.load(Ordering::Relaxed) {
                if device.stream_count() == 0 {
                    if let Err(err) = backend.play(device.id, false) {
                        warn!(output_id = device.id, %err, "failed to stop playback");
                    }
                    device.wait_for_stream(Duration::from_secs(1));
                    continue;
                }
                if let Err(err) = backend.play(device.id, true) {
                    warn!(output_id = device.id, %err, "failed to start playback");
                }
                if let Err(err) = tick(&device, connection_volumes.as_ref(), backend.as_ref()) {
                    warn!(output_id = device.id, %err, "mixer tick failed");
                }
                thread::sleep(Duration::from_secs(1));
            }
            debug!(output_id = device.id, "mixer worker stopped");
        });
        Self {
            handle: Some(handle),
            running,
        }
    }

    /// Signals the worker to stop and waits for it to exit.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for OutputWorker {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auramix_backend::{mock::MockBackend, AudioBackend as _, OutputParams};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FixedVolumes(Mutex<HashMap<u32, f32>>);

    impl ConnectionVolumes for FixedVolumes {
        fn volume_for(&self, connection_id: u32) -> f32 {
            *self.0.lock().unwrap().get(&connection_id).unwrap_or(&crate::volume::UNITY)
        }
    }

    #[test]
    fn silent_device_ticks_to_zeroed_buffer() {
        let backend = MockBackend::with_default_devices();
        backend
            .configure(
                0,
                OutputParams {
                    sample_rate: 48000,
                    channels: 2,
                },
            )
            .unwrap();
        let device = OutputDevice::new(
            0,
            OutputParams {
                sample_rate: 48000,
                channels: 2,
            },
        );
        let volumes = FixedVolumes(Mutex::new(HashMap::new()));
        tick(&device, &volumes, &backend).unwrap();
        let history = backend.history(0).unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].iter().all(|&s| s == 0));
    }

    #[test]
    fn stream_volume_scales_output() {
        let backend = MockBackend::with_default_devices();
        backend
            .configure(
                0,
                OutputParams {
                    sample_rate: 48000,
                    channels: 1,
                },
            )
            .unwrap();
        let device = OutputDevice::new(
            0,
            OutputParams {
                sample_rate: 48000,
                channels: 1,
            },
        );
        let ring = Arc::new(auramix_stream::StreamRing::new(48000 * 2));
        ring.push(&vec![10_000i16; 48000]);
        let key = device.add_stream(1, ring, 1);
        device.stream(key).unwrap().set_volume(0.5);

        let volumes = FixedVolumes(Mutex::new(HashMap::new()));
        tick(&device, &volumes, &backend).unwrap();
        let history = backend.history(0).unwrap();
        // normalize(10_000) * 0.5, denormalized back: half the gain, half
        // of the asymmetric normalization the mixer reproduces bit-exactly.
        let expected = denormalize(normalize(10_000) * 0.5);
        assert_eq!(history[0][0], expected);
    }

    #[test]
    fn single_stream_with_fewer_channels_than_device_is_not_summed_into_every_channel() {
        // One mono stream feeding a stereo device: per spec.md §4.4 step
        // 7, each output channel wraps to scratch[c % 1], i.e. the same
        // single value -- not a sum across (nonexistent) other streams.
        let backend = MockBackend::with_default_devices();
        backend
            .configure(
                0,
                OutputParams {
                    sample_rate: 48000,
                    channels: 2,
                },
            )
            .unwrap();
        let device = OutputDevice::new(
            0,
            OutputParams {
                sample_rate: 48000,
                channels: 2,
            },
        );
        let ring = Arc::new(auramix_stream::StreamRing::new(48000 * 2));
        ring.push(&vec![10_000i16; 48000]);
        device.add_stream(1, ring, 1);

        let volumes = FixedVolumes(Mutex::new(HashMap::new()));
        tick(&device, &volumes, &backend).unwrap();
        let history = backend.history(0).unwrap();
        let expected = denormalize(normalize(10_000));
        assert_eq!(history[0][0], expected);
        assert_eq!(history[0][1], expected);
    }
}
