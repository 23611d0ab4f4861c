//! Per-output device state: the negotiated stream parameters, the
//! output-level volume, and the arena of streams currently routed to it.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use auramix_backend::{OutputId, OutputParams};
use auramix_stream::StreamRing;
use parking_lot::{Condvar, Mutex};
use slotmap::{new_key_type, SlotMap};

use crate::volume::UNITY;

new_key_type! {
    /// Stable handle to a stream mixed into some output. Survives the
    /// stream's position in the arena changing; the wire-level stream id
    /// a client sees is this key encoded as a `u16`.
    pub struct StreamKey;
}

fn load_volume(cell: &AtomicU32) -> f32 {
    f32::from_bits(cell.load(Ordering::Relaxed))
}

fn store_volume(cell: &AtomicU32, volume: f32) {
    cell.store(volume.to_bits(), Ordering::Relaxed);
}

/// One stream routed into an output's mix.
pub struct MixerStream {
    pub connection_id: u32,
    pub ring: Arc<StreamRing>,
    /// The stream's own (source) channel count, distinct from the
    /// device's channel count. Channel reduction happens at mix time, so
    /// the mixer needs each stream's native layout on hand.
    pub channels: u16,
    volume: AtomicU32,
}

impl MixerStream {
    pub fn new(connection_id: u32, ring: Arc<StreamRing>, channels: u16) -> Self {
        Self {
            connection_id,
            ring,
            channels,
            volume: AtomicU32::new(UNITY.to_bits()),
        }
    }

    pub fn volume(&self) -> f32 {
        load_volume(&self.volume)
    }

    pub fn set_volume(&self, volume: f32) {
        store_volume(&self.volume, volume);
    }
}

/// An output device as seen by the mixer: its negotiated format, its own
/// volume, and the streams currently feeding it.
pub struct OutputDevice {
    pub id: OutputId,
    pub params: OutputParams,
    volume: AtomicU32,
    streams: Mutex<SlotMap<StreamKey, Arc<MixerStream>>>,
    /// Signaled whenever the stream arena goes from empty to non-empty,
    /// waking the worker from its idle wait (spec.md §4.4 "Idle").
    streams_added: Condvar,
}

impl OutputDevice {
    pub fn new(id: OutputId, params: OutputParams) -> Self {
        Self {
            id,
            params,
            volume: AtomicU32::new(UNITY.to_bits()),
            streams: Mutex::new(SlotMap::with_key()),
            streams_added: Condvar::new(),
        }
    }

    pub fn volume(&self) -> f32 {
        load_volume(&self.volume)
    }

    pub fn set_volume(&self, volume: f32) {
        store_volume(&self.volume, volume);
    }

    pub fn add_stream(&self, connection_id: u32, ring: Arc<StreamRing>, channels: u16) -> StreamKey {
        let mut streams = self.streams.lock();
        let was_empty = streams.is_empty();
        let key = streams.insert(Arc::new(MixerStream::new(connection_id, ring, channels)));
        if was_empty {
            self.streams_added.notify_all();
        }
        key
    }

    pub fn remove_stream(&self, key: StreamKey) -> Option<Arc<MixerStream>> {
        self.streams.lock().remove(key)
    }

    pub fn stream(&self, key: StreamKey) -> Option<Arc<MixerStream>> {
        self.streams.lock().get(key).cloned()
    }

    pub fn stream_count(&self) -> usize {
        self.streams.lock().len()
    }

    /// Snapshots every stream currently routed here, for a mixer tick.
    pub fn streams_snapshot(&self) -> Vec<Arc<MixerStream>> {
        self.streams.lock().values().cloned().collect()
    }

    /// Blocks until a stream is added or `timeout` elapses, whichever
    /// comes first — the worker re-checks its stop flag on every wake so
    /// a spurious or timed-out wait never stalls shutdown.
    pub fn wait_for_stream(&self, timeout: std::time::Duration) {
        let mut streams = self.streams.lock();
        if !streams.is_empty() {
            return;
        }
        self.streams_added.wait_for(&mut streams, timeout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_remove_stream_roundtrips() {
        let device = OutputDevice::new(
            0,
            OutputParams {
                sample_rate: 48000,
                channels: 2,
            },
        );
        let ring = Arc::new(StreamRing::new(16));
        let key = device.add_stream(1, ring, 2);
        assert_eq!(device.stream_count(), 1);
        assert!(device.remove_stream(key).is_some());
        assert_eq!(device.stream_count(), 0);
    }

    #[test]
    fn volume_roundtrips_through_bit_cast_storage() {
        let device = OutputDevice::new(
            0,
            OutputParams {
                sample_rate: 48000,
                channels: 2,
            },
        );
        device.set_volume(0.25);
        assert_eq!(device.volume(), 0.25);
    }
}
