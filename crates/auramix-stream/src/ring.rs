//! Per-stream ring buffer (spec.md §4.3): a single producer (the
//! connection's `DATA` handler, after decode/resample) pushes samples,
//! blocking if the ring is full; a single consumer (the owning output's
//! mixer tick) drains whatever is available without ever blocking,
//! padding a short read with silence.

use parking_lot::{Condvar, Mutex};

struct Inner {
    buf: Vec<i16>,
    head: usize,
    len: usize,
}

/// A fixed-capacity single-producer single-consumer sample ring.
pub struct StreamRing {
    capacity: usize,
    state: Mutex<Inner>,
    room_available: Condvar,
}

impl StreamRing {
    /// Creates a ring holding up to `capacity` interleaved PCM16 samples.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be positive");
        Self {
            capacity,
            state: Mutex::new(Inner {
                buf: vec![0; capacity],
                head: 0,
                len: 0,
            }),
            room_available: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples currently buffered and not yet consumed.
    pub fn len(&self) -> usize {
        self.state.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pushes `samples`, blocking while the ring has no room. Samples are
    /// pushed incrementally as space frees up, so a push larger than the
    /// ring's capacity still succeeds once the consumer has drained
    /// enough of it.
    pub fn push(&self, samples: &[i16]) {
        let mut offset = 0;
        let mut state = self.state.lock();
        while offset < samples.len() {
            while state.len == self.capacity {
                self.room_available.wait(&mut state);
            }
            let space = self.capacity - state.len;
            let n = space.min(samples.len() - offset);
            for i in 0..n {
                let idx = (state.head + state.len) % self.capacity;
                state.buf[idx] = samples[offset + i];
                state.len += 1;
            }
            offset += n;
        }
    }

    /// Fills `out` with up to `out.len()` buffered samples without
    /// blocking. Any shortfall (the ring ran dry) is padded with silence.
    /// Returns the number of real (non-padded) samples written. Once the
    /// ring is fully drained its head index resets to zero, so a stalled
    /// producer resuming later starts writing from a clean layout rather
    /// than wrapping around stale data.
    pub fn pop_into(&self, out: &mut [i16]) -> usize {
        let mut state = self.state.lock();
        let n = state.len.min(out.len());
        for slot in out.iter_mut().take(n) {
            *slot = state.buf[state.head];
            state.head = (state.head + 1) % self.capacity;
            state.len -= 1;
        }
        for slot in out.iter_mut().skip(n) {
            *slot = 0;
        }
        if state.len == 0 {
            state.head = 0;
        }
        if n > 0 {
            self.room_available.notify_one();
        }
        n
    }
}
