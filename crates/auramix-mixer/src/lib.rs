//! Multi-stream PCM16 mixing engine: per-output stream arenas, the
//! stream x connection x output volume chain, and a worker thread per
//! output device.

mod device;
mod engine;
mod error;
mod volume;

pub use device::{MixerStream, OutputDevice, StreamKey};
pub use engine::{tick, ConnectionVolumes, OutputWorker};
pub use error::{Error, Result};
pub use volume::{combine, denormalize, normalize, UNITY};
