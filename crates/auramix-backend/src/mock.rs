//! Deterministic mock backend, standing in for real hardware in tests and
//! CI (the role `sonido-io`'s docs reserve for a "Testing: Deterministic
//! mock backend" — here it is the only backend, since real hardware
//! output is out of scope).

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::backend::{negotiate, AudioBackend, OutputDescriptor, OutputId, OutputKind, OutputParams};
use crate::error::Error;
use crate::Result;

struct DeviceState {
    desc: OutputDescriptor,
    params: Option<OutputParams>,
    volume: f32,
    playing: bool,
    /// Every tick ever queued, kept for test assertions.
    history: Vec<Vec<i16>>,
}

/// A backend with a fixed, in-memory set of devices. Queued samples are
/// recorded rather than played, so tests can assert exactly what the
/// mixer produced.
pub struct MockBackend {
    devices: Mutex<HashMap<OutputId, DeviceState>>,
}

impl MockBackend {
    /// Builds a backend with the conventional three-device layout
    /// (speaker, line-out, headphone) used by the test suite.
    pub fn with_default_devices() -> Self {
        Self::new(vec![
            OutputDescriptor {
                id: 0,
                kind: OutputKind::Speaker,
                name: "Mock Speaker".into(),
                supported_rates: vec![48000, 44100],
                max_channels: 2,
            },
            OutputDescriptor {
                id: 1,
                kind: OutputKind::LineOut,
                name: "Mock Line Out".into(),
                supported_rates: vec![48000],
                max_channels: 2,
            },
            OutputDescriptor {
                id: 2,
                kind: OutputKind::Headphone,
                name: "Mock Headphone".into(),
                supported_rates: vec![44100],
                max_channels: 2,
            },
        ])
    }

    pub fn new(descriptors: Vec<OutputDescriptor>) -> Self {
        let devices = descriptors
            .into_iter()
            .map(|desc| {
                (
                    desc.id,
                    DeviceState {
                        desc,
                        params: None,
                        volume: 1.0,
                        playing: false,
                        history: Vec::new(),
                    },
                )
            })
            .collect::<HashMap<_, _>>();
        Self {
            devices: Mutex::new(devices),
        }
    }

    /// Returns every tick ever queued for `id`, in queue order.
    pub fn history(&self, id: OutputId) -> Result<Vec<Vec<i16>>> {
        let devices = self.devices.lock();
        let state = devices.get(&id).ok_or(Error::NoSuchOutput(id))?;
        Ok(state.history.clone())
    }

    pub fn is_playing(&self, id: OutputId) -> Result<bool> {
        let devices = self.devices.lock();
        let state = devices.get(&id).ok_or(Error::NoSuchOutput(id))?;
        Ok(state.playing)
    }
}

impl AudioBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn enumerate_outputs(&self) -> Result<Vec<OutputDescriptor>> {
        Ok(self
            .devices
            .lock()
            .values()
            .map(|s| s.desc.clone())
            .collect())
    }

    fn configure(&self, id: OutputId, wanted: OutputParams) -> Result<OutputParams> {
        let mut devices = self.devices.lock();
        let state = devices.get_mut(&id).ok_or(Error::NoSuchOutput(id))?;
        let negotiated = negotiate(&state.desc, wanted).ok_or(Error::NegotiationFailed(id))?;
        state.params = Some(negotiated);
        Ok(negotiated)
    }

    fn query(&self, id: OutputId) -> Result<OutputParams> {
        let devices = self.devices.lock();
        let state = devices.get(&id).ok_or(Error::NoSuchOutput(id))?;
        state.params.ok_or(Error::NegotiationFailed(id))
    }

    fn queue(&self, id: OutputId, interleaved: &[i16]) -> Result<()> {
        let mut devices = self.devices.lock();
        let state = devices.get_mut(&id).ok_or(Error::NoSuchOutput(id))?;
        state.history.push(interleaved.to_vec());
        Ok(())
    }

    fn play(&self, id: OutputId, start: bool) -> Result<()> {
        let mut devices = self.devices.lock();
        let state = devices.get_mut(&id).ok_or(Error::NoSuchOutput(id))?;
        state.playing = start;
        Ok(())
    }

    fn set_output_volume(&self, id: OutputId, volume: f32) -> Result<()> {
        let mut devices = self.devices.lock();
        let state = devices.get_mut(&id).ok_or(Error::NoSuchOutput(id))?;
        state.volume = volume;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_device_selection_prefers_speaker() {
        let backend = MockBackend::with_default_devices();
        let outputs = backend.enumerate_outputs().unwrap();
        let default_id = crate::backend::select_default(&outputs).unwrap();
        assert_eq!(default_id, 0);
    }

    #[test]
    fn configure_negotiates_supported_rate() {
        let backend = MockBackend::with_default_devices();
        let params = backend
            .configure(
                2,
                OutputParams {
                    sample_rate: 48000,
                    channels: 2,
                },
            )
            .unwrap();
        // Device 2 only supports 44100, so the cascade should fall back to it.
        assert_eq!(params.sample_rate, 44100);
        assert_eq!(params.channels, 2);
    }

    #[test]
    fn queue_records_history_in_order() {
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
        backend.queue(0, &[1, 2, 3, 4]).unwrap();
        backend.queue(0, &[5, 6, 7, 8]).unwrap();
        assert_eq!(backend.history(0).unwrap(), vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8]]);
    }

    #[test]
    fn unknown_output_is_an_error() {
        let backend = MockBackend::with_default_devices();
        assert!(matches!(
            backend.query(99),
            Err(Error::NoSuchOutput(99))
        ));
    }
}
