//! Pluggable output backend abstraction.
//!
//! This module defines the [`AudioBackend`] trait, which decouples the
//! mixer engine from any specific hardware output API. The crate ships a
//! deterministic [`crate::mock::MockBackend`] (used by the test suite and
//! available for CI); real hardware (ALSA/CoreAudio/WASAPI, or the HDA
//! register-level path the original server spoke directly) is out of
//! scope and plugs in the same way a real backend would.
//!
//! ## Object Safety
//!
//! The trait is object-safe so a backend can be chosen at runtime and
//! stored as `Box<dyn AudioBackend>`.

use crate::Result;

/// Stable identifier for an output device, matching the wire protocol's
/// `output_id` field (spec.md §6.1). `0xffff` is reserved on the wire for
/// "the configured default output" and is never a real device's id.
pub type OutputId = u16;

/// Coarse output device category, used by the default-output selection
/// heuristic (spec.md's supplemented `SPEAKER > LINE_OUT > HEADPHONE`
/// preference order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutputKind {
    Speaker,
    LineOut,
    Headphone,
    Other,
}

/// A device as enumerated by the backend, before any stream has been
/// opened against it.
#[derive(Debug, Clone)]
pub struct OutputDescriptor {
    pub id: OutputId,
    pub kind: OutputKind,
    pub name: String,
    /// Sample rates the device advertises support for, in the order the
    /// backend prefers them.
    pub supported_rates: Vec<u32>,
    pub max_channels: u16,
}

/// Negotiated stream parameters, the result of [`AudioBackend::configure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputParams {
    pub sample_rate: u32,
    pub channels: u16,
}

/// The fixed candidate sample rates the negotiation cascade tries, in
/// order, before giving up (original `mixer_output_initialize`'s rate
/// list).
pub const CANDIDATE_SAMPLE_RATES: &[u32] =
    &[44100, 22050, 88200, 96000, 48000, 16000, 11025, 8000];

/// Negotiates the best of `wanted` that the device in `desc` supports,
/// falling back through [`CANDIDATE_SAMPLE_RATES`] and then stereo to
/// mono, mirroring the original server's output initialization cascade.
pub fn negotiate(desc: &OutputDescriptor, wanted: OutputParams) -> Option<OutputParams> {
    let channel_candidates = [wanted.channels, 1];
    for &channels in &channel_candidates {
        if channels > desc.max_channels {
            continue;
        }
        if desc.supported_rates.contains(&wanted.sample_rate) {
            return Some(OutputParams {
                sample_rate: wanted.sample_rate,
                channels,
            });
        }
        for &rate in CANDIDATE_SAMPLE_RATES {
            if desc.supported_rates.contains(&rate) {
                return Some(OutputParams {
                    sample_rate: rate,
                    channels,
                });
            }
        }
    }
    None
}

/// Selects the server's default output among `outputs`, preferring
/// speakers, then line-out, then headphones, then whatever enumerated
/// first (the original `mixer_initialize` heuristic).
pub fn select_default(outputs: &[OutputDescriptor]) -> Option<OutputId> {
    outputs
        .iter()
        .min_by_key(|o| match o.kind {
            OutputKind::Speaker => 0,
            OutputKind::LineOut => 1,
            OutputKind::Headphone => 2,
            OutputKind::Other => 3,
        })
        .map(|o| o.id)
}

/// Pluggable output backend trait.
///
/// Implementations own the actual hardware (or, for testing, a
/// deterministic simulation of it). The mixer engine drives a backend
/// purely through this interface, one call per mixer tick per device.
pub trait AudioBackend: Send + Sync {
    /// Human-readable name of this backend (e.g. `"mock"`, `"alsa"`).
    fn name(&self) -> &str;

    /// Enumerates the devices currently available.
    fn enumerate_outputs(&self) -> Result<Vec<OutputDescriptor>>;

    /// Negotiates and applies stream parameters for `id`, returning the
    /// parameters actually in effect.
    fn configure(&self, id: OutputId, wanted: OutputParams) -> Result<OutputParams>;

    /// Returns the parameters an already-configured output is running
    /// with.
    fn query(&self, id: OutputId) -> Result<OutputParams>;

    /// Queues one tick of interleaved PCM16 samples (`frames * channels`
    /// samples) for playback on `id`.
    fn queue(&self, id: OutputId, interleaved: &[i16]) -> Result<()>;

    /// Starts or stops playback on `id`. The mixer calls this with `true`
    /// on every active tick and with `false` when an output's stream
    /// arena goes idle (spec.md §4.4 "Idle").
    fn play(&self, id: OutputId, start: bool) -> Result<()>;

    /// Sets the output's hardware-level volume, normalized to `[0,1]`
    /// (spec.md §6.1: wire volumes are percentages, stored normalized).
    fn set_output_volume(&self, id: OutputId, volume: f32) -> Result<()>;
}
