//! Pluggable hardware output abstraction for the auramix mixer engine.
//!
//! The [`AudioBackend`] trait decouples the mixer from any particular
//! output API; [`mock::MockBackend`] is the only implementation shipped
//! here, real hardware playback being out of scope.

mod backend;
mod error;
pub mod mock;

pub use backend::{
    negotiate, select_default, AudioBackend, OutputDescriptor, OutputId, OutputKind, OutputParams,
    CANDIDATE_SAMPLE_RATES,
};
pub use error::{Error, Result};
