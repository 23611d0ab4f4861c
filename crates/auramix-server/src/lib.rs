//! Multi-client real-time audio mixing server: connection handling,
//! request dispatch, and process bootstrap.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use config::Cli;
pub use error::{Error, Result};
pub use state::ServerState;
