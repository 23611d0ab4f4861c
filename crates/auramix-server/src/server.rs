//! Server bootstrap: backend enumeration, output negotiation, mixer
//! worker startup, and the connection accept loop.

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

#[cfg(unix)]
use std::os::unix::net::UnixListener;

use tracing::info;

use auramix_backend::{select_default, AudioBackend, OutputParams};
use auramix_mixer::{OutputDevice, OutputWorker};
use auramix_proto::Endpoint;

use crate::dispatcher;
use crate::state::{OutputTable, ServerState};

/// The desired format every output is negotiated toward at startup.
const PREFERRED_PARAMS: OutputParams = OutputParams {
    sample_rate: 48000,
    channels: 2,
};

/// Builds the output table and spawns one mixer worker thread per
/// device, negotiating each device's stream parameters against
/// [`PREFERRED_PARAMS`].
pub fn bring_up_outputs(
    backend: Arc<dyn AudioBackend>,
    connection_volumes: Arc<dyn auramix_mixer::ConnectionVolumes>,
    preferred_default: Option<u16>,
) -> anyhow::Result<(OutputTable, Vec<OutputWorker>)> {
    let descriptors = backend.enumerate_outputs()?;
    let default_output = preferred_default
        .filter(|id| descriptors.iter().any(|d| d.id == *id))
        .or_else(|| select_default(&descriptors))
        .ok_or_else(|| anyhow::anyhow!("backend enumerated no output devices"))?;

    let mut devices = HashMap::new();
    let mut descriptor_map = HashMap::new();
    let mut workers = Vec::new();

    for descriptor in descriptors {
        let params = backend.configure(descriptor.id, PREFERRED_PARAMS)?;
        let device = Arc::new(OutputDevice::new(descriptor.id, params));
        workers.push(OutputWorker::spawn(
            device.clone(),
            connection_volumes.clone(),
            backend.clone(),
        ));
        devices.insert(descriptor.id, device);
        descriptor_map.insert(descriptor.id, descriptor);
    }

    Ok((
        OutputTable::new(devices, descriptor_map, default_output),
        workers,
    ))
}

/// Runs the server's accept loop on `endpoint` until the process exits.
/// Each accepted connection is handled on its own thread; this call
/// blocks forever (or until the listener errors).
pub fn serve(endpoint: Endpoint, state: Arc<ServerState>) -> anyhow::Result<()> {
    match endpoint {
        Endpoint::Tcp(addr) => {
            let listener = TcpListener::bind(addr)?;
            info!(%addr, "listening");
            for conn in listener.incoming() {
                let stream = match conn {
                    Ok(s) => s,
                    Err(err) => {
                        tracing::warn!(%err, "failed to accept connection");
                        continue;
                    }
                };
                let state = state.clone();
                thread::spawn(move || dispatcher::run_connection(state, stream));
            }
            Ok(())
        }
        #[cfg(unix)]
        Endpoint::Unix(path) => {
            let _ = std::fs::remove_file(&path);
            let listener = UnixListener::bind(&path)?;
            info!(path, "listening");
            for conn in listener.incoming() {
                let stream = match conn {
                    Ok(s) => s,
                    Err(err) => {
                        tracing::warn!(%err, "failed to accept connection");
                        continue;
                    }
                };
                let state = state.clone();
                thread::spawn(move || dispatcher::run_connection(state, stream));
            }
            Ok(())
        }
        #[cfg(not(unix))]
        Endpoint::Unix(_) => anyhow::bail!("unix sockets are not supported on this platform"),
    }
}
