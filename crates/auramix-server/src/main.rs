use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use auramix_backend::mock::MockBackend;
use auramix_backend::AudioBackend;
use auramix_mixer::ConnectionVolumes;
use auramix_server::state::{ConnectionTable, ServerState};
use auramix_server::{server, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&cli.log_filter))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let endpoint = cli.resolve_endpoint()?;

    // Real hardware output is out of scope; the deterministic mock
    // backend stands in, matching the testing role `sonido-io` reserves
    // for one.
    let backend: Arc<dyn AudioBackend> = Arc::new(MockBackend::with_default_devices());

    let connections = Arc::new(ConnectionTable::new());
    let connection_volumes: Arc<dyn ConnectionVolumes> = connections.clone();

    let (outputs, _workers) =
        server::bring_up_outputs(backend, connection_volumes, cli.default_output)?;

    let state = Arc::new(ServerState::with_connections(
        connections,
        outputs,
        cli.buffer_seconds,
    ));

    server::serve(endpoint, state)
}
