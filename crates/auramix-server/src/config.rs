//! Server configuration: a single `clap::Parser` struct, following
//! flag > `AUD_DISPLAY` > built-in default precedence for the listen
//! endpoint (spec.md §6.3).

use clap::Parser;

use auramix_proto::Endpoint;

/// Real-time audio mixing server.
#[derive(Debug, Parser)]
#[command(name = "auramixd", version, about)]
pub struct Cli {
    /// Endpoint to listen on (`tcp:host:port` or `unix:path`). Falls back
    /// to the `AUD_DISPLAY` environment variable, then
    /// `tcp:0.0.0.0:44630`.
    #[arg(long)]
    pub listen: Option<String>,

    /// Per-stream ring buffer capacity, in seconds of audio.
    #[arg(long, default_value_t = 2)]
    pub buffer_seconds: u32,

    /// Output device id to prefer as the default, overriding the
    /// speaker > line-out > headphone selection heuristic.
    #[arg(long)]
    pub default_output: Option<u16>,

    /// Log filter, passed straight through to
    /// `tracing_subscriber::EnvFilter` (e.g. `info`, `auramix_server=debug`).
    /// `RUST_LOG`, if set, takes precedence over this flag.
    #[arg(long, default_value = "info")]
    pub log_filter: String,
}

impl Cli {
    pub fn resolve_endpoint(&self) -> auramix_proto::Result<Endpoint> {
        Endpoint::resolve(self.listen.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cli = Cli::parse_from(["auramixd"]);
        assert_eq!(cli.buffer_seconds, 2);
        assert_eq!(cli.listen, None);
        assert_eq!(cli.log_filter, "info");
    }
}
