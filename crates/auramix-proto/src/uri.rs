//! Endpoint URI parsing (spec.md §6.2/§6.3): `tcp:<host>:<port>` or
//! `unix:<path>`, resolved from an explicit CLI flag, the `AUD_DISPLAY`
//! environment variable, or a built-in default, in that order of
//! precedence.

use std::env;
use std::net::SocketAddr;

use crate::error::{Error, Result};

/// Name of the environment variable clients and the server consult when
/// no endpoint is given explicitly.
pub const DISPLAY_ENV_VAR: &str = "AUD_DISPLAY";

/// Default endpoint when neither a flag nor `AUD_DISPLAY` is set.
pub const DEFAULT_ENDPOINT: &str = "tcp:0.0.0.0:44630";

/// A parsed connection endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp(SocketAddr),
    Unix(String),
}

impl Endpoint {
    /// Parses a `tcp:host:port` or `unix:path` URI.
    pub fn parse(uri: &str) -> Result<Self> {
        if let Some(rest) = uri.strip_prefix("tcp:") {
            let addr = rest
                .parse::<SocketAddr>()
                .map_err(|_| Error::BadUri(uri.to_string()))?;
            Ok(Endpoint::Tcp(addr))
        } else if let Some(rest) = uri.strip_prefix("unix:") {
            if rest.is_empty() {
                return Err(Error::BadUri(uri.to_string()));
            }
            Ok(Endpoint::Unix(rest.to_string()))
        } else {
            Err(Error::BadUri(uri.to_string()))
        }
    }

    /// Resolves the endpoint to connect to / listen on, following the
    /// flag > `AUD_DISPLAY` > default precedence.
    pub fn resolve(flag: Option<&str>) -> Result<Self> {
        if let Some(uri) = flag {
            return Self::parse(uri);
        }
        if let Ok(uri) = env::var(DISPLAY_ENV_VAR) {
            return Self::parse(&uri);
        }
        Self::parse(DEFAULT_ENDPOINT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tcp() {
        let ep = Endpoint::parse("tcp:127.0.0.1:44630").unwrap();
        assert_eq!(ep, Endpoint::Tcp("127.0.0.1:44630".parse().unwrap()));
    }

    #[test]
    fn parses_unix() {
        let ep = Endpoint::parse("unix:/tmp/auramix/sock").unwrap();
        assert_eq!(ep, Endpoint::Unix("/tmp/auramix/sock".to_string()));
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(Endpoint::parse("foo:bar").is_err());
    }

    #[test]
    fn rejects_empty_unix_path() {
        assert!(Endpoint::parse("unix:").is_err());
    }

    #[test]
    fn flag_takes_precedence_over_default() {
        let ep = Endpoint::resolve(Some("tcp:1.2.3.4:9")).unwrap();
        assert_eq!(ep, Endpoint::Tcp("1.2.3.4:9".parse().unwrap()));
    }
}
