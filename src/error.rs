//! Crate-level error type

use std::io;
use std::net::SocketAddr;

/// Errors surfaced by route registration, configuration and the server loop.
///
/// Handler-local problems are not errors in this sense: they are recorded on
/// the request [`Context`](crate::Context) and never abort dispatch.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The listening socket could not be created or bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The listener failed in a way that is not tied to a single connection
    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),

    /// An address string could not be parsed or resolved
    #[error("invalid address: {0}")]
    Address(String),

    /// The router refused a (method, pattern) registration
    #[error("cannot register {method} {path}: {source}")]
    Route {
        method: String,
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
