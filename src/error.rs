//! Error types for scalewatch

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used by the configuration and gateway entry points.
pub type Result<T> = std::result::Result<T, Error>;

/// The reading source could not be reached or subscribed to.
///
/// Fatal to `ScaleSession::start` and to gateway start-up; never raised
/// for an individual message.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("No network adapters with an IPv4 address in the system!")]
    NoIpv4Address,

    #[error("failed to resolve broker host {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("broker host {host} has no IPv4 address")]
    Unresolved { host: String },

    #[error("broker is closed")]
    BrokerClosed,

    #[error("no async runtime available to drive the subscription")]
    NoRuntime,

    #[error("failed to bind gateway on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// A payload could not be turned into a reading. The payload is dropped.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("payload is not a valid reading record: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("weight {0:?} is not a number")]
    NotANumber(String),

    #[error("weight {0} is not finite")]
    NonFinite(f64),
}

/// Configuration could not be loaded or is inconsistent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Umbrella error for binaries and the gateway.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
