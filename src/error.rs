//! Error types module.
//!
//! This module defines the error types used throughout the netprobe crate.
//! It uses `thiserror` for structured error handling and provides
//! a custom `Result` type alias for convenience.
//!
//! The probers never abort on failure: [`ResolveError`] and [`ProbeError`]
//! travel inside their result structs, and only the scan wrappers lift them
//! into the crate-level [`Error`].

use thiserror::Error;

/// A specialized `Result` type for netprobe operations.
///
/// This type is used throughout the crate to handle errors consistently.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the netprobe crate.
///
/// Each variant represents a different category of error that can occur
/// while loading configuration or running a scan.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations, network sockets, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error (configuration files, JSON output)
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Terminal DNS resolution error surfaced by a scan wrapper
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Terminal ICMP probe error surfaced by a scan wrapper
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// HTTP client construction or request failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Network-related error (address lookup failures)
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration error (invalid config, missing files)
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new network error with a message.
    #[must_use]
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new configuration error with a message.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<color_eyre::Report> for Error {
    fn from(e: color_eyre::Report) -> Self {
        Self::Config(e.to_string())
    }
}

/// Terminal error of a DNS resolution walk.
///
/// Per-attempt variants (`Transport`, `Timeout`, `Status`) only reach the
/// caller wrapped in [`ResolveError::AllServersFailed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The domain could not be encoded as a DNS name
    #[error("invalid domain name {name}: {reason}")]
    InvalidName { name: String, reason: String },

    /// The resolver has an empty server pool
    #[error("no DNS servers configured")]
    NoServers,

    /// Socket, encoding or decoding failure talking to one server
    #[error("exchange with {server} failed: {reason}")]
    Transport { server: String, reason: String },

    /// No datagram arrived within the exchange timeout
    #[error("exchange with {server} timed out")]
    Timeout { server: String },

    /// The server answered with a non-success response code
    #[error("DNS error from {server}: {code}")]
    Status { server: String, code: String },

    /// Every server failed in every round; wraps the last failure
    #[error("all servers failed: {0}")]
    AllServersFailed(Box<ResolveError>),

    /// The CNAME walk revisited a name
    #[error("CNAME loop detected at {0}")]
    CnameLoop(String),

    /// The walk ended without any A or AAAA record
    #[error("no A/AAAA records found")]
    NoRecords,
}

/// Terminal error of an ICMP echo scan.
///
/// Lost or mismatched packets are not errors; they only show up in the
/// loss percentage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The target could not be resolved to an address of the configured family
    #[error("resolve failed: {0}")]
    Resolve(String),

    /// The ICMP socket could not be opened
    #[error("listen failed: {0}")]
    Socket(String),

    /// An echo request could not be encoded
    #[error("marshal failed: {0}")]
    Marshal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_servers_failed_display_wraps_last_error() {
        let err = ResolveError::AllServersFailed(Box::new(ResolveError::Timeout {
            server: "8.8.8.8:53".into(),
        }));
        assert_eq!(
            err.to_string(),
            "all servers failed: exchange with 8.8.8.8:53 timed out"
        );
    }

    #[test]
    fn test_crate_error_is_transparent_for_scan_errors() {
        let err: Error = ResolveError::NoRecords.into();
        assert_eq!(err.to_string(), "no A/AAAA records found");

        let err: Error = ProbeError::Socket("permission denied".into()).into();
        assert_eq!(err.to_string(), "listen failed: permission denied");
    }
}
