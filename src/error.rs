//! Error types for the proxy.

use thiserror::Error;

/// Result type alias for proxy operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running either hop.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration; the process refuses to start
    #[error("configuration error: {0}")]
    Config(String),

    /// Shared secret has the wrong length; the process refuses to start
    #[error("invalid key size: expected {expected} bytes, got {actual}")]
    KeySize {
        /// Required secret length
        expected: usize,
        /// Length actually supplied
        actual: usize,
    },

    /// A SOCKS5 wire address could not be decoded
    #[error("malformed address: {0}")]
    MalformedAddress(String),

    /// The client violated the SOCKS5 handshake
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The single outbound connect attempt failed
    #[error("outbound connect failed: {0}")]
    Connect(#[source] std::io::Error),

    /// The peer closed the connection; normal session termination
    #[error("connection closed by peer")]
    Closed,

    /// Network I/O error
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a new malformed-address error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedAddress(msg.into())
    }

    /// Create a new protocol-violation error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    /// Check whether this error is a normal end-of-session signal
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Closed)
    }

    /// Check whether this error is fatal at startup (the process must not run)
    pub fn is_startup_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::KeySize { .. })
    }
}
