//! Error types for the recommendation engine.

use thiserror::Error;

/// Errors that can occur while building a recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A socket referenced a transport that is not registered.
    #[error("Unable to find transport {0}")]
    TransportNotFound(String),

    /// A probe result arrived without an originating transport.
    #[error("Probe result for {hostname}:{port} has no transport")]
    MissingTransport {
        /// Probed hostname.
        hostname: String,
        /// Probed port.
        port: u16,
    },

    /// A probe result carried a port outside 1-65535.
    #[error("Invalid port {port} for {hostname}")]
    InvalidPort {
        /// Probed hostname.
        hostname: String,
        /// Rejected port value.
        port: u16,
    },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
