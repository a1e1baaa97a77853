//! Error types for the Phalanx webhook

use thiserror::Error;

/// Main error type for Phalanx operations
///
/// Errors are never retried inside the webhook: admission review is a
/// synchronous request/response exchange, so retry policy belongs to the
/// API server calling us. Every failure is mapped to a definite response.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Merge failure, e.g. a template field of a kind incompatible with the pod
    #[error("merge error: {0}")]
    Merge(String),

    /// Serialization failure while encoding objects or patches
    #[error("encode error: {0}")]
    Encode(String),

    /// Malformed admission request rejected before the review pipeline runs
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid mutation configuration, fatal at startup
    #[error("configuration error: {0}")]
    Config(String),

    /// TLS certificate or key failure
    #[error("TLS error: {0}")]
    Tls(String),

    /// Listener failure on one of the HTTP servers
    #[error("server error: {0}")]
    Serve(String),
}

impl Error {
    /// Create a merge error with the given message
    pub fn merge(msg: impl Into<String>) -> Self {
        Self::Merge(msg.into())
    }

    /// Create an encode error with the given message
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Create an invalid-request error with the given message
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a TLS error with the given message
    pub fn tls(msg: impl Into<String>) -> Self {
        Self::Tls(msg.into())
    }

    /// Create a server error with the given message
    pub fn serve(msg: impl Into<String>) -> Self {
        Self::Serve(msg.into())
    }
}
