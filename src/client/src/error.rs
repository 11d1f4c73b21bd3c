//! Error types for the tracing client

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Transport, TLS, and HTTP failures on the outbound path.
///
/// These are ordinary connection errors; introspection failures never
/// surface here, they degrade into sentinel trace values instead.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connect error: {0}")]
    Connect(#[from] std::io::Error),

    #[error("TLS configuration error: {0}")]
    Tls(#[from] openssl::error::ErrorStack),

    #[error("TLS handshake failed: {0}")]
    Handshake(#[from] openssl::ssl::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(#[from] http::Error),

    #[error("invalid URI: {0}")]
    InvalidUri(String),
}
