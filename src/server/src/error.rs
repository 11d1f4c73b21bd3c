//! Error types for the tracing server

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Listener, TLS, and per-connection serving failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS configuration error: {0}")]
    Tls(#[from] openssl::error::ErrorStack),

    #[error("TLS handshake failed: {0}")]
    Handshake(#[from] openssl::ssl::Error),

    #[error("connection serve error: {0}")]
    Serve(Box<dyn std::error::Error + Send + Sync>),
}
