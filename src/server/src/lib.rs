//! # Inbound TLS Tracing Server
//!
//! Registers a handshake-completion hook on a TLS listener and carries
//! the captured negotiation trace from the connection to the response.
//! The hook exists to observe, not to gate: its default decision accepts
//! every handshake, and a capture failure never tears a connection down.
//!
//! Propagation path: handshake completes → [`capture`] builds the trace →
//! the connection's [`ConnectionItems`] bag holds the `TlsCipher` and
//! `TlsGroup` items → the [`tls_trace_headers`] middleware injects the
//! `x-tls-cipher` / `x-tls-group` response headers once per request. The
//! middleware is a no-op on connections without a captured trace.
//!
//! [`capture`]: pqtrace_inspect::capture

pub mod error;
pub mod headers;
pub mod hook;
pub mod items;
pub mod server;

pub use error::{Result, ServerError};
pub use headers::{tls_trace_headers, X_TLS_CIPHER, X_TLS_GROUP};
pub use hook::TraceHook;
pub use items::{ConnectionItems, TLS_CIPHER_ITEM, TLS_GROUP_ITEM};
pub use pqtrace_inspect::TlsTrace;
pub use server::{serve_with_hook, tls_acceptor, TlsServer, TlsServerConfig};
