//! # Outbound TLS Tracing Client
//!
//! Replaces the default connect step of an outbound HTTP request with a
//! connector that performs the transport connect and the TLS handshake
//! itself, so it holds a direct reference to the live session at the
//! moment the handshake completes. The captured [`TlsTrace`] travels with
//! the request lifecycle and becomes readable from the response.
//!
//! Two integration surfaces:
//!
//! - [`TracingClient`] drives a request end to end and attaches the trace
//!   to the response extensions, readable via [`tls_trace`];
//! - [`TracingConnector`] is a `tower::Service<Uri>` installable on
//!   `hyper-util` legacy client builders, publishing traces to a shared
//!   [`TraceLedger`].
//!
//! Plain-HTTP targets pass through untouched: no handshake, no native
//! calls, no trace.

pub mod client;
pub mod connect;
pub mod connector;
pub mod error;
pub mod stream;

pub use client::{tls_trace, TracingClient};
pub use connect::{CertificateValidator, TlsConnectOptions, TraceObserver};
pub use connector::{traced_client, TraceLedger, TracingConnector};
pub use error::{ClientError, Result};
pub use pqtrace_inspect::TlsTrace;
pub use stream::MaybeTlsStream;
