//! Tower connector for hyper-util client builders
//!
//! Installs the tracing connect step on a pooled `hyper-util` legacy
//! client. Pooled connections outlive individual requests, so traces are
//! published per authority into a shared [`TraceLedger`] (and to the
//! observer callback) instead of hanging off a single response.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::Uri;
use http_body_util::Full;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioIo};
use parking_lot::RwLock;
use tower::Service;

use pqtrace_inspect::TlsTrace;

use crate::connect::{self, TlsConnectOptions};
use crate::error::ClientError;
use crate::stream::MaybeTlsStream;

/// Last captured trace per authority (`host:port`).
///
/// Connection-pool reuse means not every request triggers a handshake;
/// the ledger always answers with the trace of the most recent handshake
/// to that authority.
#[derive(Clone, Default)]
pub struct TraceLedger {
    inner: Arc<RwLock<HashMap<String, TlsTrace>>>,
}

impl TraceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, authority: &str, trace: TlsTrace) {
        self.inner.write().insert(authority.to_owned(), trace);
    }

    /// Trace of the most recent handshake to `authority`, if any.
    pub fn trace_for(&self, authority: &str) -> Option<TlsTrace> {
        self.inner.read().get(authority).cloned()
    }
}

/// Connect-step replacement for `hyper-util` legacy client builders.
#[derive(Clone)]
pub struct TracingConnector {
    options: TlsConnectOptions,
    ledger: TraceLedger,
}

impl TracingConnector {
    pub fn new(options: TlsConnectOptions) -> Self {
        Self {
            options,
            ledger: TraceLedger::new(),
        }
    }

    /// The ledger this connector publishes captured traces into.
    pub fn ledger(&self) -> TraceLedger {
        self.ledger.clone()
    }
}

impl Service<Uri> for TracingConnector {
    type Response = TokioIo<MaybeTlsStream>;
    type Error = ClientError;
    type Future =
        Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, dst: Uri) -> Self::Future {
        let options = self.options.clone();
        let ledger = self.ledger.clone();
        Box::pin(async move {
            let host = dst
                .host()
                .ok_or_else(|| ClientError::InvalidUri(dst.to_string()))?
                .to_owned();
            let secure = dst.scheme_str() == Some("https");
            let port = dst.port_u16().unwrap_or(if secure { 443 } else { 80 });

            let (stream, trace) = connect::connect(&host, port, secure, &options).await?;
            if let Some(trace) = trace {
                let authority = dst
                    .authority()
                    .map(|authority| authority.as_str().to_owned())
                    .unwrap_or(host);
                ledger.record(&authority, trace);
            }
            Ok(TokioIo::new(stream))
        })
    }
}

/// Build a pooled client with the tracing connector installed, returning
/// the ledger alongside it.
pub fn traced_client(
    options: TlsConnectOptions,
) -> (Client<TracingConnector, Full<Bytes>>, TraceLedger) {
    let connector = TracingConnector::new(options);
    let ledger = connector.ledger();
    let client = Client::builder(TokioExecutor::new()).build(connector);
    (client, ledger)
}
