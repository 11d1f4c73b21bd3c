//! Handshake-completion hook
//!
//! Runs the per-connection lifecycle: TLS accept, trace capture at the
//! instant the handshake completes (session still live, cipher already
//! negotiated), item-bag population, observer notification, and the
//! accept/reject decision. Interception exists for observation, so the
//! default decision admits every handshake; rejecting closes the
//! connection before any request is served.

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use axum::{Extension, Router};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use openssl::ssl::{Ssl, SslAcceptor};
use tokio::net::TcpStream;
use tokio_openssl::SslStream;
use tracing::debug;

use pqtrace_inspect::{capture, TlsStreamNode, TlsTrace};

use crate::error::{Result, ServerError};
use crate::items::{ConnectionItems, TLS_CIPHER_ITEM, TLS_GROUP_ITEM};

/// Observer invoked with the trace of every intercepted handshake.
pub type TraceObserver = Arc<dyn Fn(&TlsTrace) + Send + Sync>;

/// Accept/reject decision for an intercepted handshake.
pub type TraceDecision = Arc<dyn Fn(&TlsTrace) -> bool + Send + Sync>;

/// Handshake interception hook installed on the secure listener.
#[derive(Clone, Default)]
pub struct TraceHook {
    observer: Option<TraceObserver>,
    decision: Option<TraceDecision>,
}

impl TraceHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(mut self, observer: impl Fn(&TlsTrace) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn with_decision(
        mut self,
        decision: impl Fn(&TlsTrace) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.decision = Some(Arc::new(decision));
        self
    }

    fn observe(&self, trace: &TlsTrace) {
        if let Some(observer) = &self.observer {
            observer(trace);
        }
    }

    fn admit(&self, trace: &TlsTrace) -> bool {
        match &self.decision {
            Some(decision) => decision(trace),
            None => true,
        }
    }
}

/// Serve one accepted TCP connection: handshake, capture, then requests.
pub(crate) async fn handle_connection(
    tcp: TcpStream,
    acceptor: Arc<SslAcceptor>,
    router: Router,
    hook: TraceHook,
    peer: SocketAddr,
) -> Result<()> {
    let ssl = Ssl::new(acceptor.context())?;
    let mut stream = SslStream::new(ssl, tcp)?;
    Pin::new(&mut stream).accept().await?;

    let cipher_suite = stream
        .ssl()
        .current_cipher()
        .map(|cipher| cipher.name().to_owned())
        .unwrap_or_default();
    let trace = {
        let node = TlsStreamNode::new(&stream);
        capture(&node, &cipher_suite)
    };

    let items = ConnectionItems::new();
    items.insert(TLS_CIPHER_ITEM, trace.cipher_suite().to_owned());
    items.insert(TLS_GROUP_ITEM, trace.group().to_owned());

    hook.observe(&trace);
    if !hook.admit(&trace) {
        debug!(%peer, group = %trace.group(), "handshake rejected by trace hook");
        return Ok(());
    }

    let app = router.layer(Extension(items));
    let service = TowerToHyperService::new(app);
    auto::Builder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(stream), service)
        .await
        .map_err(ServerError::Serve)?;

    Ok(())
}
