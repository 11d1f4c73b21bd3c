//! TLS listener setup and lifecycle management
//!
//! This module handles:
//! - Acceptor construction from PEM certificate material
//! - The accept loop that hands connections to the handshake hook
//! - Graceful shutdown on signals (SIGTERM, SIGINT)

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use openssl::pkey::PKey;
use openssl::ssl::{SslAcceptor, SslMethod};
use openssl::x509::X509;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, info};

use crate::hook::{self, TraceHook};

/// Listener configuration
#[derive(Debug, Clone)]
pub struct TlsServerConfig {
    /// Host to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for TlsServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8443,
        }
    }
}

/// Build an acceptor from PEM-encoded certificate and private key.
pub fn tls_acceptor(cert_pem: &[u8], key_pem: &[u8]) -> crate::Result<SslAcceptor> {
    let cert = X509::from_pem(cert_pem)?;
    let key = PKey::private_key_from_pem(key_pem)?;

    let mut builder = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls_server())?;
    builder.set_certificate(&cert)?;
    builder.set_private_key(&key)?;
    builder.check_private_key()?;
    Ok(builder.build())
}

/// TLS server with the handshake hook installed
pub struct TlsServer {
    config: TlsServerConfig,
    acceptor: Arc<SslAcceptor>,
    router: Router,
    hook: TraceHook,
}

impl TlsServer {
    pub fn new(config: TlsServerConfig, acceptor: SslAcceptor, router: Router) -> Self {
        Self {
            config,
            acceptor: Arc::new(acceptor),
            router,
            hook: TraceHook::new(),
        }
    }

    pub fn with_hook(mut self, hook: TraceHook) -> Self {
        self.hook = hook;
        self
    }

    /// Bind the listener and serve until a shutdown signal arrives.
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .context(format!("Failed to bind to {addr}"))?;

        info!("TLS server listening on https://{}", listener.local_addr()?);

        serve_with_hook(
            listener,
            self.acceptor,
            self.router,
            self.hook,
            shutdown_signal(),
        )
        .await
    }
}

/// Accept loop: every connection runs the handshake hook before any
/// request is served on it.
///
/// Takes the bound listener so callers (and tests) can pick the port
/// first; `shutdown` ends the loop without tearing down connections that
/// are already being served.
pub async fn serve_with_hook(
    listener: TcpListener,
    acceptor: Arc<SslAcceptor>,
    router: Router,
    hook: TraceHook,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (tcp, peer) = accepted.context("accept failed")?;
                let acceptor = acceptor.clone();
                let router = router.clone();
                let hook = hook.clone();
                tokio::spawn(async move {
                    if let Err(err) = hook::handle_connection(tcp, acceptor, router, hook, peer).await {
                        debug!(%peer, error = %err, "connection ended with error");
                    }
                });
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping TLS listener");
                break;
            }
        }
    }

    Ok(())
}

/// Wait for shutdown signal
///
/// Listens for:
/// - SIGTERM (kill command, docker stop, kubernetes)
/// - SIGINT (Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
