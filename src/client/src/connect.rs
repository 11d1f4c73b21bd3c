//! Raw connect + direct TLS handshake + trace capture
//!
//! The connect routine owns the whole connection build-up so the live
//! session object is in hand when the handshake completes. On failure or
//! cancellation at any point, everything constructed so far is released
//! in reverse acquisition order by drop (secure stream, then session,
//! then socket) before the error propagates; on success, ownership of the
//! stack transfers to the caller.

use std::pin::Pin;
use std::sync::Arc;

use openssl::ssl::{Ssl, SslConnector, SslMethod, SslVerifyMode};
use openssl::x509::X509StoreContextRef;
use tokio::net::TcpStream;
use tokio_openssl::SslStream;
use tracing::{debug, trace};

use pqtrace_inspect::{capture, TlsStreamNode, TlsTrace};

use crate::error::Result;
use crate::stream::MaybeTlsStream;

/// Certificate trust decision. Receives the platform verification
/// outcome for the current chain element and the live store context.
pub type CertificateValidator =
    Arc<dyn Fn(bool, &mut X509StoreContextRef) -> bool + Send + Sync>;

/// Callback invoked with every captured trace.
pub type TraceObserver = Arc<dyn Fn(&TlsTrace) + Send + Sync>;

/// Options for the outbound connect step.
#[derive(Clone, Default)]
pub struct TlsConnectOptions {
    /// Caller-supplied trust decision; when absent, a connection is
    /// accepted only if the platform validation reports no errors.
    pub validator: Option<CertificateValidator>,
    /// Observer invoked with the trace of every completed handshake.
    pub observer: Option<TraceObserver>,
}

impl TlsConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validator(
        mut self,
        validator: impl Fn(bool, &mut X509StoreContextRef) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn with_observer(mut self, observer: impl Fn(&TlsTrace) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }
}

/// Open the transport connection and, for secure targets, perform the
/// TLS handshake and capture the negotiation trace.
///
/// Non-secure targets get the raw transport back unchanged: no
/// handshake, no native resolver call, no trace.
pub async fn connect(
    host: &str,
    port: u16,
    secure: bool,
    options: &TlsConnectOptions,
) -> Result<(MaybeTlsStream, Option<TlsTrace>)> {
    let tcp = TcpStream::connect((host, port)).await?;
    trace!(%host, port, secure, "transport connected");

    if !secure {
        return Ok((MaybeTlsStream::Plain(tcp), None));
    }

    let ssl = client_session(host, options.validator.clone())?;
    let mut stream = SslStream::new(ssl, tcp)?;
    Pin::new(&mut stream).connect().await?;
    debug!(%host, port, "TLS handshake completed");

    let cipher_suite = stream
        .ssl()
        .current_cipher()
        .map(|cipher| cipher.name().to_owned())
        .unwrap_or_default();
    let node = TlsStreamNode::new(&stream);
    let trace = capture(&node, &cipher_suite);

    if let Some(observer) = &options.observer {
        observer(&trace);
    }

    Ok((MaybeTlsStream::Tls(stream), Some(trace)))
}

fn client_session(host: &str, validator: Option<CertificateValidator>) -> Result<Ssl> {
    let mut builder = SslConnector::builder(SslMethod::tls_client())?;
    match validator {
        Some(validator) => {
            builder.set_verify_callback(SslVerifyMode::PEER, move |preverify_ok, ctx| {
                validator(preverify_ok, ctx)
            });
        }
        None => {
            builder.set_verify_callback(SslVerifyMode::PEER, |preverify_ok, _| preverify_ok);
        }
    }
    let connector = builder.build();
    let ssl = connector.configure()?.into_ssl(host)?;
    Ok(ssl)
}
