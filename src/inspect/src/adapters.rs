//! Session-graph adapters for tokio-openssl streams
//!
//! Bridges the layered stream objects the transport stack actually
//! produces into the [`SessionNode`] graph the locator searches. The
//! adapters borrow the stream for the duration of the capture call only.

use std::any::type_name;
use std::ffi::c_void;

use foreign_types::ForeignTypeRef;
use openssl::ssl::SslRef;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_openssl::SslStream;

use crate::locate::{RawSessionHandle, SessionNode};

/// Graph root for an established `tokio_openssl::SslStream`.
///
/// Exposes two children: the transport the stream wraps (a leaf with no
/// handle) and the TLS session reference carrying the native handle.
pub struct TlsStreamNode<'a, S> {
    label: &'static str,
    transport: TransportNode<'a, S>,
    session: SslNode<'a>,
}

impl<'a, S: AsyncRead + AsyncWrite> TlsStreamNode<'a, S> {
    pub fn new(stream: &'a SslStream<S>) -> Self {
        Self {
            label: type_name::<SslStream<S>>(),
            transport: TransportNode {
                label: type_name::<S>(),
                _inner: stream.get_ref(),
            },
            session: SslNode { ssl: stream.ssl() },
        }
    }
}

impl<S> SessionNode for TlsStreamNode<'_, S> {
    fn label(&self) -> &'static str {
        self.label
    }

    fn children(&self) -> Vec<&dyn SessionNode> {
        vec![&self.transport, &self.session]
    }
}

struct TransportNode<'a, S> {
    label: &'static str,
    _inner: &'a S,
}

impl<S> SessionNode for TransportNode<'_, S> {
    fn label(&self) -> &'static str {
        self.label
    }

    fn children(&self) -> Vec<&dyn SessionNode> {
        Vec::new()
    }
}

struct SslNode<'a> {
    ssl: &'a SslRef,
}

impl SessionNode for SslNode<'_> {
    fn label(&self) -> &'static str {
        type_name::<SslRef>()
    }

    fn children(&self) -> Vec<&dyn SessionNode> {
        Vec::new()
    }

    fn handle(&self) -> Option<RawSessionHandle> {
        Some(RawSessionHandle::new(self.ssl.as_ptr() as *mut c_void))
    }
}
