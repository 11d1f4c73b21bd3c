//! Request-scoped tracing client
//!
//! Drives one HTTP/1.1 exchange per connection over the tracing connect
//! step and attaches the captured trace to the response extensions, where
//! [`tls_trace`] can read it once the response is available.

use bytes::Bytes;
use http::{header, HeaderValue, Method, Request, Response, Uri};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use tracing::debug;

use pqtrace_inspect::TlsTrace;

use crate::connect::{self, TlsConnectOptions};
use crate::error::{ClientError, Result};

/// HTTP client that traces the TLS negotiation of every request it sends.
///
/// Each request opens its own connection through the tracing connect
/// step, so the trace in the response extensions always describes the
/// handshake that carried that exact request.
#[derive(Clone, Default)]
pub struct TracingClient {
    options: TlsConnectOptions,
}

impl TracingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TlsConnectOptions) -> Self {
        Self { options }
    }

    /// Send a GET request to `url`.
    pub async fn get(&self, url: &str) -> Result<Response<Incoming>> {
        let uri: Uri = url
            .parse()
            .map_err(|_| ClientError::InvalidUri(url.to_owned()))?;
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .map_err(ClientError::InvalidRequest)?;
        self.request(request).await
    }

    /// Send `request`, returning the response with the TLS trace
    /// attached to its extensions when the request went over TLS.
    pub async fn request(&self, request: Request<Full<Bytes>>) -> Result<Response<Incoming>> {
        let uri = request.uri().clone();
        let host = uri
            .host()
            .ok_or_else(|| ClientError::InvalidUri(uri.to_string()))?;
        let secure = uri.scheme_str() == Some("https");
        let port = uri.port_u16().unwrap_or(if secure { 443 } else { 80 });

        let (stream, trace) = connect::connect(host, port, secure, &self.options).await?;

        let io = TokioIo::new(stream);
        let (mut sender, connection) = http1::handshake(io).await?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                debug!(error = %err, "client connection task ended with error");
            }
        });

        let request = into_origin_form(request, &uri)?;
        let mut response = sender.send_request(request).await?;
        if let Some(trace) = trace {
            response.extensions_mut().insert(trace);
        }
        Ok(response)
    }
}

/// Read the TLS trace attached to a completed response.
///
/// Absent when the request was plain HTTP or when the tracing connector
/// was not on the path.
pub fn tls_trace<B>(response: &Response<B>) -> Option<&TlsTrace> {
    response.extensions().get::<TlsTrace>()
}

/// Rewrite an absolute-form request into the origin-form + Host header
/// shape an HTTP/1.1 origin server expects.
fn into_origin_form(
    mut request: Request<Full<Bytes>>,
    uri: &Uri,
) -> Result<Request<Full<Bytes>>> {
    if !request.headers().contains_key(header::HOST) {
        let authority = uri
            .authority()
            .map(|authority| authority.as_str().to_owned())
            .ok_or_else(|| ClientError::InvalidUri(uri.to_string()))?;
        let value = HeaderValue::from_str(&authority).map_err(http::Error::from)?;
        request.headers_mut().insert(header::HOST, value);
    }

    let origin_form: Uri = uri
        .path_and_query()
        .map(|path| path.as_str())
        .unwrap_or("/")
        .parse()
        .map_err(http::Error::from)?;
    *request.uri_mut() = origin_form;
    Ok(request)
}
