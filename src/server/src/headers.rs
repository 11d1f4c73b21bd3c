//! Response-header injection middleware
//!
//! Reads the connection's captured negotiation items, if any, and sets
//! the `x-tls-cipher` / `x-tls-group` response headers. Runs once per
//! request and is a no-op on connections without an item bag (plain HTTP
//! or hook not installed); absent keys never raise.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::items::{ConnectionItems, TLS_CIPHER_ITEM, TLS_GROUP_ITEM};

/// Response header carrying the negotiated cipher suite.
pub const X_TLS_CIPHER: &str = "x-tls-cipher";

/// Response header carrying the negotiated key-exchange group.
pub const X_TLS_GROUP: &str = "x-tls-group";

/// Inject the connection's TLS negotiation trace into the response
/// headers.
pub async fn tls_trace_headers(request: Request, next: Next) -> Response {
    let items = request.extensions().get::<ConnectionItems>().cloned();

    let mut response = next.run(request).await;

    if let Some(items) = items {
        set_header(&mut response, X_TLS_CIPHER, items.get(TLS_CIPHER_ITEM));
        set_header(&mut response, X_TLS_GROUP, items.get(TLS_GROUP_ITEM));
    }

    response
}

fn set_header(response: &mut Response, name: &'static str, value: Option<String>) {
    let Some(value) = value else { return };
    if let Ok(value) = HeaderValue::from_str(&value) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(name), value);
    }
}
