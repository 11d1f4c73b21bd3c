//! End-to-end TLS negotiation tracing over loopback
//!
//! Each scenario stands up a real TLS listener with a self-signed
//! certificate, drives it with the tracing client (or reqwest), and
//! checks the trace on both ends of the connection. The TLS scenarios
//! only run where an introspectable platform library is present, the
//! same way the upstream behavior is Linux-first.

use std::future::pending;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use http_body_util::BodyExt;
use tokio::net::TcpListener;

use pqtrace_client::{tls_trace, TlsConnectOptions, TracingClient};
use pqtrace_inspect::sentinel;
use pqtrace_server::{
    serve_with_hook, tls_acceptor, TraceHook, X_TLS_CIPHER, X_TLS_GROUP,
};

fn introspectable_platform() -> bool {
    cfg!(target_os = "linux")
}

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

fn self_signed_pems() -> (String, String) {
    let cert = rcgen::generate_simple_self_signed(vec![
        "localhost".to_string(),
        "127.0.0.1".to_string(),
    ])
    .expect("self-signed certificate");
    (
        cert.serialize_pem().expect("certificate PEM"),
        cert.serialize_private_key_pem(),
    )
}

fn ping_router() -> Router {
    Router::new()
        .route("/ping", get(|| async { "pong" }))
        .layer(middleware::from_fn(pqtrace_server::tls_trace_headers))
}

async fn start_tls_server(hook: TraceHook) -> SocketAddr {
    let (cert_pem, key_pem) = self_signed_pems();
    let acceptor = tls_acceptor(cert_pem.as_bytes(), key_pem.as_bytes()).expect("acceptor");
    spawn_server(acceptor, hook).await
}

/// Server variant pinned to an explicit key-exchange group list.
async fn start_tls_server_with_groups(hook: TraceHook, groups: &str) -> SocketAddr {
    use openssl::pkey::PKey;
    use openssl::ssl::{SslAcceptor, SslMethod};
    use openssl::x509::X509;

    let (cert_pem, key_pem) = self_signed_pems();
    let cert = X509::from_pem(cert_pem.as_bytes()).expect("certificate");
    let key = PKey::private_key_from_pem(key_pem.as_bytes()).expect("private key");

    let mut builder =
        SslAcceptor::mozilla_intermediate_v5(SslMethod::tls_server()).expect("acceptor builder");
    builder.set_certificate(&cert).expect("set certificate");
    builder.set_private_key(&key).expect("set private key");
    builder.set_groups_list(groups).expect("set groups list");

    spawn_server(builder.build(), hook).await
}

async fn spawn_server(acceptor: openssl::ssl::SslAcceptor, hook: TraceHook) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        let _ = serve_with_hook(
            listener,
            Arc::new(acceptor),
            ping_router(),
            hook,
            pending(),
        )
        .await;
    });

    addr
}

fn permissive_client_options() -> TlsConnectOptions {
    // Self-signed fixture: the test overrides the trust decision the same
    // way a caller-supplied validator would.
    TlsConnectOptions::new().with_validator(|_, _| true)
}

#[tokio::test]
async fn client_trace_matches_server_headers_over_tls() {
    init_tracing();
    if !introspectable_platform() {
        return;
    }

    let addr = start_tls_server(TraceHook::new()).await;
    let client = TracingClient::with_options(permissive_client_options());

    let response = client
        .get(&format!("https://127.0.0.1:{}/ping", addr.port()))
        .await
        .expect("https request");
    assert!(response.status().is_success());

    let trace = tls_trace(&response).expect("trace attached").clone();
    assert!(!trace.cipher_suite().is_empty());
    assert!(!trace.group().is_empty());
    assert!(
        trace.is_resolved(),
        "unexpected TLS group value: {}",
        trace.group()
    );

    // Both ends watched the same handshake: the server's injected headers
    // agree with the client's captured trace.
    let headers = response.headers();
    assert_eq!(headers[X_TLS_CIPHER], trace.cipher_suite());
    assert_eq!(headers[X_TLS_GROUP], trace.group());

    let body = response.into_body().collect().await.expect("body").to_bytes();
    assert_eq!(&body[..], b"pong");
}

#[tokio::test]
async fn pinned_classical_group_is_reported_by_name() {
    init_tracing();
    if !introspectable_platform() {
        return;
    }

    // The server offers exactly one classical curve; the trace has to
    // name it. Name casing differs between the library's translation
    // entry points, so the comparison ignores case.
    let addr = start_tls_server_with_groups(TraceHook::new(), "X25519").await;
    let client = TracingClient::with_options(permissive_client_options());

    let response = client
        .get(&format!("https://127.0.0.1:{}/ping", addr.port()))
        .await
        .expect("https request");
    assert!(response.status().is_success());

    let trace = tls_trace(&response).expect("trace attached");
    assert!(trace.is_resolved());
    assert!(!trace.cipher_suite().is_empty());
    assert!(
        trace.group().eq_ignore_ascii_case("x25519"),
        "expected the pinned curve, got {}",
        trace.group()
    );
}

#[tokio::test]
async fn server_injects_trace_headers_for_standard_clients() {
    init_tracing();
    if !introspectable_platform() {
        return;
    }

    let addr = start_tls_server(TraceHook::new()).await;

    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .expect("reqwest client");
    let response = client
        .get(format!("https://127.0.0.1:{}/ping", addr.port()))
        .send()
        .await
        .expect("https request");

    assert!(response.status().is_success());
    let group = response
        .headers()
        .get(X_TLS_GROUP)
        .expect("group header")
        .to_str()
        .expect("utf-8 header")
        .to_owned();
    assert!(!group.is_empty());
    assert!(!sentinel::is_sentinel(&group), "degraded group: {group}");
    assert!(response.headers().contains_key(X_TLS_CIPHER));
}

#[tokio::test]
async fn observer_runs_once_per_handshake() {
    init_tracing();
    if !introspectable_platform() {
        return;
    }

    let server_seen = Arc::new(AtomicUsize::new(0));
    let server_seen_in_cb = server_seen.clone();
    let hook = TraceHook::new().with_observer(move |_| {
        server_seen_in_cb.fetch_add(1, Ordering::SeqCst);
    });
    let addr = start_tls_server(hook).await;

    let client_seen = Arc::new(AtomicUsize::new(0));
    let client_seen_in_cb = client_seen.clone();
    let options = permissive_client_options().with_observer(move |_| {
        client_seen_in_cb.fetch_add(1, Ordering::SeqCst);
    });
    let client = TracingClient::with_options(options);

    for _ in 0..2 {
        let response = client
            .get(&format!("https://127.0.0.1:{}/ping", addr.port()))
            .await
            .expect("https request");
        assert!(response.status().is_success());
    }

    // One connection per request with this client: two handshakes on
    // each side.
    assert_eq!(client_seen.load(Ordering::SeqCst), 2);
    assert_eq!(server_seen.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rejecting_decision_closes_the_connection() {
    init_tracing();
    if !introspectable_platform() {
        return;
    }

    let hook = TraceHook::new().with_decision(|_| false);
    let addr = start_tls_server(hook).await;

    let client = TracingClient::with_options(permissive_client_options());
    let result = client
        .get(&format!("https://127.0.0.1:{}/ping", addr.port()))
        .await;
    assert!(result.is_err(), "rejected connection must not serve requests");
}

#[tokio::test]
async fn plain_http_passthrough_attaches_no_trace() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, ping_router()).await.expect("serve");
    });

    let observed = Arc::new(AtomicUsize::new(0));
    let observed_in_cb = observed.clone();
    let options = TlsConnectOptions::new().with_observer(move |_| {
        observed_in_cb.fetch_add(1, Ordering::SeqCst);
    });
    let client = TracingClient::with_options(options);

    let response = client
        .get(&format!("http://127.0.0.1:{}/ping", addr.port()))
        .await
        .expect("http request");

    assert!(response.status().is_success());
    assert!(tls_trace(&response).is_none());
    assert_eq!(observed.load(Ordering::SeqCst), 0);
    // No handshake interception on this connection: the header
    // middleware stays a no-op.
    assert!(!response.headers().contains_key(X_TLS_CIPHER));
    assert!(!response.headers().contains_key(X_TLS_GROUP));
}
