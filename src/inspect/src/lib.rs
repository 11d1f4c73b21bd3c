//! # TLS Negotiation Introspection Engine
//!
//! This crate answers one question the TLS layer does not expose through its
//! public surface: which key-exchange group was actually negotiated for an
//! established session. That single fact is what operators watch when they
//! track post-quantum key-exchange adoption.
//!
//! ## Module Structure
//!
//! ```text
//! inspect/
//! ├── trace       - Immutable per-handshake trace record
//! ├── sentinel    - Descriptive fallback strings for degraded captures
//! ├── locate      - Bounded search over the session object graph
//! ├── native      - Runtime bindings into libssl/libcrypto
//! ├── platform    - Per-OS dispatch to the introspection pipeline
//! ├── capture     - Never-failing trace construction at handshake time
//! └── adapters    - Session-graph adapters for tokio-openssl streams
//! ```
//!
//! The pipeline runs synchronously inside the handshake-completion
//! continuation: `capture` → `platform` → `locate` (cached path) →
//! `native` (pinned handle) → `TlsTrace`. Every failure below `capture`
//! is folded into a sentinel group string so a handshake is never aborted
//! by introspection.

pub mod adapters;
pub mod capture;
pub mod error;
pub mod locate;
pub mod native;
pub mod platform;
pub mod sentinel;
pub mod trace;

pub use adapters::TlsStreamNode;
pub use capture::capture;
pub use error::{InspectError, Result};
pub use locate::{HandleLocator, RawSessionHandle, SessionNode};
pub use trace::TlsTrace;
