//! Immutable per-handshake trace record

use serde::Serialize;

/// The negotiated key-exchange group and cipher suite of one TLS session.
///
/// Produced at most once per completed handshake and never mutated
/// afterwards; cloning is cheap enough to hand copies to observers,
/// response extensions, and connection item bags. When introspection
/// degrades, `group` carries one of the [`crate::sentinel`] strings
/// instead of a real group name, so the field is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TlsTrace {
    group: String,
    cipher_suite: String,
}

impl TlsTrace {
    pub fn new(group: impl Into<String>, cipher_suite: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            cipher_suite: cipher_suite.into(),
        }
    }

    /// Negotiated key-exchange group name, or a sentinel string.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Negotiated cipher suite name as reported by the TLS layer.
    pub fn cipher_suite(&self) -> &str {
        &self.cipher_suite
    }

    /// Whether the group field holds a real group name rather than a
    /// degraded-capture sentinel.
    pub fn is_resolved(&self) -> bool {
        !crate::sentinel::is_sentinel(&self.group)
    }
}
