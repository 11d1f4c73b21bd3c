//! Per-connection item bag
//!
//! Populated once at handshake completion and read by every request that
//! rides the connection. The bag is shared by cloning; entries are plain
//! strings so the header injector can use them verbatim.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Item key for the negotiated cipher suite.
pub const TLS_CIPHER_ITEM: &str = "TlsCipher";

/// Item key for the negotiated key-exchange group.
pub const TLS_GROUP_ITEM: &str = "TlsGroup";

/// String-keyed bag scoped to one connection's lifetime.
#[derive(Debug, Clone, Default)]
pub struct ConnectionItems {
    inner: Arc<RwLock<HashMap<&'static str, String>>>,
}

impl ConnectionItems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &'static str, value: String) {
        self.inner.write().insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.read().get(key).cloned()
    }
}
