//! Never-failing trace construction at handshake time

use tracing::{debug, warn};

use crate::locate::SessionNode;
use crate::platform;
use crate::sentinel;
use crate::trace::TlsTrace;

/// Build the trace for a just-completed handshake.
///
/// Runs synchronously inside the handshake-completion continuation, while
/// the native session is still live and the cipher suite has already been
/// negotiated. Never fails and never panics: any introspection failure
/// has already been folded into a sentinel group string by the time the
/// trace is constructed, so the handshake itself is never aborted by
/// observation.
pub fn capture(session: &dyn SessionNode, cipher_suite: &str) -> TlsTrace {
    let group = platform::negotiated_group(session);
    if sentinel::is_sentinel(&group) {
        warn!(group = %group, cipher_suite = %cipher_suite, "TLS trace capture degraded");
    } else {
        debug!(group = %group, cipher_suite = %cipher_suite, "captured TLS negotiation trace");
    }
    TlsTrace::new(group, cipher_suite)
}
