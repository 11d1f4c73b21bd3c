//! Sentinel vocabulary for degraded captures
//!
//! A trace must always carry a group string. When the real group cannot be
//! resolved, the string explains why instead of going missing, and the
//! prefix distinguishes "not applicable" (unsupported OS), "unknown"
//! (the library reported that no group was selected), and "failed"
//! (lookup or native-call error).

use crate::error::InspectError;

/// Group string reported on operating systems without an introspection
/// pipeline.
pub const UNSUPPORTED_PLATFORM: &str = "Unsupported-Platform";

/// Group string reported when the library returned group id 0, meaning the
/// handshake did not select a named group (e.g. a non-(EC)DHE cipher).
pub const UNKNOWN_GROUP: &str = "Unknown (GroupID=0)";

/// Prefix carried by every failure sentinel.
pub const ERROR_PREFIX: &str = "Err:";

/// Render an introspection failure as a failure sentinel.
pub fn error_group(err: &InspectError) -> String {
    format!("{ERROR_PREFIX} {err}")
}

/// Whether `group` is one of the sentinel strings rather than a real
/// group name.
pub fn is_sentinel(group: &str) -> bool {
    group.starts_with(ERROR_PREFIX)
        || group.starts_with("Unknown")
        || group.starts_with("Unsupported")
}
