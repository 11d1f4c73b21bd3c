//! Per-OS dispatch to the introspection pipeline
//!
//! Each supported operating system carries its own shared-library name
//! list for libssl/libcrypto; the dispatcher composes the handle locator
//! and the native resolver for the running OS and folds every failure
//! into the sentinel vocabulary. An unsupported OS is fatal to the
//! introspection call only, never to the surrounding handshake, and no
//! native call is attempted on it.

use crate::error::{InspectError, Result};
use crate::locate::{self, SessionNode};
use crate::native;
use crate::sentinel;

/// Shared-library candidates for one operating system, most specific
/// soname first.
pub struct PlatformLibraries {
    pub ssl: &'static [&'static str],
    pub crypto: &'static [&'static str],
}

const LINUX: PlatformLibraries = PlatformLibraries {
    ssl: &["libssl.so.3", "libssl.so"],
    crypto: &["libcrypto.so.3", "libcrypto.so"],
};

const MACOS: PlatformLibraries = PlatformLibraries {
    ssl: &["libssl.3.dylib", "libssl.dylib"],
    crypto: &["libcrypto.3.dylib", "libcrypto.dylib"],
};

const WINDOWS: PlatformLibraries = PlatformLibraries {
    ssl: &["libssl-3-x64.dll", "libssl-3.dll"],
    crypto: &["libcrypto-3-x64.dll", "libcrypto-3.dll"],
};

/// Library names for the running operating system, or `None` when the OS
/// has no introspection pipeline.
pub fn current_libraries() -> Option<&'static PlatformLibraries> {
    if cfg!(target_os = "linux") {
        Some(&LINUX)
    } else if cfg!(target_os = "macos") {
        Some(&MACOS)
    } else if cfg!(target_os = "windows") {
        Some(&WINDOWS)
    } else {
        None
    }
}

/// Resolve the negotiated group for an established session.
///
/// Always returns a usable string: a real group name on success, a
/// sentinel otherwise.
pub fn negotiated_group(session: &dyn SessionNode) -> String {
    negotiated_group_with(current_libraries(), session)
}

fn negotiated_group_with(
    libs: Option<&'static PlatformLibraries>,
    session: &dyn SessionNode,
) -> String {
    match try_negotiated_group(libs, session) {
        Ok(name) => name,
        Err(InspectError::PlatformUnsupported) => sentinel::UNSUPPORTED_PLATFORM.to_string(),
        Err(err) => sentinel::error_group(&err),
    }
}

fn try_negotiated_group(
    libs: Option<&'static PlatformLibraries>,
    session: &dyn SessionNode,
) -> Result<String> {
    let libs = libs.ok_or(InspectError::PlatformUnsupported)?;
    let handle = locate::session_locator()
        .locate(session)
        .ok_or(InspectError::HandleNotFound)?;
    let api = native::group_api(libs)?;
    let (_id, name) = native::resolve(api, handle)?;
    Ok(name)
}
