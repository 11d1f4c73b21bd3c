//! Runtime bindings into libssl/libcrypto
//!
//! The entry points needed to read the negotiated group differ between
//! library builds: `SSL_get_negotiated_group` is usually a macro over
//! `SSL_ctrl`, and `SSL_group_to_name` only exists in 3.x. The bindings
//! are therefore resolved at runtime, once per process, and the probed
//! table records which strategies are available. Absence of an optional
//! entry point selects the fallback; absence of a required one is a
//! checked error, never a crash.

use std::ffi::{c_char, c_int, c_long, c_void, CStr};
use std::ptr;
use std::sync::OnceLock;

use libloading::Library;
use tracing::debug;

use crate::error::{InspectError, Result};
use crate::locate::RawSessionHandle;
use crate::platform::PlatformLibraries;
use crate::sentinel;

/// `SSL_CTRL_GET_NEGOTIATED_GROUP` from OpenSSL's `ssl.h`.
const SSL_CTRL_GET_NEGOTIATED_GROUP: c_int = 134;

type GetNegotiatedGroupFn = unsafe extern "C" fn(*mut c_void) -> c_int;
type SslCtrlFn = unsafe extern "C" fn(*mut c_void, c_int, c_long, *mut c_void) -> c_long;
type GroupToNameFn = unsafe extern "C" fn(*mut c_void, c_int) -> *const c_char;
type NidToShortNameFn = unsafe extern "C" fn(c_int) -> *const c_char;
type UpRefFn = unsafe extern "C" fn(*mut c_void) -> c_int;
type FreeFn = unsafe extern "C" fn(*mut c_void);

/// Probed entry-point table for the platform cryptography library.
///
/// Function pointers stay valid for as long as the `Library` handles they
/// were resolved from, which live inside this struct; the struct itself
/// lives in a process-wide `OnceLock`.
#[derive(Debug)]
pub(crate) struct GroupApi {
    get_negotiated_group: Option<GetNegotiatedGroupFn>,
    ssl_ctrl: SslCtrlFn,
    group_to_name: Option<GroupToNameFn>,
    nid_to_short_name: Option<NidToShortNameFn>,
    up_ref: UpRefFn,
    free: FreeFn,
    _ssl: Library,
    _crypto: Option<Library>,
}

impl GroupApi {
    /// Load the shared libraries and resolve every entry point once.
    pub(crate) fn probe(libs: &PlatformLibraries) -> Result<Self> {
        let ssl = load_first(libs.ssl)?;
        let crypto = load_first(libs.crypto).ok();

        let ssl_ctrl = required(&ssl, "SSL_ctrl")?;
        let up_ref = required(&ssl, "SSL_up_ref")?;
        let free = required(&ssl, "SSL_free")?;
        let get_negotiated_group = optional(&ssl, "SSL_get_negotiated_group");
        let group_to_name = optional(&ssl, "SSL_group_to_name");
        let nid_to_short_name = crypto
            .as_ref()
            .and_then(|lib| optional::<NidToShortNameFn>(lib, "OBJ_nid2sn"));

        debug!(
            direct_group_symbol = get_negotiated_group.is_some(),
            group_to_name_symbol = group_to_name.is_some(),
            nid_lookup_symbol = nid_to_short_name.is_some(),
            "probed native group-introspection entry points"
        );

        Ok(Self {
            get_negotiated_group,
            ssl_ctrl,
            group_to_name,
            nid_to_short_name,
            up_ref,
            free,
            _ssl: ssl,
            _crypto: crypto,
        })
    }

    /// Negotiated group id for a pinned session, via the direct entry
    /// point when it exists and the generic control interface otherwise.
    fn group_id(&self, ssl: *mut c_void) -> c_int {
        match self.get_negotiated_group {
            Some(direct) => unsafe { direct(ssl) },
            None => {
                let id = unsafe { (self.ssl_ctrl)(ssl, SSL_CTRL_GET_NEGOTIATED_GROUP, 0, ptr::null_mut()) };
                id as c_int
            }
        }
    }

    /// Translate a group id to its display name.
    ///
    /// `SSL_group_to_name` is preferred because it accepts the identifier
    /// space the 3.x library actually returns, TLS 1.3 hybrid/PQC ids
    /// included; `OBJ_nid2sn` covers pre-3.x builds where the id is a
    /// plain NID. Each build therefore stays within one id space end to
    /// end.
    fn group_name(&self, ssl: *mut c_void, id: c_int) -> Result<String> {
        let name_ptr = if let Some(group_to_name) = self.group_to_name {
            unsafe { group_to_name(ssl, id) }
        } else if let Some(nid_to_short_name) = self.nid_to_short_name {
            unsafe { nid_to_short_name(id) }
        } else {
            return Err(InspectError::SymbolMissing {
                symbol: "SSL_group_to_name / OBJ_nid2sn".to_string(),
            });
        };

        if name_ptr.is_null() {
            return Err(InspectError::DecodeFailed { group_id: id });
        }
        let name = unsafe { CStr::from_ptr(name_ptr) }
            .to_str()
            .map_err(|_| InspectError::DecodeFailed { group_id: id })?;
        if name.is_empty() {
            return Err(InspectError::DecodeFailed { group_id: id });
        }
        Ok(name.to_string())
    }
}

/// Process-wide probed table; the probe outcome (success or failure) is
/// computed once and handed out to every caller afterwards.
pub(crate) fn group_api(libs: &PlatformLibraries) -> Result<&'static GroupApi> {
    static GROUP_API: OnceLock<Result<GroupApi>> = OnceLock::new();
    GROUP_API
        .get_or_init(|| GroupApi::probe(libs))
        .as_ref()
        .map_err(|err| err.clone())
}

/// Query the negotiated group id and display name for `handle`.
///
/// The handle is pinned against concurrent release by its owner for the
/// duration of the native calls and unpinned unconditionally, error paths
/// included. Group id 0 is the library's way of saying no group was
/// selected; it is reported as the unknown sentinel, not as an error.
pub(crate) fn resolve(api: &GroupApi, handle: RawSessionHandle) -> Result<(i32, String)> {
    if !handle.is_valid() {
        return Err(InspectError::HandleInvalid);
    }

    let pin = PinGuard::acquire(api, handle)?;
    let id = api.group_id(pin.ptr());
    if id == 0 {
        return Ok((0, sentinel::UNKNOWN_GROUP.to_string()));
    }
    let name = api.group_name(pin.ptr(), id)?;
    Ok((id, name))
}

/// Scoped pin on an externally-owned session handle.
///
/// Acquisition increments the library's reference count so the owner
/// cannot free the session mid-call; drop decrements it again on every
/// exit path.
struct PinGuard<'a> {
    api: &'a GroupApi,
    ptr: *mut c_void,
}

impl<'a> PinGuard<'a> {
    fn acquire(api: &'a GroupApi, handle: RawSessionHandle) -> Result<Self> {
        let ptr = handle.as_ptr();
        let ok = unsafe { (api.up_ref)(ptr) };
        if ok != 1 {
            return Err(InspectError::NativeCallFailed {
                call: "SSL_up_ref".to_string(),
            });
        }
        Ok(Self { api, ptr })
    }

    fn ptr(&self) -> *mut c_void {
        self.ptr
    }
}

impl Drop for PinGuard<'_> {
    fn drop(&mut self) {
        unsafe { (self.api.free)(self.ptr) };
    }
}

fn load_first(names: &[&str]) -> Result<Library> {
    for name in names {
        if let Ok(lib) = unsafe { Library::new(name) } {
            return Ok(lib);
        }
    }
    Err(InspectError::LibraryUnavailable {
        tried: names.join(", "),
    })
}

fn required<T: Copy>(lib: &Library, symbol: &str) -> Result<T> {
    optional(lib, symbol).ok_or_else(|| InspectError::SymbolMissing {
        symbol: symbol.to_string(),
    })
}

fn optional<T: Copy>(lib: &Library, symbol: &str) -> Option<T> {
    let name = [symbol.as_bytes(), b"\0"].concat();
    unsafe { lib.get::<T>(&name) }.ok().map(|sym| *sym)
}
