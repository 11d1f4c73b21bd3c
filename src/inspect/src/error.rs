//! Error types for the introspection engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, InspectError>;

/// Failures that can occur below the trace-capture boundary.
///
/// None of these ever reach a handshake caller; they are converted into
/// sentinel group strings by the platform dispatcher. The variants are
/// cloneable because the one-time native probe caches its outcome
/// process-wide and must be able to hand the same failure to every caller.
#[derive(Debug, Clone, Error)]
pub enum InspectError {
    #[error("unsupported platform")]
    PlatformUnsupported,

    #[error("handle not found")]
    HandleNotFound,

    #[error("handle invalid")]
    HandleInvalid,

    #[error("native library unavailable: {tried}")]
    LibraryUnavailable { tried: String },

    #[error("native symbol missing: {symbol}")]
    SymbolMissing { symbol: String },

    #[error("native call failed: {call}")]
    NativeCallFailed { call: String },

    #[error("decode error (GroupID={group_id})")]
    DecodeFailed { group_id: i32 },
}
