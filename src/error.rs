//! Unified error types for the telephone bridge.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level decision loop's error handling uniform. Transport failures from
//! the external telephony and pairing services are deliberately coarse: the
//! core degrades to "no device / no call" instead of propagating them, so
//! the variants carry just enough detail for logs and audio cues.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the bridge funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The telephony service rejected or dropped a command.
    Telephony(ServiceError),
    /// A dial command failed (distinct, user-audible failure classes).
    Dial(DialError),
    /// The pairing service rejected or dropped a command.
    Pairing(ServiceError),
    /// Audio playback could not be started or controlled.
    Audio(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(String),
    /// Startup wiring failed (GPIO export, worker spawn).
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Telephony(e) => write!(f, "telephony: {e}"),
            Self::Dial(e) => write!(f, "dial: {e}"),
            Self::Pairing(e) => write!(f, "pairing: {e}"),
            Self::Audio(msg) => write!(f, "audio: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Service transport errors
// ---------------------------------------------------------------------------

/// Coarse failure classes for the external telephony/pairing collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The service is unreachable (bus down, daemon not running).
    Unavailable,
    /// The service answered but refused the command.
    Rejected(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "service unavailable"),
            Self::Rejected(msg) => write!(f, "rejected: {msg}"),
        }
    }
}

impl From<ServiceError> for Error {
    fn from(e: ServiceError) -> Self {
        Self::Telephony(e)
    }
}

// ---------------------------------------------------------------------------
// Dial errors
// ---------------------------------------------------------------------------

/// Failure classes for an outbound dial command. `NotRunning` and
/// `InvalidFormat` map to distinct audio cues and must never be collapsed
/// into one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialError {
    /// The telephony service is not running at all.
    NotRunning,
    /// The dialed number was rejected as malformed.
    InvalidFormat,
    /// Any other transport failure while dialing.
    Unavailable,
}

impl fmt::Display for DialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRunning => write!(f, "telephony service not running"),
            Self::InvalidFormat => write!(f, "invalid number format"),
            Self::Unavailable => write!(f, "telephony service unavailable"),
        }
    }
}

impl From<DialError> for Error {
    fn from(e: DialError) -> Self {
        Self::Dial(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
