//! Unified error types for the node firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! dispatcher's error handling uniform.  All variants are `Copy` so they can
//! be passed through the session engine and the runtime without allocation.
//!
//! Protocol-level failures (unknown command, wrong session state) are *not*
//! errors: they travel in-band in the reply frame's `error_code`.  Replay
//! drops are not errors either; they surface as a frame disposition.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A datagram could not be turned into a command frame.
    Frame(FrameError),
    /// The payload transform failed.
    Security(SecurityError),
    /// An outbound send could not be queued or written.
    Transport(TransportError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(e) => write!(f, "frame: {e}"),
            Self::Security(e) => write!(f, "security: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Frame errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The datagram is not exactly one frame long.
    LengthMismatch { expected: usize, actual: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { expected, actual } => {
                write!(f, "length mismatch (expected {expected} bytes, got {actual})")
            }
        }
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

// ---------------------------------------------------------------------------
// Security errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityError {
    /// The block-mode transform rejected its buffer.
    Cipher,
}

impl fmt::Display for SecurityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cipher => write!(f, "AES-CBC block transform failed"),
        }
    }
}

impl From<SecurityError> for Error {
    fn from(e: SecurityError) -> Self {
        Self::Security(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// There is no peer to answer (the reply target is unknown).
    NoPeer,
    /// The socket refused the datagram.
    SendFailed,
    /// The outbound alert queue is full; the alert was dropped.
    QueueFull,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPeer => write!(f, "no reply peer"),
            Self::SendFailed => write!(f, "datagram send failed"),
            Self::QueueFull => write!(f, "alert queue full"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
