//! Host log backend.
//!
//! The library logs through the `log` facade.  On the host the records are
//! forwarded into a `tracing-subscriber` fmt subscriber.
//!
//! - WARN: dropped frames, failed sends, lost connectivity
//! - INFO: session transitions, handshakes, alerts sent
//! - DEBUG: per-frame traffic, jitter, indicator changes

use tracing_subscriber::EnvFilter;

/// Install the subscriber.  The level comes from `RUST_LOG`, default `info`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Same as [`init`] but safe to call repeatedly, writing through the test
/// harness capture.
pub fn init_for_tests() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
