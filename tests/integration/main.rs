//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with no radio or
//! sockets required.

mod alert_tests;
mod handshake_tests;
mod mock_hw;
