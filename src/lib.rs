//! SLS smart-lighting sensor node library.
//!
//! Exposes the session engine and its collaborators for the host binary,
//! integration tests and fuzzing.  Hardware and the network are reached
//! only through the port traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod fsm;
pub mod protocol;
pub mod runtime;
pub mod supervisor;

pub use error::{Error, Result};
