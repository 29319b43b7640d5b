//! Application core — domain orchestration, zero direct I/O.
//!
//! The session engine, alert dispatch and connectivity supervision meet in
//! [`service::NodeService`].  All interaction with hardware and the network
//! happens through the **port traits** in [`ports`], keeping this layer
//! fully testable without a radio.

pub mod alerts;
pub mod ports;
pub mod service;
