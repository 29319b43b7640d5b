//! Session protocol building blocks.
//!
//! ```text
//!  datagram ──▶ frame::CommandFrame::parse ──▶ security (decrypt if no SFD)
//!                                                  │
//!                              crc::verify ◀───────┘
//!                                   │
//!                        sequence::SequenceGuard ──▶ fsm
//! ```
//!
//! Everything in here is pure: no I/O, no logging side effects beyond
//! diagnostics, no hardware.  The session engine in [`crate::fsm`] and the
//! node service in [`crate::app`] compose these pieces.

pub mod auth;
pub mod codec;
pub mod crc;
pub mod frame;
pub mod security;
pub mod sequence;

pub use frame::{CommandCode, CommandFrame, ErrorCode, MsgKind};
