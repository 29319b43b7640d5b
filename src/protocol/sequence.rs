//! Replay/duplicate suppression.
//!
//! Requests must carry a sequence number strictly greater than the last one
//! accepted.  There is no wraparound handling: once the peer reaches 0xFFFF
//! it has to re-authenticate, which resets the counters.

use super::frame::{CommandCode, MsgKind};

/// The three per-session counters.  All reset together when a handshake
/// starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceGuard {
    current: u16,
    newly_received: u16,
    async_seq: u16,
}

impl SequenceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure acceptance test.
    ///
    /// Handshake commands and every non-Request kind bypass the check; a
    /// Request is accepted iff `incoming > current`.
    pub fn accept(&self, kind: MsgKind, command: CommandCode, incoming: u16) -> bool {
        if kind != MsgKind::Request || command.is_handshake() {
            return true;
        }
        incoming > self.current
    }

    /// Run [`accept`](Self::accept) and advance `current` when a checked
    /// Request passes.  Returns `false` for a replay; nothing changes then.
    pub fn admit(&mut self, kind: MsgKind, command: CommandCode, incoming: u16) -> bool {
        if kind != MsgKind::Request || command.is_handshake() {
            return true;
        }
        self.newly_received = incoming;
        if incoming > self.current {
            self.current = incoming;
            true
        } else {
            false
        }
    }

    /// Zero all counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Last accepted request sequence number.
    pub fn current(&self) -> u16 {
        self.current
    }

    /// Sequence number of the most recent checked request, accepted or not.
    pub fn newly_received(&self) -> u16 {
        self.newly_received
    }

    /// Sequence number of the last async message sent.
    pub fn async_seq(&self) -> u16 {
        self.async_seq
    }

    /// Advance the async counter and return the new value.
    pub fn next_async(&mut self) -> u16 {
        self.async_seq = self.async_seq.wrapping_add(1);
        self.async_seq
    }

    /// Step the async counter back so a retry reuses the same number.
    pub fn rewind_async(&mut self) {
        self.async_seq = self.async_seq.wrapping_sub(1);
    }
}
