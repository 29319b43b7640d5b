//! Actuator-link record decoder.
//!
//! The auxiliary actuator driver talks over a byte-oriented serial link.
//! Notifications arrive as:
//! ```text
//! ┌─────────────┬──────────────────────┐
//! │ SFD (0x7F)  │ record body (9 B)    │
//! └─────────────┴──────────────────────┘
//! ```
//!
//! The decoder accumulates bytes and yields each complete body.  A start
//! marker seen at any point restarts the record, so a truncated record is
//! discarded by the next one.  Bytes outside a record are ignored.

use super::frame::SFD;

/// Body length of one actuator-link record (marker excluded).
pub const RECORD_LEN: usize = 9;

/// One decoded record body.
pub type ActuatorRecord = [u8; RECORD_LEN];

/// Decoder state machine.
enum DecoderState {
    /// Discarding bytes until a start marker.
    Hunting,
    /// Marker seen, collecting the body.
    Collecting { collected: usize },
}

/// Streaming record decoder.
pub struct ActuatorLinkDecoder {
    state: DecoderState,
    body: ActuatorRecord,
}

impl ActuatorLinkDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Hunting,
            body: [0; RECORD_LEN],
        }
    }

    /// Feed one byte.  Returns the record body when it completes.
    pub fn push(&mut self, byte: u8) -> Option<ActuatorRecord> {
        if byte == SFD {
            self.state = DecoderState::Collecting { collected: 0 };
            return None;
        }

        match &mut self.state {
            DecoderState::Hunting => None,
            DecoderState::Collecting { collected } => {
                self.body[*collected] = byte;
                *collected += 1;
                if *collected == RECORD_LEN {
                    self.state = DecoderState::Hunting;
                    Some(self.body)
                } else {
                    None
                }
            }
        }
    }

    /// Feed a chunk, handing every completed record to `on_record`.
    pub fn feed(&mut self, data: &[u8], mut on_record: impl FnMut(ActuatorRecord)) {
        for &byte in data {
            if let Some(record) = self.push(byte) {
                on_record(record);
            }
        }
    }

    /// Drop any partial record.
    #[cfg(test)]
    fn reset(&mut self) {
        self.state = DecoderState::Hunting;
    }
}

impl Default for ActuatorLinkDecoder {
    fn default() -> Self {
        Self::new()
    }
}
