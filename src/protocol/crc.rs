//! CRC16 frame integrity.
//!
//! Reflected polynomial 0xA001, initial value 0xFFFF, complemented result
//! (the CRC-16/USB parameter set), then byte-swapped.  The swap is what the
//! deployed gateways expect on the wire; do not "fix" it.

use crc::{CRC_16_USB, Crc};

use super::frame::{CRC_OFFSET, CommandFrame};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_USB);

/// Checksum of `bytes` with the wire byte order applied.
pub fn compute_crc16(bytes: &[u8]) -> u16 {
    CRC16.checksum(bytes).swap_bytes()
}

/// Checksum over everything in the frame except the checksum field.
fn frame_crc(frame: &CommandFrame) -> u16 {
    compute_crc16(&frame.to_image()[..CRC_OFFSET])
}

/// Compute and store the checksum.
pub fn stamp(frame: &mut CommandFrame) {
    frame.checksum = frame_crc(frame);
}

/// Recompute and compare.  A mismatch is the caller's to report.
pub fn verify(frame: &CommandFrame) -> bool {
    frame_crc(frame) == frame.checksum
}
