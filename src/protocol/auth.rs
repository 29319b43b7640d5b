//! Challenge/response hash for the authentication handshake.
//!
//! The gateway sends a 16-bit challenge in the first two argument bytes
//! (big-endian); the node answers with `challenge_hash(challenge)` in the
//! same slot.  The hash is a fixed integer mixer, not a MAC: it proves the
//! node runs compatible firmware, nothing more.

/// Mix a 16-bit challenge into the 16-bit response.  All arithmetic wraps
/// in 32 bits before truncation.
pub fn challenge_hash(challenge: u16) -> u16 {
    let a = u32::from(challenge);
    let mut t = a;
    t = a.wrapping_add(0x7ed5_5d16).wrapping_add(t << 12);
    t = (a ^ 0xc761_c23c) ^ (t >> 19);
    t = a.wrapping_add(0x1656_67b1).wrapping_add(t << 5);
    t = a.wrapping_add(0xd3a2_646c) ^ (t << 9);
    t = a.wrapping_add(0xfd70_46c5).wrapping_add(t << 3);
    t = (a ^ 0xb55a_4f09) ^ (t >> 16);
    (t & 0xFFFF) as u16
}

/// Extract the challenge from an Authenticate frame's arguments.
pub fn read_challenge(args: &[u8]) -> u16 {
    u16::from_be_bytes([args[0], args[1]])
}

/// Store a challenge response where the gateway expects it.
pub fn write_response(args: &mut [u8], response: u16) {
    args[..2].copy_from_slice(&response.to_be_bytes());
}
