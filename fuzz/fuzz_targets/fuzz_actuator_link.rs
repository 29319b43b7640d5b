//! Fuzz target: `ActuatorLinkDecoder`
//!
//! Streams arbitrary bytes through the decoder in arbitrary chunkings and
//! checks that the result does not depend on how the stream was split.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Byte-at-a-time and chunked feeding yield the same records
//! - Records never contain the start marker
//!
//! cargo fuzz run fuzz_actuator_link

#![no_main]

use libfuzzer_sys::fuzz_target;
use sls_node::protocol::codec::ActuatorLinkDecoder;
use sls_node::protocol::frame::SFD;

fuzz_target!(|data: &[u8]| {
    let Some((&split, stream)) = data.split_first() else {
        return;
    };
    let chunk = usize::from(split).max(1);

    let mut whole = Vec::new();
    let mut decoder = ActuatorLinkDecoder::new();
    for &byte in stream {
        if let Some(record) = decoder.push(byte) {
            whole.push(record);
        }
    }

    let mut chunked = Vec::new();
    let mut decoder = ActuatorLinkDecoder::new();
    for part in stream.chunks(chunk) {
        decoder.feed(part, |record| chunked.push(record));
    }

    assert_eq!(whole, chunked);
    assert!(whole.iter().all(|r| !r.contains(&SFD)));
});
