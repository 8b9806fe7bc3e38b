#![no_main]

use libfuzzer_sys::fuzz_target;
use pbf_wire::FrameHeader;

// Fuzz target: FrameHeader::decode with arbitrary bytes.
//
// Anything that decodes must re-encode to bytes that decode to the same
// header.
//
// Catches bugs in:
// - Missing type or datasize fields
// - Invalid UTF-8 in the type string
// - Negative or oversized datasize values
fuzz_target!(|data: &[u8]| {
    if let Ok(header) = FrameHeader::decode(data) {
        let reparsed = FrameHeader::decode(&header.encode()).unwrap();
        assert_eq!(reparsed, header);
    }
});
