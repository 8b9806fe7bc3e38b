#![no_main]

use libfuzzer_sys::fuzz_target;
use pbf_types::HeaderBlock;

// Fuzz target: HeaderBlock::decode_body with arbitrary bytes.
//
// Catches bugs in:
// - Bounding boxes missing one or more sides
// - Invalid UTF-8 in feature and program strings
// - Feature checks against headers with empty or duplicate entries
fuzz_target!(|data: &[u8]| {
    if let Ok(header) = HeaderBlock::decode_body(data) {
        let _ = header.unsupported_features(&["OsmSchema-V0.6", "DenseNodes"]);
        let reparsed = HeaderBlock::decode_body(&header.encode_body()).unwrap();
        assert_eq!(reparsed, header);
    }
});
