#![no_main]

use libfuzzer_sys::fuzz_target;
use pbf_decoder::materialize;
use pbf_wire::Blob;

// Fuzz target: Blob::decode followed by decompression.
//
// A small size limit keeps hostile raw_size values from turning into
// large allocations; anything that materializes must have exactly the
// declared size.
//
// Catches bugs in:
// - Multiple data fields in one blob
// - raw_size missing, negative or out of range
// - Truncated or over-long zlib and zstd streams
fuzz_target!(|data: &[u8]| {
    let Ok(blob) = Blob::decode(data) else {
        return;
    };
    if let Ok(bytes) = materialize(&blob, 1 << 20) {
        if let Some(declared) = blob.declared_size() {
            assert_eq!(bytes.len() as i64, declared);
        }
    }
});
