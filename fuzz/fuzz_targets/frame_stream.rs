#![no_main]

use libfuzzer_sys::fuzz_target;
use pbf_decoder::{FrameReader, ReaderLimits};

// Fuzz target: FrameReader over an arbitrary byte stream.
//
// Reads the header block and then data blocks until the stream ends or an
// error stops it, the same way the pipeline producer does.
//
// Catches bugs in:
// - Length prefixes cut short, negative or above the limit
// - datasize larger than the remaining input
// - Non-header first frames and non-data later frames
fuzz_target!(|data: &[u8]| {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    runtime.block_on(async {
        let limits = ReaderLimits {
            max_header_size: 4 * 1024,
            max_blob_size: 1 << 20,
        };
        let mut reader = FrameReader::with_limits(data, limits);
        if reader.read_header_block().await.is_err() {
            return;
        }
        while let Ok(Some(_block)) = reader.next_block().await {}
        assert!(reader.bytes_read() <= data.len() as u64);
    });
});
