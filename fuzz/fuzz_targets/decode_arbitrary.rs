#![no_main]

// Feeds arbitrary bytes to the decoder. It may reject them, but must never panic.

use bitshuffle_api::{decompress, inspect, BitshuffleOptions, FrameHeader};
use bitshuffle_lz4::Lz4BlockCompressor;
use libfuzzer_sys::fuzz_target;

/// Frames claiming more than this are only inspected, to keep allocations small.
const MAX_DECODED_BYTES: u64 = 1 << 24;

fuzz_target!(|frame: &[u8]| {
    let summary = inspect(frame);

    let Ok(header) = FrameHeader::from_bytes(frame) else {
        assert!(summary.is_err());
        return;
    };
    if header.element_size == 0 || header.total_bytes > MAX_DECODED_BYTES {
        return;
    }

    let element_size = header.element_size as usize;
    let element_count = header.total_bytes as usize / element_size;
    let options = BitshuffleOptions::default();
    let result = decompress(
        frame,
        element_count,
        element_size,
        &Lz4BlockCompressor::new(),
        &options,
    );

    // Whatever passes decoding must also pass structural inspection.
    if result.is_ok() {
        assert!(summary.is_ok());
    }
});
