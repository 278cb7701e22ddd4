#![no_main]

// Compresses arbitrary data with arbitrary parameters and checks that it decompresses to the
// same bytes, and that the frame never exceeds the advertised bound.

use bitshuffle_api::{
    compress, decompress, max_compressed_size, BitshuffleOptionsBuilder, TransformMode,
};
use bitshuffle_lz4::Lz4BlockCompressor;
use libfuzzer_sys::{arbitrary, fuzz_target};

#[derive(Clone, Debug, arbitrary::Arbitrary)]
pub struct Input {
    pub element_size: u8,
    pub block_groups: u8,
    pub threads: u8,
    pub byte_shuffle: bool,
    pub data: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let element_size = input.element_size.max(1) as usize;
    let block_size = (input.block_groups.max(1) as usize) * 8;
    let element_count = input.data.len() / element_size;
    let data = &input.data[..element_count * element_size];

    let options = BitshuffleOptionsBuilder::new()
        .block_size(block_size)
        .threads((input.threads % 4) as usize)
        .mode(if input.byte_shuffle {
            TransformMode::ByteShuffle
        } else {
            TransformMode::BitShuffle
        })
        .build();
    let compressor = Lz4BlockCompressor::new();

    let frame = compress(data, element_size, &compressor, &options).expect("valid parameters");
    let bound = max_compressed_size(element_count, element_size, Some(block_size)).unwrap();
    assert!(frame.len() <= bound, "frame {} exceeds bound {bound}", frame.len());

    let restored = decompress(&frame, element_count, element_size, &compressor, &options)
        .expect("own frames decode");
    assert_eq!(restored, data);
});
