#![doc = include_str!(concat!("../", core::env!("CARGO_PKG_README")))]
#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

use bitshuffle_api_common::BlockCompressor;
use lz4_flex::block::{
    compress_into, decompress_into, get_maximum_output_size, CompressError, DecompressError,
};
use thiserror::Error;

/// Errors that can occur during LZ4 block compression.
#[derive(Debug, Error)]
pub enum Lz4Error {
    /// LZ4 compression failed
    #[error("LZ4 compression failed: {0}")]
    CompressionFailed(CompressError),

    /// LZ4 decompression failed, the block is corrupted
    #[error("LZ4 decompression failed: {0}")]
    DecompressionFailed(DecompressError),
}

/// LZ4 implementation of [`BlockCompressor`].
///
/// Holds no state; every call uses its own hash table, so one instance can be shared
/// between any number of threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4BlockCompressor;

impl Lz4BlockCompressor {
    /// Creates a new LZ4 block compressor.
    pub const fn new() -> Self {
        Self
    }
}

impl BlockCompressor for Lz4BlockCompressor {
    type Error = Lz4Error;

    fn name(&self) -> &'static str {
        "lz4"
    }

    fn max_compressed_size(&self, len_bytes: usize) -> usize {
        get_maximum_output_size(len_bytes)
    }

    fn compress(&self, input: &[u8], output: &mut [u8]) -> Result<usize, Self::Error> {
        compress_into(input, output).map_err(Lz4Error::CompressionFailed)
    }

    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<usize, Self::Error> {
        decompress_into(input, output).map_err(Lz4Error::DecompressionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn compresses_repetitive_data() {
        let compressor = Lz4BlockCompressor::new();
        let data = [0u8; 4096];
        let mut output = vec![0u8; compressor.max_compressed_size(data.len())];

        let size = compressor.compress(&data, &mut output).unwrap();
        assert!(size > 0);
        assert!(size < data.len() / 16);

        let mut restored = vec![0xFFu8; data.len()];
        let restored_size = compressor
            .decompress(&output[..size], &mut restored)
            .unwrap();
        assert_eq!(restored_size, data.len());
        assert_eq!(restored, data);
    }

    #[rstest]
    #[case::tiny(b"a".as_slice())]
    #[case::text(b"Hello, world! This is a test string for compression. test test test test!!".as_slice())]
    fn roundtrips(#[case] data: &[u8]) {
        let compressor = Lz4BlockCompressor::new();
        let mut output = vec![0u8; compressor.max_compressed_size(data.len())];
        let size = compressor.compress(data, &mut output).unwrap();

        let mut restored = vec![0u8; data.len()];
        let restored_size = compressor
            .decompress(&output[..size], &mut restored)
            .unwrap();
        assert_eq!(restored_size, data.len());
        assert_eq!(restored, data);
    }

    #[test]
    fn rejects_garbage_input() {
        let compressor = Lz4BlockCompressor::new();
        // A literal run claiming 15+ bytes with nothing behind it.
        let garbage = [0xF0u8, 0xFF, 0xFF];
        let mut restored = [0u8; 64];
        assert!(matches!(
            compressor.decompress(&garbage, &mut restored),
            Err(Lz4Error::DecompressionFailed(_))
        ));
    }

    #[test]
    fn reports_short_destination() {
        let compressor = Lz4BlockCompressor::new();
        let data = [7u8; 1024];
        let mut output = vec![0u8; compressor.max_compressed_size(data.len())];
        let size = compressor.compress(&data, &mut output).unwrap();

        let mut restored = [0u8; 512];
        assert!(compressor
            .decompress(&output[..size], &mut restored)
            .is_err());
    }
}
