#![doc = include_str!(concat!("../", core::env!("CARGO_PKG_README")))]
#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

use bitshuffle_api_common::BlockCompressor;
use core::ffi::c_void;
use thiserror::Error;
use zstd_sys::ZSTD_cParameter::*;
use zstd_sys::ZSTD_dParameter::*;
use zstd_sys::ZSTD_format_e::*;
use zstd_sys::*;

/// Errors that can occur during ZStandard block compression.
#[derive(Debug, Error)]
pub enum ZStandardError {
    /// Invalid compression level
    #[error("Invalid compression level: {0}")]
    InvalidLevel(i32),

    /// Memory allocation failed
    #[error("Memory allocation failed")]
    AllocationFailed,

    /// ZStandard internal error
    #[error("ZStandard internal error: {0:?}")]
    ZStandardInternal(ZSTD_ErrorCode),
}

/// ZStandard implementation of [`BlockCompressor`].
///
/// The compression level is configured when creating the compressor instance.
/// A fresh compression context is created for every block, so one instance can be shared
/// between threads.
#[derive(Debug, Clone, Copy)]
pub struct ZStandardBlockCompressor {
    compression_level: i32,
}

impl ZStandardBlockCompressor {
    /// Creates a new ZStandard block compressor with the specified compression level.
    ///
    /// # Parameters
    /// * `compression_level` - Compression level (1-22, where 1 is fastest and 22 is best compression)
    pub fn new(compression_level: i32) -> Result<Self, ZStandardError> {
        // Validate compression level
        if !(1..=22).contains(&compression_level) {
            return Err(ZStandardError::InvalidLevel(compression_level));
        }

        Ok(Self { compression_level })
    }

    /// Creates a new ZStandard block compressor with compression level 1 (fastest).
    pub fn new_fast() -> Self {
        Self {
            compression_level: 1,
        }
    }

    /// Creates a new ZStandard block compressor with compression level 3 (default).
    pub fn new_default() -> Self {
        Self {
            compression_level: 3,
        }
    }

    /// Creates a new ZStandard block compressor with compression level 22 (best compression).
    pub fn new_best() -> Self {
        Self {
            compression_level: 22,
        }
    }

    /// The configured compression level.
    pub fn compression_level(&self) -> i32 {
        self.compression_level
    }
}

impl Default for ZStandardBlockCompressor {
    fn default() -> Self {
        Self::new_default()
    }
}

impl BlockCompressor for ZStandardBlockCompressor {
    type Error = ZStandardError;

    fn name(&self) -> &'static str {
        "zstd"
    }

    fn max_compressed_size(&self, len_bytes: usize) -> usize {
        unsafe { ZSTD_compressBound(len_bytes) }
    }

    fn compress(&self, input: &[u8], output: &mut [u8]) -> Result<usize, Self::Error> {
        compress(self.compression_level, input, output)
    }

    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<usize, Self::Error> {
        decompress(input, output)
    }
}

/// Compresses data with ZStandard into a magicless frame.
/// Does not use fallback to 'copy' if compression is ineffective; the framer handles that.
///
/// # Parameters
///
/// * `level`: Level at which we are compressing.
/// * `source`: Source data to compress.
/// * `destination`: Destination buffer.
fn compress(level: i32, source: &[u8], destination: &mut [u8]) -> Result<usize, ZStandardError> {
    // Create a compression context
    let cctx = unsafe { ZSTD_createCCtx() };
    if cctx.is_null() {
        return Err(ZStandardError::AllocationFailed);
    }

    // Set compression parameters (magicless format, no extra headers)
    zstd_setcommoncompressparams(cctx, level);

    // Perform compression
    let result = unsafe {
        ZSTD_compress2(
            cctx,
            destination.as_mut_ptr() as *mut c_void,
            destination.len(),
            source.as_ptr() as *const c_void,
            source.len(),
        )
    };

    // Free the context
    unsafe {
        ZSTD_freeCCtx(cctx);
    }

    check_result(result)
}

/// Decompresses a magicless frame produced by [`compress`].
fn decompress(source: &[u8], destination: &mut [u8]) -> Result<usize, ZStandardError> {
    let dctx = unsafe { ZSTD_createDCtx() };
    if dctx.is_null() {
        return Err(ZStandardError::AllocationFailed);
    }

    let result = unsafe {
        let format = ZSTD_DCtx_setParameter(
            dctx,
            ZSTD_d_experimentalParam1, // zstd_d_format
            ZSTD_f_zstd1_magicless as i32,
        );

        if ZSTD_isError(format) != 0 {
            format
        } else {
            ZSTD_decompressDCtx(
                dctx,
                destination.as_mut_ptr() as *mut c_void,
                destination.len(),
                source.as_ptr() as *const c_void,
                source.len(),
            )
        }
    };

    unsafe {
        ZSTD_freeDCtx(dctx);
    }

    check_result(result)
}

#[inline(always)]
fn check_result(result: usize) -> Result<usize, ZStandardError> {
    if unsafe { ZSTD_isError(result) } == 0 {
        return Ok(result);
    }

    Err(ZStandardError::ZStandardInternal(unsafe {
        ZSTD_getErrorCode(result)
    }))
}

/// Sets common compression parameters matching the CLI's behavior.
#[inline(always)]
fn zstd_setcommoncompressparams(cctx: *mut ZSTD_CCtx_s, level: i32) {
    unsafe {
        ZSTD_CCtx_setParameter(cctx, ZSTD_c_compressionLevel, level);
        ZSTD_CCtx_setParameter(
            cctx,
            ZSTD_c_experimentalParam2, // zstd_c_format
            ZSTD_f_zstd1_magicless as i32,
        );
        ZSTD_CCtx_setParameter(cctx, ZSTD_c_contentSizeFlag, 0);
        ZSTD_CCtx_setParameter(cctx, ZSTD_c_checksumFlag, 0);
        ZSTD_CCtx_setParameter(cctx, ZSTD_c_dictIDFlag, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn compress_simple_data() {
        let compressor = ZStandardBlockCompressor::new_default();
        let data =
            b"Hello, world! This is a test string for compression. test test test test test test!!";

        // Get max compressed size and allocate buffer
        let max_size = compressor.max_compressed_size(data.len());
        let mut output_buffer = vec![0u8; max_size];

        let size = compressor.compress(data, &mut output_buffer).unwrap();
        assert!(size > 0);
        assert!(size < data.len()); // Should be smaller than input for this test case

        let mut restored = vec![0u8; data.len()];
        let restored_size = compressor
            .decompress(&output_buffer[..size], &mut restored)
            .unwrap();
        assert_eq!(restored_size, data.len());
        assert_eq!(&restored[..], &data[..]);
    }

    #[rstest]
    #[case::fast(ZStandardBlockCompressor::new_fast())]
    #[case::default(ZStandardBlockCompressor::new_default())]
    #[case::level10(ZStandardBlockCompressor::new(10).unwrap())]
    fn roundtrips_zero_block(#[case] compressor: ZStandardBlockCompressor) {
        let data = [0u8; 8192];
        let mut output = vec![0u8; compressor.max_compressed_size(data.len())];
        let size = compressor.compress(&data, &mut output).unwrap();
        assert!(size < 64);

        let mut restored = vec![0xAAu8; data.len()];
        let restored_size = compressor
            .decompress(&output[..size], &mut restored)
            .unwrap();
        assert_eq!(restored_size, data.len());
        assert!(restored.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_invalid_compression_level() {
        let result = ZStandardBlockCompressor::new(0);
        assert!(matches!(result, Err(ZStandardError::InvalidLevel(0))));

        let result = ZStandardBlockCompressor::new(23);
        assert!(matches!(result, Err(ZStandardError::InvalidLevel(23))));
    }

    #[test]
    fn rejects_garbage_input() {
        let compressor = ZStandardBlockCompressor::new_default();
        let garbage = [0xFFu8; 16];
        let mut restored = [0u8; 64];
        assert!(matches!(
            compressor.decompress(&garbage, &mut restored),
            Err(ZStandardError::ZStandardInternal(_))
        ));
    }
}
