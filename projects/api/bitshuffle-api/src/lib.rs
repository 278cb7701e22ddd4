#![doc = include_str!(concat!("../", core::env!("CARGO_PKG_README")))]
#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

extern crate alloc;

pub mod decode;
pub mod encode;
pub mod error;
pub mod format;
pub mod inspect;
pub mod iochain;
pub mod layout;
pub mod options;
pub mod shuffle;

pub use bitshuffle_api_common::{BlockCompressor, NoCompression};
pub use bitshuffle_common::KernelId;
pub use bitshuffle_transpose::{TransformMode, TransposeEngine, MAX_ELEMENT_SIZE};
pub use decode::{decompress, decompress_into};
pub use encode::{compress, compress_into};
pub use error::{BitshuffleError, CorruptionKind, ParameterError};
pub use format::{FrameHeader, RecordFlag, RecordHeader};
pub use inspect::{inspect, FrameSummary, RecordSummary};
pub use options::{BitshuffleOptions, BitshuffleOptionsBuilder};
pub use shuffle::{bitshuffle, bitunshuffle};

use format::{FRAME_HEADER_SIZE, RECORD_HEADER_SIZE};
use layout::{default_block_size, BlockLayout, DEFAULT_TARGET_BLOCK_BYTES};

/// Version of this crate.
pub const VERSION: &str = core::env!("CARGO_PKG_VERSION");

/// Largest frame [`compress`] can produce for `element_count` elements of `element_size`
/// bytes.
///
/// Since incompressible blocks are stored raw, this is the input length plus the frame and
/// record headers, whatever the compressor. `block_size: None` uses the default block size,
/// matching [`BitshuffleOptions::default`].
///
/// # Errors
///
/// [`BitshuffleError::InvalidParameters`] if the parameters are invalid or the size overflows.
///
/// ```rust
/// use bitshuffle_api::max_compressed_size;
///
/// // 2 blocks of 128 four byte elements: 13 byte header, 2 record headers of 5 bytes.
/// assert_eq!(max_compressed_size(256, 4, Some(128))?, 13 + 2 * 5 + 1024);
/// # Ok::<(), bitshuffle_api::BitshuffleError>(())
/// ```
pub fn max_compressed_size(
    element_count: usize,
    element_size: usize,
    block_size: Option<usize>,
) -> Result<usize, BitshuffleError> {
    let block_size = block_size
        .unwrap_or_else(|| default_block_size(element_size, DEFAULT_TARGET_BLOCK_BYTES));
    let layout = BlockLayout::new(element_count, element_size, block_size)?;

    layout
        .record_count()
        .checked_mul(RECORD_HEADER_SIZE)
        .and_then(|headers| headers.checked_add(FRAME_HEADER_SIZE))
        .and_then(|headers| headers.checked_add(layout.total_bytes()))
        .ok_or(BitshuffleError::InvalidParameters(
            ParameterError::BufferLength {
                length: usize::MAX,
                element_size,
            },
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty(0, 4, Some(64), 13)]
    #[case::tail_only(5, 2, Some(64), 13 + 5 + 10)]
    #[case::partial_and_tail(78, 1, Some(64), 13 + 3 * 5 + 78)]
    #[case::default_block(4096, 4, None, 13 + 2 * 5 + 16384)]
    fn max_compressed_size_counts_headers(
        #[case] element_count: usize,
        #[case] element_size: usize,
        #[case] block_size: Option<usize>,
        #[case] expected: usize,
    ) {
        assert_eq!(
            max_compressed_size(element_count, element_size, block_size),
            Ok(expected)
        );
    }

    #[test]
    fn max_compressed_size_bounds_real_frames() {
        let input: alloc::vec::Vec<u8> = (0..999u32).map(|x| (x * 31) as u8).collect();
        let frame = compress(&input, 3, &NoCompression, &BitshuffleOptions::default()).unwrap();
        assert!(frame.len() <= max_compressed_size(333, 3, None).unwrap());
    }

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
