//! Error types for bitshuffle operations.

use alloc::string::String;
use bitshuffle_common::KernelId;
use bitshuffle_transpose::TransposeError;
use core::fmt;
use thiserror::Error;

/// Errors that can occur while compressing, decompressing or transforming a buffer.
///
/// Every operation either completes fully or returns exactly one of these; no partially
/// written output is ever reported as success.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitshuffleError {
    /// The caller passed an invalid element size, block size or buffer length.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(#[from] ParameterError),

    /// A block reached the transpose kernel with an invalid shape.
    ///
    /// Parameters are validated before any block is processed, so this indicates a bug.
    #[error("Invalid shape for block {block}: {element_count} elements of {element_size} bytes")]
    InvalidBlockShape {
        /// Index of the rejected block
        block: usize,
        /// Number of elements in the rejected block
        element_count: usize,
        /// Size of each element in bytes
        element_size: usize,
    },

    /// The block compressor rejected a block.
    #[error("Compressor '{codec}' failed on block {block}: {message}")]
    CompressorFailure {
        /// Index of the failing block
        block: usize,
        /// Name of the codec, from [`BlockCompressor::name`]
        ///
        /// [`BlockCompressor::name`]: bitshuffle_api_common::BlockCompressor::name
        codec: &'static str,
        /// The compressor's error message
        message: String,
    },

    /// The frame is malformed or does not match what the caller expects.
    #[error("Corrupt frame{}: {kind}", AtBlock(.block))]
    CorruptFrame {
        /// Index of the offending block, if the problem is specific to one
        block: Option<usize>,
        /// What is wrong with the frame
        kind: CorruptionKind,
    },

    /// The output buffer is too small. Nothing has been written to it.
    #[error("Output buffer too small: need {needed} bytes, but only {actual} bytes available.")]
    OutOfSpace {
        /// The required size in bytes
        needed: usize,
        /// The actual size in bytes
        actual: usize,
    },

    /// The requested transpose kernel can't run on this CPU.
    #[error("Kernel '{0}' is not supported on this CPU")]
    UnsupportedKernel(KernelId),

    /// The worker pool could not be created.
    #[error("Failed to create worker pool: {0}")]
    WorkerPool(String),
}

impl BitshuffleError {
    /// Shorthand for a [`BitshuffleError::CorruptFrame`] tied to a block.
    pub(crate) fn corrupt_block(block: usize, kind: CorruptionKind) -> Self {
        Self::CorruptFrame {
            block: Some(block),
            kind,
        }
    }

    /// Shorthand for a [`BitshuffleError::CorruptFrame`] about the frame as a whole.
    pub(crate) fn corrupt_frame(kind: CorruptionKind) -> Self {
        Self::CorruptFrame { block: None, kind }
    }

    /// Index of the block that caused this error, if any.
    pub fn block(&self) -> Option<usize> {
        match self {
            Self::InvalidBlockShape { block, .. } | Self::CompressorFailure { block, .. } => {
                Some(*block)
            }
            Self::CorruptFrame { block, .. } => *block,
            _ => None,
        }
    }

    /// Converts an error from transforming block `block`.
    pub(crate) fn transform(block: usize, error: TransposeError) -> Self {
        match error {
            TransposeError::InvalidBlockShape {
                element_count,
                element_size,
            } => Self::InvalidBlockShape {
                block,
                element_count,
                element_size,
            },
            TransposeError::OutputTooSmall { needed, actual }
            | TransposeError::ScratchTooSmall { needed, actual } => {
                Self::OutOfSpace { needed, actual }
            }
            TransposeError::UnsupportedKernel(kernel) => Self::UnsupportedKernel(kernel),
        }
    }
}

/// Invalid caller supplied parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParameterError {
    /// Element size is zero or larger than 255 bytes.
    #[error("Element size must be between 1 and 255 bytes, got {0}")]
    ElementSize(usize),

    /// Block size is zero, not a multiple of 8, or too large for the frame format.
    #[error("Block size must be a positive multiple of 8 that fits the frame format, got {0}")]
    BlockSize(usize),

    /// The buffer is not a whole number of elements.
    #[error("Buffer length {length} is not a multiple of the element size {element_size}")]
    BufferLength {
        /// Length of the buffer in bytes
        length: usize,
        /// Size of each element in bytes
        element_size: usize,
    },
}

/// What is wrong with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CorruptionKind {
    /// The frame is shorter than its header.
    #[error("frame is shorter than the {0} byte header")]
    TruncatedHeader(usize),

    /// A header field does not match what the caller expects.
    #[error("header field '{field}' is {actual}, expected {expected}")]
    HeaderMismatch {
        /// Name of the header field
        field: &'static str,
        /// Value the caller expects
        expected: u64,
        /// Value stored in the frame
        actual: u64,
    },

    /// The header's block size is not a positive multiple of 8, or too large.
    #[error("header block size {0} is invalid")]
    InvalidBlockSize(u32),

    /// The header's element size is zero.
    #[error("header element size is zero")]
    InvalidElementSize,

    /// The header's total length is not a multiple of the element size.
    #[error("header total length {total_bytes} is not a multiple of the element size {element_size}")]
    MisalignedTotal {
        /// Decompressed length stored in the header
        total_bytes: u64,
        /// Element size stored in the header
        element_size: u8,
    },

    /// A record header or payload runs past the end of the frame.
    #[error("record extends past the end of the frame")]
    TruncatedRecord,

    /// A record has a flag other than RAW or COMPRESSED.
    #[error("unknown record flag {0}")]
    UnknownFlag(u8),

    /// A RAW record's payload is not exactly one block long.
    #[error("raw record holds {actual} bytes, block is {expected} bytes")]
    RawLengthMismatch {
        /// Length of the block in bytes
        expected: usize,
        /// Length of the payload in bytes
        actual: usize,
    },

    /// A COMPRESSED record's payload is not smaller than the block.
    #[error("compressed record holds {payload} bytes, not smaller than the {block_bytes} byte block")]
    CompressedNotSmaller {
        /// Length of the block in bytes
        block_bytes: usize,
        /// Length of the payload in bytes
        payload: usize,
    },

    /// The trailing elements that don't fill a group of 8 are marked as compressed.
    #[error("the untransformed tail must be stored raw")]
    CompressedTail,

    /// A compressed block decompressed to the wrong length.
    #[error("block decompressed to {actual} bytes, expected {expected}")]
    DecodedLengthMismatch {
        /// Length of the block in bytes
        expected: usize,
        /// Number of bytes produced by the compressor
        actual: usize,
    },

    /// There are bytes after the last record.
    #[error("{0} unexpected bytes after the last record")]
    TrailingBytes(usize),
}

/// Formats the " at block N" part of a [`BitshuffleError::CorruptFrame`] message.
struct AtBlock<'a>(&'a Option<usize>);

impl fmt::Display for AtBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(block) => write!(f, " at block {block}"),
            None => Ok(()),
        }
    }
}
