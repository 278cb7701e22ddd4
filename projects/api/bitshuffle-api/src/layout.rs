//! # Block Layout
//!
//! Splits a buffer of `element_count` elements into the blocks that make up a frame:
//!
//! - `element_count / block_size` full blocks of `block_size` elements
//! - one partial block holding the remaining elements, rounded down to a multiple of 8
//! - a tail of fewer than 8 elements, which can't be transposed and is stored as is
//!
//! Each block becomes exactly one record. The layout is a pure function of the three
//! parameters, so the decoder rebuilds it from the frame header.

use crate::error::ParameterError;
use bitshuffle_transpose::{ELEMENTS_PER_GROUP, MAX_ELEMENT_SIZE};

/// Default block footprint in bytes. Small enough to stay in L1 cache on most CPUs.
pub const DEFAULT_TARGET_BLOCK_BYTES: usize = 8192;

/// Smallest block size picked by [`default_block_size`], in elements.
pub const MIN_DEFAULT_BLOCK_SIZE: usize = 128;

/// Picks a block size for elements of `element_size` bytes, aiming for blocks of
/// `target_bytes` bytes.
///
/// The result is `target_bytes / element_size` rounded down to a multiple of 8, and never
/// below [`MIN_DEFAULT_BLOCK_SIZE`].
///
/// ```rust
/// use bitshuffle_api::layout::default_block_size;
///
/// assert_eq!(default_block_size(4, 8192), 2048);
/// assert_eq!(default_block_size(3, 8192), 2728);
/// assert_eq!(default_block_size(255, 8192), 128);
/// ```
pub const fn default_block_size(element_size: usize, target_bytes: usize) -> usize {
    let element_size = if element_size == 0 { 1 } else { element_size };
    let block_size = (target_bytes / element_size) & !(ELEMENTS_PER_GROUP - 1);
    if block_size < MIN_DEFAULT_BLOCK_SIZE {
        MIN_DEFAULT_BLOCK_SIZE
    } else {
        block_size
    }
}

/// Validates an element size.
pub(crate) fn validate_element_size(element_size: usize) -> Result<(), ParameterError> {
    if element_size == 0 || element_size > MAX_ELEMENT_SIZE {
        return Err(ParameterError::ElementSize(element_size));
    }
    Ok(())
}

/// Validates a block size for elements of `element_size` bytes.
///
/// Both the element count and the byte length of a block must fit the u32 fields of the
/// frame format.
pub(crate) fn validate_block_size(
    block_size: usize,
    element_size: usize,
) -> Result<(), ParameterError> {
    let fits = u32::try_from(block_size).is_ok()
        && block_size
            .checked_mul(element_size)
            .is_some_and(|bytes| u32::try_from(bytes).is_ok());

    if block_size == 0 || block_size % ELEMENTS_PER_GROUP != 0 || !fits {
        return Err(ParameterError::BlockSize(block_size));
    }
    Ok(())
}

/// What a block holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// A multiple of 8 elements, transformed before compression.
    Transformed,
    /// Fewer than 8 trailing elements, always stored RAW and untransformed.
    Tail,
}

/// One block of a [`BlockLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    /// Position of the block in the frame.
    pub index: usize,
    /// Offset of the block's first byte in the uncompressed buffer.
    pub byte_offset: usize,
    /// Number of elements in the block.
    pub element_count: usize,
    /// Number of bytes in the block.
    pub byte_len: usize,
    /// Whether the block is transformed.
    pub kind: SpanKind,
}

impl BlockSpan {
    /// Byte range of the block in the uncompressed buffer.
    pub fn byte_range(&self) -> core::ops::Range<usize> {
        self.byte_offset..self.byte_offset + self.byte_len
    }
}

/// How a buffer is split into blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    element_count: usize,
    element_size: usize,
    block_size: usize,
    full_blocks: usize,
    partial_elements: usize,
    tail_elements: usize,
}

impl BlockLayout {
    /// Plans the blocks for `element_count` elements of `element_size` bytes.
    ///
    /// # Errors
    ///
    /// - [`ParameterError::ElementSize`] if `element_size` is 0 or above 255
    /// - [`ParameterError::BlockSize`] if `block_size` is 0, not a multiple of 8, or a
    ///   block would not fit the frame format
    /// - [`ParameterError::BufferLength`] if the buffer length overflows `usize`
    pub fn new(
        element_count: usize,
        element_size: usize,
        block_size: usize,
    ) -> Result<Self, ParameterError> {
        validate_element_size(element_size)?;
        validate_block_size(block_size, element_size)?;
        if element_count.checked_mul(element_size).is_none() {
            return Err(ParameterError::BufferLength {
                length: usize::MAX,
                element_size,
            });
        }

        let full_blocks = element_count / block_size;
        let remainder = element_count % block_size;
        let tail_elements = remainder % ELEMENTS_PER_GROUP;

        Ok(Self {
            element_count,
            element_size,
            block_size,
            full_blocks,
            partial_elements: remainder - tail_elements,
            tail_elements,
        })
    }

    /// Plans the blocks for a buffer of `length` bytes.
    ///
    /// # Errors
    ///
    /// Same as [`BlockLayout::new`], plus [`ParameterError::BufferLength`] if `length` is
    /// not a whole number of elements.
    pub fn for_buffer(
        length: usize,
        element_size: usize,
        block_size: usize,
    ) -> Result<Self, ParameterError> {
        validate_element_size(element_size)?;
        if length % element_size != 0 {
            return Err(ParameterError::BufferLength {
                length,
                element_size,
            });
        }
        Self::new(length / element_size, element_size, block_size)
    }

    /// Total number of elements.
    pub const fn element_count(&self) -> usize {
        self.element_count
    }

    /// Size of each element in bytes.
    pub const fn element_size(&self) -> usize {
        self.element_size
    }

    /// Number of elements in a full block.
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Length of a full block in bytes.
    pub const fn block_bytes(&self) -> usize {
        self.block_size * self.element_size
    }

    /// Length of the whole buffer in bytes.
    pub const fn total_bytes(&self) -> usize {
        self.element_count * self.element_size
    }

    /// Number of elements stored untransformed at the end.
    pub const fn tail_elements(&self) -> usize {
        self.tail_elements
    }

    /// Number of records in a frame with this layout.
    pub const fn record_count(&self) -> usize {
        self.full_blocks
            + (self.partial_elements != 0) as usize
            + (self.tail_elements != 0) as usize
    }

    /// Returns the block at `index`, or `None` past the last block.
    pub fn span(&self, index: usize) -> Option<BlockSpan> {
        let partial_blocks = (self.partial_elements != 0) as usize;
        let (byte_offset, element_count, kind) = if index < self.full_blocks {
            (index * self.block_bytes(), self.block_size, SpanKind::Transformed)
        } else if index < self.full_blocks + partial_blocks {
            (
                self.full_blocks * self.block_bytes(),
                self.partial_elements,
                SpanKind::Transformed,
            )
        } else if index < self.record_count() {
            (
                self.total_bytes() - self.tail_elements * self.element_size,
                self.tail_elements,
                SpanKind::Tail,
            )
        } else {
            return None;
        };

        Some(BlockSpan {
            index,
            byte_offset,
            element_count,
            byte_len: element_count * self.element_size,
            kind,
        })
    }

    /// Iterates over every block in order.
    pub fn spans(&self) -> impl Iterator<Item = BlockSpan> + '_ {
        (0..self.record_count()).map_while(|index| self.span(index))
    }
}
