//! Error types for the transpose engine.

use bitshuffle_common::KernelId;
use thiserror::Error;

/// Errors returned by the safe wrappers of [`TransposeEngine`].
///
/// [`TransposeEngine`]: crate::TransposeEngine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransposeError {
    /// The block can't be transposed.
    ///
    /// Either `element_size` is zero or above [`MAX_ELEMENT_SIZE`], the buffer is not a whole
    /// number of elements, or `element_count` is not a positive multiple of 8.
    ///
    /// [`MAX_ELEMENT_SIZE`]: crate::MAX_ELEMENT_SIZE
    #[error("Invalid block shape: {element_count} elements of {element_size} bytes (count must be a positive multiple of 8, size 1..=255)")]
    InvalidBlockShape {
        element_count: usize,
        element_size: usize,
    },

    /// The output buffer is smaller than the input.
    #[error("Output buffer too small. Needed: {needed}, actual: {actual}")]
    OutputTooSmall { needed: usize, actual: usize },

    /// The scratch buffer is smaller than the input.
    #[error("Scratch buffer too small. Needed: {needed}, actual: {actual}")]
    ScratchTooSmall { needed: usize, actual: usize },

    /// The requested kernel can't run on this CPU.
    #[error("Kernel '{0}' is not supported on this CPU")]
    UnsupportedKernel(KernelId),
}
