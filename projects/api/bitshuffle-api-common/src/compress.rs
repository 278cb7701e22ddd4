//! Block compression operations.
//!
//! This module provides the trait the block framer uses to compress and decompress
//! individual blocks after they have been transposed.

use alloc::boxed::Box;
use core::fmt::{Debug, Display};
use thiserror::Error;

/// Trait for block compression operations.
///
/// Each call compresses or decompresses exactly one block, from one caller provided buffer
/// into another. Implementations can have their compression levels and other parameters
/// pre-configured.
///
/// # Important Notes
///
/// Calls may happen concurrently from multiple threads, hence the [`Sync`] bound. Any state
/// a codec needs (contexts, hash tables) must be created per call or be otherwise thread safe.
///
/// The framer only keeps compressed output that is strictly smaller than the input; a
/// compressor never needs to handle incompressible data specially.
pub trait BlockCompressor: Sync {
    /// The error type returned by compression operations.
    type Error: Display + Debug;

    /// Short name of the codec, used in error messages and logs.
    fn name(&self) -> &'static str;

    /// Returns the maximum number of bytes [`compress`] can write for an input of
    /// `len_bytes` bytes.
    ///
    /// # Parameters
    /// * `len_bytes` - Length of the input data in bytes
    ///
    /// [`compress`]: BlockCompressor::compress
    fn max_compressed_size(&self, len_bytes: usize) -> usize;

    /// Compresses `input` into `output`.
    ///
    /// # Parameters
    /// * `input` - The data to compress
    /// * `output` - Destination buffer, at least [`max_compressed_size`] bytes long
    ///
    /// # Returns
    /// The number of bytes written to `output`.
    ///
    /// [`max_compressed_size`]: BlockCompressor::max_compressed_size
    fn compress(&self, input: &[u8], output: &mut [u8]) -> Result<usize, Self::Error>;

    /// Decompresses `input` into `output`.
    ///
    /// # Parameters
    /// * `input` - The compressed data
    /// * `output` - Destination buffer, exactly as long as the original data
    ///
    /// # Returns
    /// The number of bytes written to `output`. The caller checks that this equals
    /// `output.len()`.
    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Blanket implementation of [`BlockCompressor`] for references to it.
impl<T: BlockCompressor + ?Sized> BlockCompressor for &T {
    type Error = T::Error;

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn max_compressed_size(&self, len_bytes: usize) -> usize {
        (**self).max_compressed_size(len_bytes)
    }

    fn compress(&self, input: &[u8], output: &mut [u8]) -> Result<usize, Self::Error> {
        (**self).compress(input, output)
    }

    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<usize, Self::Error> {
        (**self).decompress(input, output)
    }
}

/// Blanket implementation of [`BlockCompressor`] for any boxed variant of it.
impl<T: BlockCompressor + ?Sized> BlockCompressor for Box<T> {
    type Error = T::Error;

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn max_compressed_size(&self, len_bytes: usize) -> usize {
        (**self).max_compressed_size(len_bytes)
    }

    fn compress(&self, input: &[u8], output: &mut [u8]) -> Result<usize, Self::Error> {
        (**self).compress(input, output)
    }

    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<usize, Self::Error> {
        (**self).decompress(input, output)
    }
}

/// Compressor that stores data as is.
///
/// Since its output is never smaller than its input, every block framed with it is stored
/// raw. This is useful when only the transform is wanted, or when the frame will be
/// compressed as a whole by something else later.
///
/// ```rust
/// use bitshuffle_api_common::{BlockCompressor, NoCompression};
///
/// let mut output = [0u8; 4];
/// let written = NoCompression.compress(&[1, 2, 3, 4], &mut output).unwrap();
/// assert_eq!(written, 4);
/// assert_eq!(output, [1, 2, 3, 4]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompression;

/// Error returned by [`NoCompression`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NoCompressionError {
    /// The destination buffer can't hold the data.
    #[error("Destination too small. Needed: {needed}, actual: {actual}")]
    DestinationTooSmall { needed: usize, actual: usize },
}

impl NoCompression {
    fn copy(input: &[u8], output: &mut [u8]) -> Result<usize, NoCompressionError> {
        let actual = output.len();
        let destination = output.get_mut(..input.len()).ok_or(
            NoCompressionError::DestinationTooSmall {
                needed: input.len(),
                actual,
            },
        )?;
        destination.copy_from_slice(input);
        Ok(input.len())
    }
}

impl BlockCompressor for NoCompression {
    type Error = NoCompressionError;

    fn name(&self) -> &'static str {
        "none"
    }

    fn max_compressed_size(&self, len_bytes: usize) -> usize {
        len_bytes
    }

    fn compress(&self, input: &[u8], output: &mut [u8]) -> Result<usize, Self::Error> {
        Self::copy(input, output)
    }

    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<usize, Self::Error> {
        Self::copy(input, output)
    }
}
