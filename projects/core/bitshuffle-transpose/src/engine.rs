//! Safe, validated entry point to the transforms.
//!
//! A [`TransposeEngine`] is created once with an explicit [`KernelId`] and then used for
//! any number of blocks. The kernel never changes behind the caller's back; there is no
//! global "current kernel" state.

use crate::bit_transpose;
use crate::byte_shuffle;
use crate::error::TransposeError;
use crate::{ELEMENTS_PER_GROUP, MAX_ELEMENT_SIZE};
use alloc::vec;
use bitshuffle_common::KernelId;
use derive_enum_all_values::AllValues;

/// The reversible transform applied to each block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AllValues)]
pub enum TransformMode {
    /// Bit level transpose; every bit position becomes a plane.
    BitShuffle,
    /// Byte level transpose; every byte position becomes a plane.
    ByteShuffle,
}

impl Default for TransformMode {
    fn default() -> Self {
        TransformMode::BitShuffle
    }
}

impl TransformMode {
    /// Short, lowercase name of the mode.
    pub const fn name(self) -> &'static str {
        match self {
            TransformMode::BitShuffle => "bitshuffle",
            TransformMode::ByteShuffle => "byteshuffle",
        }
    }
}

/// Applies the bit transpose and byte shuffle using a fixed kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransposeEngine {
    kernel: KernelId,
}

impl TransposeEngine {
    /// Creates an engine using the given kernel.
    ///
    /// # Errors
    ///
    /// [`TransposeError::UnsupportedKernel`] if the kernel can't run on this CPU.
    pub fn new(kernel: KernelId) -> Result<Self, TransposeError> {
        if !kernel.is_supported() {
            return Err(TransposeError::UnsupportedKernel(kernel));
        }

        Ok(Self { kernel })
    }

    /// Creates an engine using the best kernel for the current CPU.
    pub fn detect() -> Self {
        let kernel = KernelId::detect();
        log::debug!("Selected transpose kernel: {kernel}");
        Self { kernel }
    }

    /// Creates an engine using the scalar kernel, available everywhere.
    pub const fn portable() -> Self {
        Self {
            kernel: KernelId::Portable,
        }
    }

    /// The kernel used by this engine.
    pub const fn kernel(&self) -> KernelId {
        self.kernel
    }

    /// Bit transposes `input` into `output`.
    ///
    /// Allocates a temporary buffer of `input.len()` bytes; use
    /// [`transpose_with_scratch`] when transforming many blocks.
    ///
    /// # Errors
    ///
    /// - [`TransposeError::InvalidBlockShape`] if `input` is not a positive multiple of 8
    ///   elements of `element_size` bytes, or `element_size` is out of range
    /// - [`TransposeError::OutputTooSmall`] if `output` is shorter than `input`
    ///
    /// [`transpose_with_scratch`]: Self::transpose_with_scratch
    pub fn transpose(
        &self,
        input: &[u8],
        output: &mut [u8],
        element_size: usize,
    ) -> Result<(), TransposeError> {
        let mut scratch = vec![0u8; input.len()];
        self.transpose_with_scratch(input, output, &mut scratch, element_size)
    }

    /// Inverse of [`transpose`](Self::transpose).
    ///
    /// # Errors
    ///
    /// Same as [`transpose`](Self::transpose).
    pub fn untranspose(
        &self,
        input: &[u8],
        output: &mut [u8],
        element_size: usize,
    ) -> Result<(), TransposeError> {
        let mut scratch = vec![0u8; input.len()];
        self.untranspose_with_scratch(input, output, &mut scratch, element_size)
    }

    /// Bit transposes `input` into `output`, using `scratch` as temporary storage.
    ///
    /// # Errors
    ///
    /// Same as [`transpose`](Self::transpose), plus [`TransposeError::ScratchTooSmall`] if
    /// `scratch` is shorter than `input`.
    pub fn transpose_with_scratch(
        &self,
        input: &[u8],
        output: &mut [u8],
        scratch: &mut [u8],
        element_size: usize,
    ) -> Result<(), TransposeError> {
        let element_count = validate_block(input, output, element_size)?;
        validate_scratch(input, scratch)?;

        // SAFETY: Lengths validated above, slices can't alias, kernel checked on construction.
        unsafe {
            bit_transpose::transpose(
                input.as_ptr(),
                output.as_mut_ptr(),
                scratch.as_mut_ptr(),
                element_count,
                element_size,
                self.kernel,
            );
        }
        Ok(())
    }

    /// Inverse of [`transpose_with_scratch`](Self::transpose_with_scratch).
    ///
    /// # Errors
    ///
    /// Same as [`transpose_with_scratch`](Self::transpose_with_scratch).
    pub fn untranspose_with_scratch(
        &self,
        input: &[u8],
        output: &mut [u8],
        scratch: &mut [u8],
        element_size: usize,
    ) -> Result<(), TransposeError> {
        let element_count = validate_block(input, output, element_size)?;
        validate_scratch(input, scratch)?;

        // SAFETY: Lengths validated above, slices can't alias, kernel checked on construction.
        unsafe {
            bit_transpose::untranspose(
                input.as_ptr(),
                output.as_mut_ptr(),
                scratch.as_mut_ptr(),
                element_count,
                element_size,
                self.kernel,
            );
        }
        Ok(())
    }

    /// Groups byte `j` of every element of `input` together.
    ///
    /// # Errors
    ///
    /// Same as [`transpose`](Self::transpose).
    pub fn shuffle_bytes(
        &self,
        input: &[u8],
        output: &mut [u8],
        element_size: usize,
    ) -> Result<(), TransposeError> {
        let element_count = validate_block(input, output, element_size)?;

        // SAFETY: Lengths validated above, slices can't alias.
        unsafe {
            byte_shuffle::shuffle_bytes(
                input.as_ptr(),
                output.as_mut_ptr(),
                element_count,
                element_size,
            );
        }
        Ok(())
    }

    /// Inverse of [`shuffle_bytes`](Self::shuffle_bytes).
    ///
    /// # Errors
    ///
    /// Same as [`transpose`](Self::transpose).
    pub fn unshuffle_bytes(
        &self,
        input: &[u8],
        output: &mut [u8],
        element_size: usize,
    ) -> Result<(), TransposeError> {
        let element_count = validate_block(input, output, element_size)?;

        // SAFETY: Lengths validated above, slices can't alias.
        unsafe {
            byte_shuffle::unshuffle_bytes(
                input.as_ptr(),
                output.as_mut_ptr(),
                element_count,
                element_size,
            );
        }
        Ok(())
    }

    /// Applies the forward transform selected by `mode`.
    ///
    /// `scratch` is only used by [`TransformMode::BitShuffle`].
    pub fn apply(
        &self,
        mode: TransformMode,
        input: &[u8],
        output: &mut [u8],
        scratch: &mut [u8],
        element_size: usize,
    ) -> Result<(), TransposeError> {
        match mode {
            TransformMode::BitShuffle => {
                self.transpose_with_scratch(input, output, scratch, element_size)
            }
            TransformMode::ByteShuffle => self.shuffle_bytes(input, output, element_size),
        }
    }

    /// Applies the inverse transform selected by `mode`.
    ///
    /// `scratch` is only used by [`TransformMode::BitShuffle`].
    pub fn invert(
        &self,
        mode: TransformMode,
        input: &[u8],
        output: &mut [u8],
        scratch: &mut [u8],
        element_size: usize,
    ) -> Result<(), TransposeError> {
        match mode {
            TransformMode::BitShuffle => {
                self.untranspose_with_scratch(input, output, scratch, element_size)
            }
            TransformMode::ByteShuffle => self.unshuffle_bytes(input, output, element_size),
        }
    }
}

impl Default for TransposeEngine {
    fn default() -> Self {
        Self::detect()
    }
}

/// Validates the shape of a block and returns its element count.
fn validate_block(
    input: &[u8],
    output: &[u8],
    element_size: usize,
) -> Result<usize, TransposeError> {
    if element_size == 0 || element_size > MAX_ELEMENT_SIZE {
        return Err(TransposeError::InvalidBlockShape {
            element_count: 0,
            element_size,
        });
    }

    let element_count = input.len() / element_size;
    if input.len() % element_size != 0
        || element_count == 0
        || element_count % ELEMENTS_PER_GROUP != 0
    {
        return Err(TransposeError::InvalidBlockShape {
            element_count,
            element_size,
        });
    }

    if output.len() < input.len() {
        return Err(TransposeError::OutputTooSmall {
            needed: input.len(),
            actual: output.len(),
        });
    }

    Ok(element_count)
}

fn validate_scratch(input: &[u8], scratch: &[u8]) -> Result<(), TransposeError> {
    if scratch.len() < input.len() {
        return Err(TransposeError::ScratchTooSmall {
            needed: input.len(),
            actual: scratch.len(),
        });
    }
    Ok(())
}
