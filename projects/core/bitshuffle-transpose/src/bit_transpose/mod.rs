//! # Bit Transpose
//!
//! Treats a block of `n` elements, `es` bytes each, as an `n x (8 * es)` bit matrix and
//! transposes it, so each bit position becomes a plane of `n / 8` contiguous bytes.
//! Planes are emitted in bit position order: plane `8 * j + k` holds bit `k` (LSB first) of
//! byte `j` of every element.
//!
//! The transform runs in three stages:
//!
//! 1. Byte shuffle: group byte `j` of every element together (see [`crate::byte_shuffle`]).
//!    The buffer is now `es` byte rows of `n` bytes.
//! 2. Bit rows: every group of 8 consecutive bytes is transposed as an 8x8 bit matrix;
//!    bit `k` of the 8 bytes goes to row `k`. This produces 8 rows of `n * es / 8` bytes.
//!    This is the only stage that differs between kernels.
//! 3. Plane order: row `k` consists of `es` chunks of `n / 8` bytes, one per byte row.
//!    Chunk `j` of row `k` is moved to plane `8 * j + k`.
//!
//! The inverse undoes the stages in reverse order.

use bitshuffle_common::KernelId;
use core::ptr::copy_nonoverlapping;

pub(crate) mod portable;

#[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
pub(crate) mod sse2;

#[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
pub(crate) mod avx2;

#[cfg(test)]
pub(crate) mod tests;

use crate::byte_shuffle::{shuffle_bytes, unshuffle_bytes};

/// Bit transposes a block of `element_count` elements of `element_size` bytes.
///
/// # Arguments
///
/// * `input` - Pointer to the block to transpose
/// * `output` - Pointer to where the bit planes will be written
/// * `scratch` - Pointer to a temporary buffer of the same length as the block
/// * `element_count` - Number of elements in the block
/// * `element_size` - Size of each element in bytes
/// * `kernel` - Kernel used for the bit row stage
///
/// # Safety
///
/// - `input` must be valid for reads of `element_count * element_size` bytes
/// - `output` and `scratch` must be valid for writes of `element_count * element_size` bytes
/// - `input`, `output` and `scratch` must not overlap
/// - `element_count` must be a multiple of 8
/// - `element_size` must be non-zero
/// - `kernel` must be supported by the current CPU (see [`KernelId::is_supported`])
pub unsafe fn transpose(
    input: *const u8,
    output: *mut u8,
    scratch: *mut u8,
    element_count: usize,
    element_size: usize,
    kernel: KernelId,
) {
    debug_assert!(
        element_count % 8 == 0,
        "element_count must be a multiple of 8"
    );
    debug_assert!(element_size > 0, "element_size must be non-zero");

    let len_bytes = element_count * element_size;
    if element_size == 1 {
        // A single byte row; stages 1 and 3 are identity.
        bytes_to_bit_rows(input, output, len_bytes, kernel);
        return;
    }

    shuffle_bytes(input, output, element_count, element_size);
    bytes_to_bit_rows(output, scratch, len_bytes, kernel);
    order_bit_planes(scratch, output, len_bytes, element_size);
}

/// Inverse of [`transpose`].
///
/// # Safety
///
/// Same requirements as [`transpose`].
pub unsafe fn untranspose(
    input: *const u8,
    output: *mut u8,
    scratch: *mut u8,
    element_count: usize,
    element_size: usize,
    kernel: KernelId,
) {
    debug_assert!(
        element_count % 8 == 0,
        "element_count must be a multiple of 8"
    );
    debug_assert!(element_size > 0, "element_size must be non-zero");

    let len_bytes = element_count * element_size;
    if element_size == 1 {
        bit_rows_to_bytes(input, output, len_bytes, kernel);
        return;
    }

    unorder_bit_planes(input, output, len_bytes, element_size);
    bit_rows_to_bytes(output, scratch, len_bytes, kernel);
    unshuffle_bytes(scratch, output, element_count, element_size);
}

/// Stage 2 of the forward transform, dispatched to the given kernel.
///
/// # Safety
///
/// - `input` must be valid for reads of `len_bytes` bytes
/// - `output` must be valid for writes of `len_bytes` bytes
/// - `len_bytes` must be a multiple of 8
/// - `kernel` must be supported by the current CPU
#[inline]
pub unsafe fn bytes_to_bit_rows(
    input: *const u8,
    output: *mut u8,
    len_bytes: usize,
    kernel: KernelId,
) {
    match kernel {
        #[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
        KernelId::Avx2 => avx2::bytes_to_bit_rows(input, output, len_bytes),
        #[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
        KernelId::Sse2 => sse2::bytes_to_bit_rows(input, output, len_bytes),
        _ => portable::bytes_to_bit_rows(input, output, len_bytes),
    }
}

/// Inverse of [`bytes_to_bit_rows`], dispatched to the given kernel.
///
/// # Safety
///
/// Same requirements as [`bytes_to_bit_rows`].
#[inline]
pub unsafe fn bit_rows_to_bytes(
    input: *const u8,
    output: *mut u8,
    len_bytes: usize,
    kernel: KernelId,
) {
    match kernel {
        #[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
        KernelId::Avx2 => avx2::bit_rows_to_bytes(input, output, len_bytes),
        #[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
        KernelId::Sse2 => sse2::bit_rows_to_bytes(input, output, len_bytes),
        _ => portable::bit_rows_to_bytes(input, output, len_bytes),
    }
}

/// Stage 3: moves chunk `j` of bit row `k` to plane `8 * j + k`.
#[inline]
unsafe fn order_bit_planes(
    input: *const u8,
    output: *mut u8,
    len_bytes: usize,
    element_size: usize,
) {
    let plane_len = len_bytes / (8 * element_size);
    for bit in 0..8 {
        for byte in 0..element_size {
            copy_nonoverlapping(
                input.add((bit * element_size + byte) * plane_len),
                output.add((byte * 8 + bit) * plane_len),
                plane_len,
            );
        }
    }
}

#[inline]
unsafe fn unorder_bit_planes(
    input: *const u8,
    output: *mut u8,
    len_bytes: usize,
    element_size: usize,
) {
    let plane_len = len_bytes / (8 * element_size);
    for bit in 0..8 {
        for byte in 0..element_size {
            copy_nonoverlapping(
                input.add((byte * 8 + bit) * plane_len),
                output.add((bit * element_size + byte) * plane_len),
                plane_len,
            );
        }
    }
}
