use bitshuffle_common::intrinsics::transpose_bits_8x8;
use core::ptr::{read, read_unaligned, write, write_unaligned};
use multiversion::multiversion;

/// Splits every group of 8 bytes into 8 bit rows using scalar code.
///
/// Bit `k` of byte `j` in group `g` lands in bit `j` of byte `g` of row `k`; each row is
/// `len_bytes / 8` bytes long.
///
/// # Safety
///
/// - `input` must be valid for reads of `len_bytes` bytes
/// - `output` must be valid for writes of `len_bytes` bytes
/// - `len_bytes` must be a multiple of 8
#[inline]
pub unsafe fn bytes_to_bit_rows(input: *const u8, output: *mut u8, len_bytes: usize) {
    bytes_to_bit_rows_from(input, output, len_bytes, 0)
}

/// Same as [`bytes_to_bit_rows`], starting at group `first_group`.
///
/// Used by the vectorized kernels to finish the groups that don't fill a register.
///
/// # Safety
///
/// Same requirements as [`bytes_to_bit_rows`].
#[multiversion(targets(
    // x86-64-v3 without lahfsahf
    "x86_64+avx+avx2+bmi1+bmi2+cmpxchg16b+f16c+fma+fxsr+lzcnt+movbe+popcnt+sse+sse2+sse3+sse4.1+sse4.2+ssse3+xsave",
    // x86-64-v2 without lahfsahf
    "x86_64+cmpxchg16b+fxsr+popcnt+sse+sse2+sse3+sse4.1+sse4.2+ssse3",
))]
pub unsafe fn bytes_to_bit_rows_from(
    input: *const u8,
    output: *mut u8,
    len_bytes: usize,
    first_group: usize,
) {
    unsafe {
        debug_assert!(len_bytes % 8 == 0, "len_bytes must be a multiple of 8");

        let row_len = len_bytes / 8;
        for group in first_group..row_len {
            let value = u64::from_le(read_unaligned(input.add(group * 8) as *const u64));
            let rows = transpose_bits_8x8(value).to_le_bytes();
            for (row, byte) in rows.iter().enumerate() {
                write(output.add(row * row_len + group), *byte);
            }
        }
    }
}

/// Inverse of [`bytes_to_bit_rows`] using scalar code.
///
/// # Safety
///
/// Same requirements as [`bytes_to_bit_rows`].
#[inline]
pub unsafe fn bit_rows_to_bytes(input: *const u8, output: *mut u8, len_bytes: usize) {
    bit_rows_to_bytes_from(input, output, len_bytes, 0)
}

/// Same as [`bit_rows_to_bytes`], starting at group `first_group`.
///
/// # Safety
///
/// Same requirements as [`bytes_to_bit_rows`].
#[multiversion(targets(
    // x86-64-v3 without lahfsahf
    "x86_64+avx+avx2+bmi1+bmi2+cmpxchg16b+f16c+fma+fxsr+lzcnt+movbe+popcnt+sse+sse2+sse3+sse4.1+sse4.2+ssse3+xsave",
    // x86-64-v2 without lahfsahf
    "x86_64+cmpxchg16b+fxsr+popcnt+sse+sse2+sse3+sse4.1+sse4.2+ssse3",
))]
pub unsafe fn bit_rows_to_bytes_from(
    input: *const u8,
    output: *mut u8,
    len_bytes: usize,
    first_group: usize,
) {
    unsafe {
        debug_assert!(len_bytes % 8 == 0, "len_bytes must be a multiple of 8");

        let row_len = len_bytes / 8;
        for group in first_group..row_len {
            let mut rows = [0u8; 8];
            for (row, byte) in rows.iter_mut().enumerate() {
                *byte = read(input.add(row * row_len + group));
            }

            let value = transpose_bits_8x8(u64::from_le_bytes(rows));
            write_unaligned(output.add(group * 8) as *mut u64, value.to_le());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit_transpose::tests::{
        assert_implementation_matches_reference, bit_rows_reference, generate_test_data,
    };
    use alloc::vec;

    #[test]
    fn diagonal_group_is_unchanged() {
        let input = [0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x80];
        let mut output = [0u8; 8];
        unsafe { bytes_to_bit_rows(input.as_ptr(), output.as_mut_ptr(), 8) };
        assert_eq!(output, input);
    }

    #[test]
    fn matches_reference() {
        for num_groups in 1..=128 {
            let input = generate_test_data(num_groups * 8);
            let expected = bit_rows_reference(&input);
            let mut output = vec![0u8; input.len()];

            unsafe { bytes_to_bit_rows(input.as_ptr(), output.as_mut_ptr(), input.len()) };
            assert_implementation_matches_reference(&expected, &output, "portable", num_groups);
        }
    }

    #[test]
    fn inverse_restores_input() {
        for num_groups in 1..=128 {
            let input = generate_test_data(num_groups * 8);
            let mut rows = vec![0u8; input.len()];
            let mut restored = vec![0u8; input.len()];

            unsafe {
                bytes_to_bit_rows(input.as_ptr(), rows.as_mut_ptr(), input.len());
                bit_rows_to_bytes(rows.as_ptr(), restored.as_mut_ptr(), input.len());
            }
            assert_eq!(restored, input, "round trip failed for {num_groups} groups");
        }
    }
}
