#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;
use core::ptr::write_unaligned;

use super::portable::{bit_rows_to_bytes_from, bytes_to_bit_rows_from};
use bitshuffle_common::intrinsics::{SWAP_1X1_MASK, SWAP_2X2_MASK, SWAP_4X4_MASK};

/// Splits every group of 8 bytes into 8 bit rows using SSE2 instructions.
///
/// Each step loads 16 bytes (2 groups). `pmovmskb` gathers the top bit of every byte, giving
/// 16 bits of bit row 7; shifting every byte left by one and repeating yields rows 6 to 0.
///
/// # Safety
///
/// - `input` must be valid for reads of `len_bytes` bytes
/// - `output` must be valid for writes of `len_bytes` bytes
/// - `len_bytes` must be a multiple of 8
/// - CPU must support SSE2 instructions
#[target_feature(enable = "sse2")]
pub unsafe fn bytes_to_bit_rows(input: *const u8, output: *mut u8, len_bytes: usize) {
    debug_assert!(len_bytes % 8 == 0, "len_bytes must be a multiple of 8");

    let row_len = len_bytes / 8;
    let vectorized_len = len_bytes & !15;

    let mut offset = 0;
    while offset < vectorized_len {
        let mut bytes = _mm_loadu_si128(input.add(offset) as *const __m128i);
        let row_offset = offset / 8;

        for row in (0..8).rev() {
            let bits = _mm_movemask_epi8(bytes) as u16;
            bytes = _mm_slli_epi16(bytes, 1);
            write_unaligned(
                output.add(row * row_len + row_offset) as *mut u16,
                bits.to_le(),
            );
        }

        offset += 16;
    }

    // Remaining group, if any.
    bytes_to_bit_rows_from(input, output, len_bytes, vectorized_len / 8);
}

/// Inverse of [`bytes_to_bit_rows`] using SSE2 instructions.
///
/// Each step loads 16 bytes from each of the 8 bit rows, interleaves them with a cascade of
/// unpacks so that every 64-bit lane holds the 8 row bytes of one group, then runs the 8x8
/// bit transpose on both lanes at once. 16 groups (128 bytes) are produced per step.
///
/// # Safety
///
/// - `input` must be valid for reads of `len_bytes` bytes
/// - `output` must be valid for writes of `len_bytes` bytes
/// - `len_bytes` must be a multiple of 8
/// - CPU must support SSE2 instructions
#[target_feature(enable = "sse2")]
pub unsafe fn bit_rows_to_bytes(input: *const u8, output: *mut u8, len_bytes: usize) {
    debug_assert!(len_bytes % 8 == 0, "len_bytes must be a multiple of 8");

    let row_len = len_bytes / 8;
    let vectorized_groups = row_len & !15;

    let mask_1x1 = _mm_set1_epi64x(SWAP_1X1_MASK as i64);
    let mask_2x2 = _mm_set1_epi64x(SWAP_2X2_MASK as i64);
    let mask_4x4 = _mm_set1_epi64x(SWAP_4X4_MASK as i64);

    let mut group = 0;
    while group < vectorized_groups {
        let row_ptr = input.add(group);
        let r0 = _mm_loadu_si128(row_ptr as *const __m128i);
        let r1 = _mm_loadu_si128(row_ptr.add(row_len) as *const __m128i);
        let r2 = _mm_loadu_si128(row_ptr.add(row_len * 2) as *const __m128i);
        let r3 = _mm_loadu_si128(row_ptr.add(row_len * 3) as *const __m128i);
        let r4 = _mm_loadu_si128(row_ptr.add(row_len * 4) as *const __m128i);
        let r5 = _mm_loadu_si128(row_ptr.add(row_len * 5) as *const __m128i);
        let r6 = _mm_loadu_si128(row_ptr.add(row_len * 6) as *const __m128i);
        let r7 = _mm_loadu_si128(row_ptr.add(row_len * 7) as *const __m128i);

        // Pairs of rows: [r0[i] r1[i]] for i in 0..8 (lo) and 8..16 (hi)
        let r01_lo = _mm_unpacklo_epi8(r0, r1);
        let r01_hi = _mm_unpackhi_epi8(r0, r1);
        let r23_lo = _mm_unpacklo_epi8(r2, r3);
        let r23_hi = _mm_unpackhi_epi8(r2, r3);
        let r45_lo = _mm_unpacklo_epi8(r4, r5);
        let r45_hi = _mm_unpackhi_epi8(r4, r5);
        let r67_lo = _mm_unpacklo_epi8(r6, r7);
        let r67_hi = _mm_unpackhi_epi8(r6, r7);

        // Quads of rows: [r0[i] r1[i] r2[i] r3[i]], 4 groups per register
        let r0123_g0 = _mm_unpacklo_epi16(r01_lo, r23_lo);
        let r0123_g4 = _mm_unpackhi_epi16(r01_lo, r23_lo);
        let r0123_g8 = _mm_unpacklo_epi16(r01_hi, r23_hi);
        let r0123_g12 = _mm_unpackhi_epi16(r01_hi, r23_hi);
        let r4567_g0 = _mm_unpacklo_epi16(r45_lo, r67_lo);
        let r4567_g4 = _mm_unpackhi_epi16(r45_lo, r67_lo);
        let r4567_g8 = _mm_unpacklo_epi16(r45_hi, r67_hi);
        let r4567_g12 = _mm_unpackhi_epi16(r45_hi, r67_hi);

        // All 8 rows: one group per 64-bit lane, 2 groups per register
        let groups = [
            _mm_unpacklo_epi32(r0123_g0, r4567_g0),
            _mm_unpackhi_epi32(r0123_g0, r4567_g0),
            _mm_unpacklo_epi32(r0123_g4, r4567_g4),
            _mm_unpackhi_epi32(r0123_g4, r4567_g4),
            _mm_unpacklo_epi32(r0123_g8, r4567_g8),
            _mm_unpackhi_epi32(r0123_g8, r4567_g8),
            _mm_unpacklo_epi32(r0123_g12, r4567_g12),
            _mm_unpackhi_epi32(r0123_g12, r4567_g12),
        ];

        let out_ptr = output.add(group * 8);
        for (index, value) in groups.iter().enumerate() {
            let transposed = transpose_bits_8x8_sse2(*value, mask_1x1, mask_2x2, mask_4x4);
            _mm_storeu_si128(out_ptr.add(index * 16) as *mut __m128i, transposed);
        }

        group += 16;
    }

    bit_rows_to_bytes_from(input, output, len_bytes, vectorized_groups);
}

/// Runs the xor-shift 8x8 bit transpose on both 64-bit lanes.
#[target_feature(enable = "sse2")]
#[inline]
unsafe fn transpose_bits_8x8_sse2(
    x: __m128i,
    mask_1x1: __m128i,
    mask_2x2: __m128i,
    mask_4x4: __m128i,
) -> __m128i {
    let t = _mm_and_si128(_mm_xor_si128(x, _mm_srli_epi64(x, 7)), mask_1x1);
    let x = _mm_xor_si128(x, _mm_xor_si128(t, _mm_slli_epi64(t, 7)));
    let t = _mm_and_si128(_mm_xor_si128(x, _mm_srli_epi64(x, 14)), mask_2x2);
    let x = _mm_xor_si128(x, _mm_xor_si128(t, _mm_slli_epi64(t, 14)));
    let t = _mm_and_si128(_mm_xor_si128(x, _mm_srli_epi64(x, 28)), mask_4x4);
    _mm_xor_si128(x, _mm_xor_si128(t, _mm_slli_epi64(t, 28)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit_transpose::tests::{
        test_bit_rows_kernel, test_inverse_bit_rows_kernel, BitRowFn,
    };
    use bitshuffle_common::cpu_detect::has_sse2;
    use rstest::rstest;

    #[rstest]
    #[case(bytes_to_bit_rows, "sse2_movemask")]
    fn test_sse2_bit_rows(#[case] implementation: BitRowFn, #[case] impl_name: &str) {
        if !has_sse2() {
            return;
        }

        test_bit_rows_kernel(implementation, impl_name);
    }

    #[rstest]
    #[case(bit_rows_to_bytes, "sse2_unpack")]
    fn test_sse2_inverse_bit_rows(#[case] implementation: BitRowFn, #[case] impl_name: &str) {
        if !has_sse2() {
            return;
        }

        test_inverse_bit_rows_kernel(implementation, impl_name);
    }
}
