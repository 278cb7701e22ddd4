#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;
use core::ptr::write_unaligned;

use super::portable::{bit_rows_to_bytes_from, bytes_to_bit_rows_from};
use bitshuffle_common::intrinsics::{SWAP_1X1_MASK, SWAP_2X2_MASK, SWAP_4X4_MASK};

/// Splits every group of 8 bytes into 8 bit rows using AVX2 instructions.
///
/// Same approach as the SSE2 kernel, with 32 bytes (4 groups) per step.
///
/// # Safety
///
/// - `input` must be valid for reads of `len_bytes` bytes
/// - `output` must be valid for writes of `len_bytes` bytes
/// - `len_bytes` must be a multiple of 8
/// - CPU must support AVX2 instructions
#[target_feature(enable = "avx2")]
pub unsafe fn bytes_to_bit_rows(input: *const u8, output: *mut u8, len_bytes: usize) {
    debug_assert!(len_bytes % 8 == 0, "len_bytes must be a multiple of 8");

    let row_len = len_bytes / 8;
    let vectorized_len = len_bytes & !31;

    let mut offset = 0;
    while offset < vectorized_len {
        let mut bytes = _mm256_loadu_si256(input.add(offset) as *const __m256i);
        let row_offset = offset / 8;

        for row in (0..8).rev() {
            let bits = _mm256_movemask_epi8(bytes) as u32;
            bytes = _mm256_slli_epi16(bytes, 1);
            write_unaligned(
                output.add(row * row_len + row_offset) as *mut u32,
                bits.to_le(),
            );
        }

        offset += 32;
    }

    bytes_to_bit_rows_from(input, output, len_bytes, vectorized_len / 8);
}

/// Inverse of [`bytes_to_bit_rows`] using AVX2 instructions.
///
/// The unpack instructions operate on each 128-bit lane independently, so after the cascade
/// the low lanes hold groups 0 to 15 of the step and the high lanes hold groups 16 to 31.
/// 32 groups (256 bytes) are produced per step.
///
/// # Safety
///
/// - `input` must be valid for reads of `len_bytes` bytes
/// - `output` must be valid for writes of `len_bytes` bytes
/// - `len_bytes` must be a multiple of 8
/// - CPU must support AVX2 instructions
#[target_feature(enable = "avx2")]
pub unsafe fn bit_rows_to_bytes(input: *const u8, output: *mut u8, len_bytes: usize) {
    debug_assert!(len_bytes % 8 == 0, "len_bytes must be a multiple of 8");

    let row_len = len_bytes / 8;
    let vectorized_groups = row_len & !31;

    let mask_1x1 = _mm256_set1_epi64x(SWAP_1X1_MASK as i64);
    let mask_2x2 = _mm256_set1_epi64x(SWAP_2X2_MASK as i64);
    let mask_4x4 = _mm256_set1_epi64x(SWAP_4X4_MASK as i64);

    let mut group = 0;
    while group < vectorized_groups {
        let row_ptr = input.add(group);
        let r0 = _mm256_loadu_si256(row_ptr as *const __m256i);
        let r1 = _mm256_loadu_si256(row_ptr.add(row_len) as *const __m256i);
        let r2 = _mm256_loadu_si256(row_ptr.add(row_len * 2) as *const __m256i);
        let r3 = _mm256_loadu_si256(row_ptr.add(row_len * 3) as *const __m256i);
        let r4 = _mm256_loadu_si256(row_ptr.add(row_len * 4) as *const __m256i);
        let r5 = _mm256_loadu_si256(row_ptr.add(row_len * 5) as *const __m256i);
        let r6 = _mm256_loadu_si256(row_ptr.add(row_len * 6) as *const __m256i);
        let r7 = _mm256_loadu_si256(row_ptr.add(row_len * 7) as *const __m256i);

        let r01_lo = _mm256_unpacklo_epi8(r0, r1);
        let r01_hi = _mm256_unpackhi_epi8(r0, r1);
        let r23_lo = _mm256_unpacklo_epi8(r2, r3);
        let r23_hi = _mm256_unpackhi_epi8(r2, r3);
        let r45_lo = _mm256_unpacklo_epi8(r4, r5);
        let r45_hi = _mm256_unpackhi_epi8(r4, r5);
        let r67_lo = _mm256_unpacklo_epi8(r6, r7);
        let r67_hi = _mm256_unpackhi_epi8(r6, r7);

        let r0123_g0 = _mm256_unpacklo_epi16(r01_lo, r23_lo);
        let r0123_g4 = _mm256_unpackhi_epi16(r01_lo, r23_lo);
        let r0123_g8 = _mm256_unpacklo_epi16(r01_hi, r23_hi);
        let r0123_g12 = _mm256_unpackhi_epi16(r01_hi, r23_hi);
        let r4567_g0 = _mm256_unpacklo_epi16(r45_lo, r67_lo);
        let r4567_g4 = _mm256_unpackhi_epi16(r45_lo, r67_lo);
        let r4567_g8 = _mm256_unpacklo_epi16(r45_hi, r67_hi);
        let r4567_g12 = _mm256_unpackhi_epi16(r45_hi, r67_hi);

        let groups = [
            _mm256_unpacklo_epi32(r0123_g0, r4567_g0),
            _mm256_unpackhi_epi32(r0123_g0, r4567_g0),
            _mm256_unpacklo_epi32(r0123_g4, r4567_g4),
            _mm256_unpackhi_epi32(r0123_g4, r4567_g4),
            _mm256_unpacklo_epi32(r0123_g8, r4567_g8),
            _mm256_unpackhi_epi32(r0123_g8, r4567_g8),
            _mm256_unpacklo_epi32(r0123_g12, r4567_g12),
            _mm256_unpackhi_epi32(r0123_g12, r4567_g12),
        ];

        let out_low = output.add(group * 8);
        let out_high = out_low.add(128);
        for (index, value) in groups.iter().enumerate() {
            let transposed = transpose_bits_8x8_avx2(*value, mask_1x1, mask_2x2, mask_4x4);
            _mm_storeu_si128(
                out_low.add(index * 16) as *mut __m128i,
                _mm256_castsi256_si128(transposed),
            );
            _mm_storeu_si128(
                out_high.add(index * 16) as *mut __m128i,
                _mm256_extracti128_si256(transposed, 1),
            );
        }

        group += 32;
    }

    bit_rows_to_bytes_from(input, output, len_bytes, vectorized_groups);
}

/// Runs the xor-shift 8x8 bit transpose on all four 64-bit lanes.
#[target_feature(enable = "avx2")]
#[inline]
unsafe fn transpose_bits_8x8_avx2(
    x: __m256i,
    mask_1x1: __m256i,
    mask_2x2: __m256i,
    mask_4x4: __m256i,
) -> __m256i {
    let t = _mm256_and_si256(_mm256_xor_si256(x, _mm256_srli_epi64(x, 7)), mask_1x1);
    let x = _mm256_xor_si256(x, _mm256_xor_si256(t, _mm256_slli_epi64(t, 7)));
    let t = _mm256_and_si256(_mm256_xor_si256(x, _mm256_srli_epi64(x, 14)), mask_2x2);
    let x = _mm256_xor_si256(x, _mm256_xor_si256(t, _mm256_slli_epi64(t, 14)));
    let t = _mm256_and_si256(_mm256_xor_si256(x, _mm256_srli_epi64(x, 28)), mask_4x4);
    _mm256_xor_si256(x, _mm256_xor_si256(t, _mm256_slli_epi64(t, 28)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit_transpose::tests::{
        test_bit_rows_kernel, test_inverse_bit_rows_kernel, BitRowFn,
    };
    use bitshuffle_common::cpu_detect::has_avx2;
    use rstest::rstest;

    #[rstest]
    #[case(bytes_to_bit_rows, "avx2_movemask")]
    fn test_avx2_bit_rows(#[case] implementation: BitRowFn, #[case] impl_name: &str) {
        if !has_avx2() {
            return;
        }

        test_bit_rows_kernel(implementation, impl_name);
    }

    #[rstest]
    #[case(bit_rows_to_bytes, "avx2_unpack")]
    fn test_avx2_inverse_bit_rows(#[case] implementation: BitRowFn, #[case] impl_name: &str) {
        if !has_avx2() {
            return;
        }

        test_inverse_bit_rows_kernel(implementation, impl_name);
    }
}
