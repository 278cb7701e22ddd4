//! Bit matrix primitives shared by all transpose kernels.
//!
//! An 8x8 bit matrix is stored in a [`u64`] loaded in little endian order: byte `r` is row `r`
//! and bit `c` of that byte is column `c`. Both the scalar and the vectorized kernels use the
//! same three xor-shift passes, the vectorized ones simply run them on several lanes at once,
//! so the masks and shift amounts are exported here.

/// Mask of the bits swapped by the first pass (1x1 sub-blocks, distance 7).
pub const SWAP_1X1_MASK: u64 = 0x00AA_00AA_00AA_00AA;
/// Mask of the bits swapped by the second pass (2x2 sub-blocks, distance 14).
pub const SWAP_2X2_MASK: u64 = 0x0000_CCCC_0000_CCCC;
/// Mask of the bits swapped by the third pass (4x4 sub-blocks, distance 28).
pub const SWAP_4X4_MASK: u64 = 0x0000_0000_F0F0_F0F0;

/// Shift distance of the first pass.
pub const SWAP_1X1_SHIFT: u32 = 7;
/// Shift distance of the second pass.
pub const SWAP_2X2_SHIFT: u32 = 14;
/// Shift distance of the third pass.
pub const SWAP_4X4_SHIFT: u32 = 28;

/// Transposes an 8x8 bit matrix.
///
/// Bit `c` of byte `r` of the input ends up as bit `r` of byte `c` of the output.
/// The operation is its own inverse.
///
/// # Examples
///
/// ```
/// use bitshuffle_common::intrinsics::transpose_bits_8x8;
///
/// // Row 0 fully set becomes column 0 fully set.
/// assert_eq!(transpose_bits_8x8(0xFF), 0x0101_0101_0101_0101);
/// ```
#[inline(always)]
pub const fn transpose_bits_8x8(mut x: u64) -> u64 {
    let mut t = (x ^ (x >> SWAP_1X1_SHIFT)) & SWAP_1X1_MASK;
    x ^= t ^ (t << SWAP_1X1_SHIFT);
    t = (x ^ (x >> SWAP_2X2_SHIFT)) & SWAP_2X2_MASK;
    x ^= t ^ (t << SWAP_2X2_SHIFT);
    t = (x ^ (x >> SWAP_4X4_SHIFT)) & SWAP_4X4_MASK;
    x ^= t ^ (t << SWAP_4X4_SHIFT);
    x
}

/// Reference implementation of [`transpose_bits_8x8`], one bit at a time.
///
/// Only used to validate the fast versions.
pub fn transpose_bits_8x8_reference(x: u64) -> u64 {
    let mut result = 0u64;
    for row in 0..8 {
        for col in 0..8 {
            let bit = (x >> (row * 8 + col)) & 1;
            result |= bit << (col * 8 + row);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn diagonal_maps_to_itself() {
        let diagonal = u64::from_le_bytes([0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x80]);
        assert_eq!(transpose_bits_8x8(diagonal), diagonal);
    }

    #[rstest]
    #[case::zero(0)]
    #[case::ones(u64::MAX)]
    #[case::row0(0xFF)]
    #[case::pattern(0x0123_4567_89AB_CDEF)]
    #[case::alternating(0xAAAA_5555_AAAA_5555)]
    #[case::single_high_bit(1 << 63)]
    fn matches_reference(#[case] value: u64) {
        assert_eq!(
            transpose_bits_8x8(value),
            transpose_bits_8x8_reference(value)
        );
    }

    #[test]
    fn is_an_involution() {
        let mut value: u64 = 0x9E37_79B9_7F4A_7C15;
        for _ in 0..1024 {
            assert_eq!(transpose_bits_8x8(transpose_bits_8x8(value)), value);
            value = value.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        }
    }

    #[test]
    fn every_single_bit_lands_in_the_transposed_position() {
        for row in 0..8u32 {
            for col in 0..8u32 {
                let input = 1u64 << (row * 8 + col);
                let expected = 1u64 << (col * 8 + row);
                assert_eq!(transpose_bits_8x8(input), expected, "row {row} col {col}");
            }
        }
    }
}
