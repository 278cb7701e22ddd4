//! # Byte Shuffle
//!
//! Groups byte `j` of every element together. For 3 elements of 4 bytes:
//!
//! ```ignore
//! +-------------+-------------+-------------+
//! |A0 A1 A2 A3  |B0 B1 B2 B3  |C0 C1 C2 C3  |
//! +-------------+-------------+-------------+
//! ```
//!
//! becomes
//!
//! ```ignore
//! +---------+---------+---------+---------+
//! |A0 B0 C0 |A1 B1 C1 |A2 B2 C2 |A3 B3 C3 |
//! +---------+---------+---------+---------+
//! ```
//!
//! This is also the first stage of the bit transpose.
//!
//! The functions in this module work on any element count; the block shape rules are
//! enforced by [`TransposeEngine`].
//!
//! [`TransposeEngine`]: crate::TransposeEngine

use core::ptr::{copy_nonoverlapping, read, write};
use multiversion::multiversion;

/// Transposes `element_count` elements of `element_size` bytes from element-major to
/// byte-major order.
///
/// `output[j * element_count + i] = input[i * element_size + j]`
///
/// # Safety
///
/// - `input` must be valid for reads of `element_count * element_size` bytes
/// - `output` must be valid for writes of `element_count * element_size` bytes
/// - `input` and `output` must not overlap
#[inline]
pub unsafe fn shuffle_bytes(
    input: *const u8,
    output: *mut u8,
    element_count: usize,
    element_size: usize,
) {
    debug_assert!(element_size > 0, "element_size must be non-zero");

    match element_size {
        1 => copy_nonoverlapping(input, output, element_count),
        2 => shuffle_fixed::<2>(input, output, element_count),
        4 => shuffle_fixed::<4>(input, output, element_count),
        8 => shuffle_fixed::<8>(input, output, element_count),
        _ => shuffle_any(input, output, element_count, element_size),
    }
}

/// Inverse of [`shuffle_bytes`].
///
/// `output[i * element_size + j] = input[j * element_count + i]`
///
/// # Safety
///
/// - `input` must be valid for reads of `element_count * element_size` bytes
/// - `output` must be valid for writes of `element_count * element_size` bytes
/// - `input` and `output` must not overlap
#[inline]
pub unsafe fn unshuffle_bytes(
    input: *const u8,
    output: *mut u8,
    element_count: usize,
    element_size: usize,
) {
    debug_assert!(element_size > 0, "element_size must be non-zero");

    match element_size {
        1 => copy_nonoverlapping(input, output, element_count),
        2 => unshuffle_fixed::<2>(input, output, element_count),
        4 => unshuffle_fixed::<4>(input, output, element_count),
        8 => unshuffle_fixed::<8>(input, output, element_count),
        _ => unshuffle_any(input, output, element_count, element_size),
    }
}

#[inline(always)]
unsafe fn shuffle_fixed<const SIZE: usize>(
    input: *const u8,
    output: *mut u8,
    element_count: usize,
) {
    for i in 0..element_count {
        let element = read(input.add(i * SIZE) as *const [u8; SIZE]);
        for (j, byte) in element.iter().enumerate() {
            write(output.add(j * element_count + i), *byte);
        }
    }
}

#[inline(always)]
unsafe fn unshuffle_fixed<const SIZE: usize>(
    input: *const u8,
    output: *mut u8,
    element_count: usize,
) {
    for i in 0..element_count {
        let mut element = [0u8; SIZE];
        for (j, byte) in element.iter_mut().enumerate() {
            *byte = read(input.add(j * element_count + i));
        }
        write(output.add(i * SIZE) as *mut [u8; SIZE], element);
    }
}

#[multiversion(targets(
    // x86-64-v3 without lahfsahf
    "x86_64+avx+avx2+bmi1+bmi2+cmpxchg16b+f16c+fma+fxsr+lzcnt+movbe+popcnt+sse+sse2+sse3+sse4.1+sse4.2+ssse3+xsave",
    // x86-64-v2 without lahfsahf
    "x86_64+cmpxchg16b+fxsr+popcnt+sse+sse2+sse3+sse4.1+sse4.2+ssse3",
))]
unsafe fn shuffle_any(input: *const u8, output: *mut u8, element_count: usize, element_size: usize) {
    unsafe {
        for j in 0..element_size {
            let row = output.add(j * element_count);
            for i in 0..element_count {
                write(row.add(i), read(input.add(i * element_size + j)));
            }
        }
    }
}

#[multiversion(targets(
    // x86-64-v3 without lahfsahf
    "x86_64+avx+avx2+bmi1+bmi2+cmpxchg16b+f16c+fma+fxsr+lzcnt+movbe+popcnt+sse+sse2+sse3+sse4.1+sse4.2+ssse3+xsave",
    // x86-64-v2 without lahfsahf
    "x86_64+cmpxchg16b+fxsr+popcnt+sse+sse2+sse3+sse4.1+sse4.2+ssse3",
))]
unsafe fn unshuffle_any(
    input: *const u8,
    output: *mut u8,
    element_count: usize,
    element_size: usize,
) {
    unsafe {
        for j in 0..element_size {
            let row = input.add(j * element_count);
            for i in 0..element_count {
                write(output.add(i * element_size + j), read(row.add(i)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use rstest::rstest;

    fn reference_shuffle(input: &[u8], element_size: usize) -> Vec<u8> {
        let element_count = input.len() / element_size;
        let mut output = vec![0u8; input.len()];
        for i in 0..element_count {
            for j in 0..element_size {
                output[j * element_count + i] = input[i * element_size + j];
            }
        }
        output
    }

    fn generate_test_data(len: usize) -> Vec<u8> {
        (0..len).map(|x| (x * 7 + 3) as u8).collect()
    }

    #[test]
    fn groups_bytes_by_position() {
        let input = [0xA0, 0xA1, 0xA2, 0xA3, 0xB0, 0xB1, 0xB2, 0xB3, 0xC0, 0xC1, 0xC2, 0xC3];
        let mut output = [0u8; 12];
        unsafe { shuffle_bytes(input.as_ptr(), output.as_mut_ptr(), 3, 4) };
        assert_eq!(
            output,
            [0xA0, 0xB0, 0xC0, 0xA1, 0xB1, 0xC1, 0xA2, 0xB2, 0xC2, 0xA3, 0xB3, 0xC3]
        );
    }

    #[rstest]
    #[case::size1(1)]
    #[case::size2(2)]
    #[case::size3(3)]
    #[case::size4(4)]
    #[case::size8(8)]
    #[case::size12(12)]
    #[case::size16(16)]
    fn matches_reference_and_inverts(#[case] element_size: usize) {
        for element_count in 0..=130 {
            let input = generate_test_data(element_count * element_size);
            let expected = reference_shuffle(&input, element_size);

            let mut shuffled = vec![0u8; input.len()];
            let mut restored = vec![0u8; input.len()];
            unsafe {
                shuffle_bytes(
                    input.as_ptr(),
                    shuffled.as_mut_ptr(),
                    element_count,
                    element_size,
                );
                unshuffle_bytes(
                    shuffled.as_ptr(),
                    restored.as_mut_ptr(),
                    element_count,
                    element_size,
                );
            }

            assert_eq!(
                shuffled, expected,
                "shuffle differs from reference for {element_count} elements of {element_size} bytes"
            );
            assert_eq!(
                restored, input,
                "unshuffle did not restore {element_count} elements of {element_size} bytes"
            );
        }
    }
}
