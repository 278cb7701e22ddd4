//! Common test utilities for the bit transpose kernels.

use alloc::format;
use alloc::vec;
use alloc::vec::Vec;

/// Function pointer type for a bit row kernel (stage 2 or its inverse).
pub type BitRowFn = unsafe fn(*const u8, *mut u8, usize);

/// Generates `len` bytes that exercise every bit position with a non-repeating pattern.
pub fn generate_test_data(len: usize) -> Vec<u8> {
    let mut state: u32 = 0x1234_5678;
    (0..len)
        .map(|_| {
            // xorshift32
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect()
}

/// Stage 2 of the bit transpose, one bit at a time.
pub fn bit_rows_reference(input: &[u8]) -> Vec<u8> {
    let row_len = input.len() / 8;
    let mut output = vec![0u8; input.len()];
    for (index, byte) in input.iter().enumerate() {
        for bit in 0..8 {
            let value = (byte >> bit) & 1;
            output[bit * row_len + index / 8] |= value << (index % 8);
        }
    }
    output
}

/// The complete bit transpose, one bit at a time.
///
/// Plane `p` holds bit `p % 8` of byte `p / 8` of every element.
pub fn bit_transpose_reference(input: &[u8], element_size: usize) -> Vec<u8> {
    let element_count = input.len() / element_size;
    let plane_len = element_count / 8;
    let mut output = vec![0u8; input.len()];
    for plane in 0..element_size * 8 {
        for element in 0..element_count {
            let value = (input[element * element_size + plane / 8] >> (plane % 8)) & 1;
            output[plane * plane_len + element / 8] |= value << (element % 8);
        }
    }
    output
}

/// Helper to assert implementation results match the reference implementation.
pub fn assert_implementation_matches_reference(
    output_expected: &[u8],
    output_test: &[u8],
    impl_name: &str,
    num_groups: usize,
) {
    assert_eq!(
        output_expected, output_test,
        "{impl_name} implementation produced different results than reference for {num_groups} groups of 8 bytes"
    );
}

/// Tests a stage 2 kernel against [`bit_rows_reference`] for a range of input sizes,
/// with both aligned and unaligned buffers.
pub fn test_bit_rows_kernel(implementation: BitRowFn, impl_name: &str) {
    for num_groups in 1..=512 {
        let input = generate_test_data(num_groups * 8);
        let expected = bit_rows_reference(&input);

        let mut input_unaligned = vec![0u8; input.len() + 1];
        input_unaligned[1..].copy_from_slice(&input);
        let mut output_test = vec![0u8; input.len() + 1];

        unsafe {
            implementation(
                input_unaligned.as_ptr().add(1),
                output_test.as_mut_ptr().add(1),
                input.len(),
            );
        }

        assert_implementation_matches_reference(
            &expected,
            &output_test[1..],
            &format!("{impl_name} (unaligned)"),
            num_groups,
        );
    }
}

/// Tests an inverse stage 2 kernel by feeding it the reference bit rows.
pub fn test_inverse_bit_rows_kernel(implementation: BitRowFn, impl_name: &str) {
    for num_groups in 1..=512 {
        let input = generate_test_data(num_groups * 8);
        let rows = bit_rows_reference(&input);
        let mut output_test = vec![0u8; input.len()];

        unsafe {
            implementation(rows.as_ptr(), output_test.as_mut_ptr(), rows.len());
        }

        assert_implementation_matches_reference(&input, &output_test, impl_name, num_groups);
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn reference_emits_planes_in_bit_order() {
        // 8 elements of 2 bytes; only element 0 has bit 9 (byte 1, bit 1) set.
        let mut input = vec![0u8; 16];
        input[1] = 0b0000_0010;

        let output = bit_transpose_reference(&input, 2);

        let mut expected = vec![0u8; 16];
        expected[9] = 0b0000_0001;
        assert_eq!(output, expected);
    }

    #[test]
    fn reference_bit_rows_match_full_reference_for_single_byte_elements() {
        let input = generate_test_data(64);
        assert_eq!(bit_rows_reference(&input), bit_transpose_reference(&input, 1));
    }
}
