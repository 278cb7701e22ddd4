//! Blocked transforms without compression.
//!
//! These apply the same per-block transform as [`compress`](crate::compress) but write the
//! transformed blocks back to back, with no header and no records. The output is exactly as
//! long as the input, which makes it suitable as a filter in front of a compressor that works
//! on whole buffers.

use crate::error::BitshuffleError;
use crate::iochain::{exclusive_prefix_sum, split_disjoint};
use crate::layout::{BlockLayout, BlockSpan, SpanKind};
use crate::options::BitshuffleOptions;
use alloc::vec::Vec;
use bitshuffle_transpose::TransposeEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Inverse,
}

/// Transforms `input` block by block into `output`.
///
/// Full blocks and the partial block are transformed; the final `element_count % 8`
/// elements are copied as is. Only the first `input.len()` bytes of `output` are written.
///
/// # Errors
///
/// - [`BitshuffleError::InvalidParameters`] if the element size, block size or input length
///   is invalid
/// - [`BitshuffleError::OutOfSpace`] if `output` is shorter than `input`
///
/// # Examples
///
/// ```rust
/// use bitshuffle_api::{bitshuffle, bitunshuffle, BitshuffleOptions};
///
/// let input: Vec<u8> = (0..256u16).flat_map(|x| x.to_le_bytes()).collect();
/// let mut shuffled = vec![0u8; input.len()];
/// let mut restored = vec![0u8; input.len()];
/// let options = BitshuffleOptions::default();
///
/// bitshuffle(&input, &mut shuffled, 2, &options)?;
/// bitunshuffle(&shuffled, &mut restored, 2, &options)?;
/// assert_eq!(restored, input);
/// # Ok::<(), bitshuffle_api::BitshuffleError>(())
/// ```
pub fn bitshuffle(
    input: &[u8],
    output: &mut [u8],
    element_size: usize,
    options: &BitshuffleOptions,
) -> Result<(), BitshuffleError> {
    transform_blocks(input, output, element_size, options, Direction::Forward)
}

/// Inverse of [`bitshuffle`].
///
/// # Errors
///
/// Same as [`bitshuffle`].
pub fn bitunshuffle(
    input: &[u8],
    output: &mut [u8],
    element_size: usize,
    options: &BitshuffleOptions,
) -> Result<(), BitshuffleError> {
    transform_blocks(input, output, element_size, options, Direction::Inverse)
}

fn transform_blocks(
    input: &[u8],
    output: &mut [u8],
    element_size: usize,
    options: &BitshuffleOptions,
    direction: Direction,
) -> Result<(), BitshuffleError> {
    let layout = BlockLayout::for_buffer(
        input.len(),
        element_size,
        options.block_size_for(element_size),
    )?;
    if output.len() < input.len() {
        return Err(BitshuffleError::OutOfSpace {
            needed: input.len(),
            actual: output.len(),
        });
    }

    let engine = options.engine()?;
    let pool = options.worker_pool()?;
    log::debug!(
        "{direction:?} {} over {} blocks of {} elements using {}",
        options.mode.name(),
        layout.record_count(),
        layout.block_size(),
        engine.kernel()
    );

    let spans: Vec<BlockSpan> = layout.spans().collect();
    let lengths: Vec<usize> = spans.iter().map(|span| span.byte_len).collect();
    let (offsets, total) = exclusive_prefix_sum(&lengths);
    let slots = split_disjoint(output, &offsets, total).ok_or(BitshuffleError::OutOfSpace {
        needed: input.len(),
        actual: total,
    })?;

    let items: Vec<_> = spans.into_iter().zip(slots).collect();
    pool.for_each_slot(items, Vec::new, |temp: &mut Vec<u8>, (span, slot)| {
        transform_block(
            &input[span.byte_range()],
            slot,
            &span,
            element_size,
            &engine,
            options,
            direction,
            temp,
        )
    })
}

#[allow(clippy::too_many_arguments)]
fn transform_block(
    block: &[u8],
    output: &mut [u8],
    span: &BlockSpan,
    element_size: usize,
    engine: &TransposeEngine,
    options: &BitshuffleOptions,
    direction: Direction,
    temp: &mut Vec<u8>,
) -> Result<(), BitshuffleError> {
    if span.kind == SpanKind::Tail {
        output.copy_from_slice(block);
        return Ok(());
    }

    if temp.len() < block.len() {
        temp.resize(block.len(), 0);
    }
    let temp = &mut temp[..block.len()];

    let result = match direction {
        Direction::Forward => engine.apply(options.mode, block, output, temp, element_size),
        Direction::Inverse => engine.invert(options.mode, block, output, temp, element_size),
    };
    result.map_err(|e| BitshuffleError::transform(span.index, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParameterError;
    use crate::options::BitshuffleOptionsBuilder;
    use alloc::vec;
    use bitshuffle_transpose::TransformMode;
    use rstest::rstest;

    fn options(threads: usize, mode: TransformMode) -> BitshuffleOptions {
        BitshuffleOptionsBuilder::new()
            .block_size(32)
            .threads(threads)
            .mode(mode)
            .build()
    }

    #[rstest]
    #[case::bit_sequential(1, TransformMode::BitShuffle)]
    #[case::bit_parallel(4, TransformMode::BitShuffle)]
    #[case::byte_sequential(1, TransformMode::ByteShuffle)]
    fn round_trips_with_tail(#[case] threads: usize, #[case] mode: TransformMode) {
        // 2 full blocks, 8 transformed elements, 5 untouched.
        let input: Vec<u8> = (0..77u32 * 4).map(|x| (x * 13 + 5) as u8).collect();
        let mut shuffled = vec![0u8; input.len()];
        let mut restored = vec![0u8; input.len()];
        let options = options(threads, mode);

        bitshuffle(&input, &mut shuffled, 4, &options).unwrap();
        bitunshuffle(&shuffled, &mut restored, 4, &options).unwrap();

        assert_ne!(shuffled, input);
        assert_eq!(&shuffled[72 * 4..], &input[72 * 4..]);
        assert_eq!(restored, input);
    }

    #[test]
    fn blocks_match_the_engine() {
        let input: Vec<u8> = (0..64u8).collect();
        let mut shuffled = vec![0u8; 64];
        bitshuffle(&input, &mut shuffled, 1, &options(1, TransformMode::BitShuffle)).unwrap();

        let engine = TransposeEngine::portable();
        let mut expected = vec![0u8; 64];
        engine.transpose(&input[..32], &mut expected[..32], 1).unwrap();
        engine.transpose(&input[32..], &mut expected[32..], 1).unwrap();
        assert_eq!(shuffled, expected);
    }

    #[test]
    fn short_output_is_rejected() {
        let input = [0u8; 64];
        let mut output = [0u8; 63];
        assert_eq!(
            bitshuffle(&input, &mut output, 1, &options(1, TransformMode::BitShuffle)),
            Err(BitshuffleError::OutOfSpace {
                needed: 64,
                actual: 63
            })
        );
    }

    #[test]
    fn partial_elements_are_rejected() {
        let input = [0u8; 10];
        let mut output = [0u8; 10];
        assert_eq!(
            bitshuffle(&input, &mut output, 4, &options(1, TransformMode::BitShuffle)),
            Err(BitshuffleError::InvalidParameters(
                ParameterError::BufferLength {
                    length: 10,
                    element_size: 4
                }
            ))
        );
    }

    #[test]
    fn misshapen_block_names_its_index() {
        // 12 elements can't be bit transposed.
        let span = BlockSpan {
            index: 4,
            byte_offset: 0,
            element_count: 12,
            byte_len: 12,
            kind: SpanKind::Transformed,
        };
        let input = [0u8; 12];
        let mut output = [0u8; 12];
        let mut temp = Vec::new();

        let result = transform_block(
            &input,
            &mut output,
            &span,
            1,
            &TransposeEngine::portable(),
            &options(1, TransformMode::BitShuffle),
            Direction::Forward,
            &mut temp,
        );
        assert_eq!(
            result,
            Err(BitshuffleError::InvalidBlockShape {
                block: 4,
                element_count: 12,
                element_size: 1
            })
        );
    }
}
