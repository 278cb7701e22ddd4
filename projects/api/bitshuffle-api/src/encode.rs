//! Compression of a buffer into a frame.
//!
//! Blocks are handled in windows of a few blocks per worker. Every block of a window is
//! transformed and compressed into its own record buffer first (the size phase), then the
//! records are copied into the frame at offsets from an exclusive prefix sum (the placement
//! phase). See [`crate::iochain`].

use crate::error::BitshuffleError;
use crate::format::{FrameHeader, RecordFlag, RecordHeader, RECORD_HEADER_SIZE};
use crate::iochain::{exclusive_prefix_sum, split_disjoint, WorkerPool};
use crate::layout::{BlockLayout, BlockSpan, SpanKind};
use crate::options::BitshuffleOptions;
use alloc::string::ToString;
use alloc::vec::Vec;
use bitshuffle_api_common::BlockCompressor;
use bitshuffle_transpose::{TransformMode, TransposeEngine};

/// Compresses `input`, a buffer of elements of `element_size` bytes, into a new frame.
///
/// # Parameters
///
/// - `input`: The elements to compress
/// - `element_size`: Size of each element in bytes (1..=255)
/// - `compressor`: Codec applied to every transformed block
/// - `options`: Block size, threads, kernel and transform mode
///
/// # Errors
///
/// - [`BitshuffleError::InvalidParameters`] if the element size, block size or input length
///   is invalid
/// - [`BitshuffleError::CompressorFailure`] if the codec fails on a block
/// - [`BitshuffleError::UnsupportedKernel`] if the requested kernel can't run here
///
/// # Examples
///
/// ```rust
/// use bitshuffle_api::{compress, decompress, BitshuffleOptions, NoCompression};
///
/// let data: Vec<u8> = (0..1024u32).flat_map(|x| x.to_le_bytes()).collect();
/// let options = BitshuffleOptions::default();
///
/// let frame = compress(&data, 4, &NoCompression, &options)?;
/// let restored = decompress(&frame, 1024, 4, &NoCompression, &options)?;
/// assert_eq!(restored, data);
/// # Ok::<(), bitshuffle_api::BitshuffleError>(())
/// ```
pub fn compress<C: BlockCompressor>(
    input: &[u8],
    element_size: usize,
    compressor: &C,
    options: &BitshuffleOptions,
) -> Result<Vec<u8>, BitshuffleError> {
    let encoder = FrameEncoder::new(input, element_size, compressor, options)?;
    let mut frame = encoder.header().to_bytes().to_vec();
    encoder.encode_records(&mut frame)?;
    Ok(frame)
}

/// Compresses `input` into the caller provided `output` buffer.
///
/// Returns the number of bytes written. [`max_compressed_size`] gives a size that is
/// always large enough.
///
/// # Errors
///
/// Same as [`compress`], plus [`BitshuffleError::OutOfSpace`] if the frame doesn't fit in
/// `output`. Nothing is written to `output` in that case.
///
/// [`max_compressed_size`]: crate::max_compressed_size
pub fn compress_into<C: BlockCompressor>(
    input: &[u8],
    output: &mut [u8],
    element_size: usize,
    compressor: &C,
    options: &BitshuffleOptions,
) -> Result<usize, BitshuffleError> {
    // The frame length is only known once every block is compressed.
    let frame = compress(input, element_size, compressor, options)?;
    let actual = output.len();
    let destination = output
        .get_mut(..frame.len())
        .ok_or(BitshuffleError::OutOfSpace {
            needed: frame.len(),
            actual,
        })?;

    destination.copy_from_slice(&frame);
    Ok(frame.len())
}

/// Blocks each worker compresses before their records are appended to the frame.
///
/// Bounds the records held in memory to a few per worker.
const RECORDS_PER_WORKER: usize = 16;

/// Compresses the blocks of one buffer and appends their records to a frame.
struct FrameEncoder<'a, C> {
    input: &'a [u8],
    layout: BlockLayout,
    engine: TransposeEngine,
    pool: WorkerPool,
    mode: TransformMode,
    compressor: &'a C,
}

impl<'a, C: BlockCompressor> FrameEncoder<'a, C> {
    fn new(
        input: &'a [u8],
        element_size: usize,
        compressor: &'a C,
        options: &BitshuffleOptions,
    ) -> Result<Self, BitshuffleError> {
        let layout = BlockLayout::for_buffer(
            input.len(),
            element_size,
            options.block_size_for(element_size),
        )?;
        let engine = options.engine()?;
        let pool = options.worker_pool()?;

        log::debug!(
            "Compressing {} bytes with {}: {} records, {} elements of {} bytes per block, {} using {}",
            input.len(),
            compressor.name(),
            layout.record_count(),
            layout.block_size(),
            element_size,
            options.mode.name(),
            engine.kernel()
        );

        Ok(Self {
            input,
            layout,
            engine,
            pool,
            mode: options.mode,
            compressor,
        })
    }

    fn header(&self) -> FrameHeader {
        FrameHeader {
            total_bytes: self.input.len() as u64,
            // Validated by the layout to fit.
            block_size: self.layout.block_size() as u32,
            element_size: self.layout.element_size() as u8,
        }
    }

    fn window_len(&self) -> usize {
        self.pool.parallelism().max(1) * RECORDS_PER_WORKER
    }

    /// Appends every record to `frame`, one window of blocks at a time.
    ///
    /// Each window goes through the size phase, then its records are placed at offsets from
    /// an exclusive prefix sum. Windows run in block order, so the first failing window holds
    /// the lowest failing block.
    fn encode_records(&self, frame: &mut Vec<u8>) -> Result<(), BitshuffleError> {
        let count = self.layout.record_count();
        let window = self.window_len();

        let mut first = 0;
        while first < count {
            let last = (first + window).min(count);
            let records = self.pool.map_blocks(
                last - first,
                EncodeScratch::default,
                |scratch, offset| self.encode_block(first + offset, scratch),
            )?;
            self.place(frame, records)?;
            first = last;
        }
        Ok(())
    }

    /// Placement phase for one window.
    fn place(&self, frame: &mut Vec<u8>, records: Vec<Vec<u8>>) -> Result<(), BitshuffleError> {
        let lengths: Vec<usize> = records.iter().map(Vec::len).collect();
        let (offsets, total) = exclusive_prefix_sum(&lengths);

        let start = frame.len();
        frame.resize(start + total, 0);
        let slots = split_disjoint(&mut frame[start..], &offsets, total).ok_or(
            BitshuffleError::OutOfSpace {
                needed: total,
                actual: total,
            },
        )?;

        let items: Vec<_> = records.into_iter().zip(slots).collect();
        self.pool.for_each_slot(
            items,
            || (),
            |_, (record, slot)| {
                slot.copy_from_slice(&record);
                Ok(())
            },
        )
    }

    fn encode_block(
        &self,
        index: usize,
        scratch: &mut EncodeScratch,
    ) -> Result<Vec<u8>, BitshuffleError> {
        let element_size = self.layout.element_size();
        let span = self
            .layout
            .span(index)
            .ok_or(BitshuffleError::InvalidBlockShape {
                block: index,
                element_count: 0,
                element_size,
            })?;

        encode_block(
            &self.input[span.byte_range()],
            &span,
            element_size,
            &self.engine,
            self.mode,
            self.compressor,
            scratch,
        )
    }
}

/// Scratch buffers owned by one worker, reused for every block it handles.
#[derive(Default)]
struct EncodeScratch {
    transformed: Vec<u8>,
    temp: Vec<u8>,
    compressed: Vec<u8>,
}

/// Serializes one block into a record: header followed by the payload.
fn encode_block<C: BlockCompressor>(
    block: &[u8],
    span: &BlockSpan,
    element_size: usize,
    engine: &TransposeEngine,
    mode: TransformMode,
    compressor: &C,
    scratch: &mut EncodeScratch,
) -> Result<Vec<u8>, BitshuffleError> {
    if span.kind == SpanKind::Tail {
        return Ok(make_record(RecordFlag::Raw, block));
    }

    let len = block.len();
    let transformed = resized(&mut scratch.transformed, len);
    let temp = resized(&mut scratch.temp, len);
    engine
        .apply(mode, block, transformed, temp, element_size)
        .map_err(|e| BitshuffleError::transform(span.index, e))?;

    let bound = compressor.max_compressed_size(len);
    let compressed = resized(&mut scratch.compressed, bound);
    let written = compressor
        .compress(transformed, compressed)
        .map_err(|e| BitshuffleError::CompressorFailure {
            block: span.index,
            codec: compressor.name(),
            message: e.to_string(),
        })?;

    let Some(payload) = compressed.get(..written) else {
        return Err(BitshuffleError::CompressorFailure {
            block: span.index,
            codec: compressor.name(),
            message: "reported more bytes than its output buffer holds".to_string(),
        });
    };

    if written < len {
        Ok(make_record(RecordFlag::Compressed, payload))
    } else {
        log::trace!(
            "Block {}: {} compressed to {written} of {len} bytes, storing raw",
            span.index,
            compressor.name()
        );
        Ok(make_record(RecordFlag::Raw, transformed))
    }
}

fn make_record(flag: RecordFlag, payload: &[u8]) -> Vec<u8> {
    let header = RecordHeader {
        // Payloads never exceed the block length, which fits in a u32.
        payload_len: payload.len() as u32,
        flag,
    };

    let mut record = Vec::with_capacity(RECORD_HEADER_SIZE + payload.len());
    record.extend_from_slice(&header.to_bytes());
    record.extend_from_slice(payload);
    record
}

/// Returns the first `len` bytes of `buffer`, growing it if needed.
fn resized(buffer: &mut Vec<u8>, len: usize) -> &mut [u8] {
    if buffer.len() < len {
        buffer.resize(len, 0);
    }
    &mut buffer[..len]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FRAME_HEADER_SIZE;
    use alloc::vec;
    use crate::options::BitshuffleOptionsBuilder;
    use bitshuffle_api_common::NoCompression;
    use rstest::rstest;

    fn options(block_size: usize) -> BitshuffleOptions {
        BitshuffleOptionsBuilder::new()
            .block_size(block_size)
            .threads(1)
            .build()
    }

    #[test]
    fn empty_input_is_header_only() {
        let frame = compress(&[], 4, &NoCompression, &options(64)).unwrap();
        assert_eq!(frame.len(), FRAME_HEADER_SIZE);
        assert_eq!(
            FrameHeader::from_bytes(&frame).unwrap(),
            FrameHeader {
                total_bytes: 0,
                block_size: 64,
                element_size: 4
            }
        );
    }

    #[test]
    fn incompressible_blocks_are_stored_raw_and_transposed() {
        let input: Vec<u8> = (0..64u8).collect();
        let frame = compress(&input, 1, &NoCompression, &options(64)).unwrap();

        let record = RecordHeader::from_bytes(&frame[FRAME_HEADER_SIZE..], 0).unwrap();
        assert_eq!(record.flag, RecordFlag::Raw);
        assert_eq!(record.payload_len, 64);

        let mut expected = vec![0u8; 64];
        TransposeEngine::portable()
            .transpose(&input, &mut expected, 1)
            .unwrap();
        assert_eq!(&frame[FRAME_HEADER_SIZE + RECORD_HEADER_SIZE..], &expected[..]);
    }

    #[test]
    fn tail_is_stored_untransformed() {
        // 16 transformed elements, then 3 raw ones.
        let input: Vec<u8> = (0..38u8).collect();
        let frame = compress(&input, 2, &NoCompression, &options(64)).unwrap();

        let tail_header_at = FRAME_HEADER_SIZE + RECORD_HEADER_SIZE + 32;
        let tail = RecordHeader::from_bytes(&frame[tail_header_at..], 1).unwrap();
        assert_eq!(
            tail,
            RecordHeader {
                payload_len: 6,
                flag: RecordFlag::Raw
            }
        );
        assert_eq!(&frame[tail_header_at + RECORD_HEADER_SIZE..], &input[32..]);
    }

    #[rstest]
    #[case::element_size(&[0u8; 8], 0, 64)]
    #[case::block_size(&[0u8; 8], 1, 12)]
    #[case::buffer_length(&[0u8; 9], 2, 64)]
    fn invalid_parameters_are_rejected(
        #[case] input: &[u8],
        #[case] element_size: usize,
        #[case] block_size: usize,
    ) {
        let result = compress(input, element_size, &NoCompression, &options(block_size));
        assert!(matches!(result, Err(BitshuffleError::InvalidParameters(_))));
    }

    #[test]
    fn compress_into_checks_space_before_writing() {
        let input = [0u8; 128];
        let mut output = [0xAAu8; 64];
        let result = compress_into(&input, &mut output, 1, &NoCompression, &options(64));

        assert_eq!(
            result,
            Err(BitshuffleError::OutOfSpace {
                needed: FRAME_HEADER_SIZE + 2 * (RECORD_HEADER_SIZE + 64),
                actual: 64
            })
        );
        assert!(output.iter().all(|&b| b == 0xAA));
    }

    /// Rejects blocks shorter than 64 bytes.
    struct ShortBlockRejector;

    impl BlockCompressor for ShortBlockRejector {
        type Error = &'static str;

        fn name(&self) -> &'static str {
            "short-block-rejector"
        }

        fn max_compressed_size(&self, len_bytes: usize) -> usize {
            len_bytes
        }

        fn compress(&self, input: &[u8], output: &mut [u8]) -> Result<usize, Self::Error> {
            if input.len() < 64 {
                return Err("block too short");
            }
            output[..input.len()].copy_from_slice(input);
            Ok(input.len())
        }

        fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<usize, Self::Error> {
            output[..input.len()].copy_from_slice(input);
            Ok(input.len())
        }
    }

    #[rstest]
    #[case::sequential(1)]
    #[case::dedicated(3)]
    fn records_span_many_windows(#[case] threads: usize) {
        // 300 blocks of 8 elements, far more than one window.
        let input: Vec<u8> = (0..2400u32).map(|x| (x / 7) as u8).collect();
        let options = BitshuffleOptionsBuilder::new()
            .block_size(8)
            .threads(threads)
            .build();

        let frame = compress(&input, 1, &NoCompression, &options).unwrap();
        assert_eq!(frame.len(), FRAME_HEADER_SIZE + 300 * (RECORD_HEADER_SIZE + 8));

        let mut expected = vec![0u8; 8];
        TransposeEngine::portable()
            .transpose(&input[2392..], &mut expected, 1)
            .unwrap();
        assert_eq!(&frame[frame.len() - 8..], &expected[..]);

        let restored =
            crate::decode::decompress(&frame, 2400, 1, &NoCompression, &options).unwrap();
        assert_eq!(restored, input);
    }

    #[rstest]
    #[case::sequential(1)]
    #[case::dedicated(2)]
    fn failure_in_a_later_window_names_its_block(#[case] threads: usize) {
        // 100 full blocks of 64 bytes, then a 16 byte partial block.
        let input = vec![7u8; 100 * 64 + 16];
        let options = BitshuffleOptionsBuilder::new()
            .block_size(64)
            .threads(threads)
            .build();

        assert_eq!(
            compress(&input, 1, &ShortBlockRejector, &options),
            Err(BitshuffleError::CompressorFailure {
                block: 100,
                codec: "short-block-rejector",
                message: "block too short".to_string(),
            })
        );
    }
}
