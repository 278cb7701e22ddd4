//! Decompression of a frame back into the original buffer.
//!
//! Record boundaries are found with one sequential scan over the record headers. Every
//! record is then decoded independently, straight into its own disjoint slice of the output.

use crate::error::{BitshuffleError, CorruptionKind, ParameterError};
use crate::format::{
    FrameHeader, RecordFlag, RecordHeader, FRAME_HEADER_SIZE, RECORD_HEADER_SIZE,
};
use crate::iochain::{exclusive_prefix_sum, split_disjoint};
use crate::layout::{validate_element_size, BlockLayout, BlockSpan, SpanKind};
use crate::options::BitshuffleOptions;
use alloc::string::ToString;
use alloc::vec;
use alloc::vec::Vec;
use bitshuffle_api_common::BlockCompressor;
use bitshuffle_transpose::{TransformMode, TransposeEngine};
use core::ops::Range;
use likely_stable::unlikely;

/// Where one record's payload lives in a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordLocation {
    /// The block the record decodes to.
    pub span: BlockSpan,
    /// How the payload is stored.
    pub flag: RecordFlag,
    /// Byte range of the payload within the frame.
    pub payload: Range<usize>,
}

/// Decompresses `frame` into a new buffer of `element_count` elements of `element_size`
/// bytes.
///
/// `options` must use the same [`mode`](BitshuffleOptions::mode) as the call that created
/// the frame. The block size is read from the frame.
///
/// # Errors
///
/// - [`BitshuffleError::InvalidParameters`] if `element_size` is invalid
/// - [`BitshuffleError::CorruptFrame`] if the frame is malformed or its header doesn't match
///   `element_count` and `element_size`
/// - [`BitshuffleError::CompressorFailure`] if the codec rejects a block
pub fn decompress<C: BlockCompressor>(
    frame: &[u8],
    element_count: usize,
    element_size: usize,
    compressor: &C,
    options: &BitshuffleOptions,
) -> Result<Vec<u8>, BitshuffleError> {
    validate_element_size(element_size)?;
    let total_bytes =
        element_count
            .checked_mul(element_size)
            .ok_or(ParameterError::BufferLength {
                length: usize::MAX,
                element_size,
            })?;

    let header = FrameHeader::from_bytes(frame)?;
    check_header_field("element_size", element_size as u64, header.element_size as u64)?;
    check_header_field("total_bytes", total_bytes as u64, header.total_bytes)?;

    let mut output = vec![0u8; total_bytes];
    decode_frame(frame, &header, &mut output, compressor, options)?;
    Ok(output)
}

/// Decompresses `frame` into the caller provided `output` buffer.
///
/// Returns the number of bytes written, which is the decompressed length stored in the
/// frame header.
///
/// # Errors
///
/// Same as [`decompress`], plus [`BitshuffleError::OutOfSpace`] if `output` is shorter than
/// the decompressed length. Nothing is written to `output` in that case.
pub fn decompress_into<C: BlockCompressor>(
    frame: &[u8],
    output: &mut [u8],
    element_size: usize,
    compressor: &C,
    options: &BitshuffleOptions,
) -> Result<usize, BitshuffleError> {
    validate_element_size(element_size)?;
    let header = FrameHeader::from_bytes(frame)?;
    check_header_field("element_size", element_size as u64, header.element_size as u64)?;

    let total_bytes = usize::try_from(header.total_bytes)
        .ok()
        .filter(|&total| total <= output.len())
        .ok_or(BitshuffleError::OutOfSpace {
            needed: usize::try_from(header.total_bytes).unwrap_or(usize::MAX),
            actual: output.len(),
        })?;

    decode_frame(frame, &header, &mut output[..total_bytes], compressor, options)?;
    Ok(total_bytes)
}

fn check_header_field(
    field: &'static str,
    expected: u64,
    actual: u64,
) -> Result<(), BitshuffleError> {
    if unlikely(expected != actual) {
        return Err(BitshuffleError::corrupt_frame(CorruptionKind::HeaderMismatch {
            field,
            expected,
            actual,
        }));
    }
    Ok(())
}

/// Builds the block layout described by a frame header.
///
/// # Errors
///
/// [`BitshuffleError::CorruptFrame`] if the header is internally inconsistent.
pub(crate) fn header_layout(header: &FrameHeader) -> Result<BlockLayout, BitshuffleError> {
    let element_size = header.element_size as usize;
    if element_size == 0 {
        return Err(BitshuffleError::corrupt_frame(
            CorruptionKind::InvalidElementSize,
        ));
    }

    if header.total_bytes % element_size as u64 != 0 {
        return Err(BitshuffleError::corrupt_frame(
            CorruptionKind::MisalignedTotal {
                total_bytes: header.total_bytes,
                element_size: header.element_size,
            },
        ));
    }

    // A total that doesn't fit in memory can't be decoded either.
    let element_count = usize::try_from(header.total_bytes / element_size as u64)
        .map_err(|_| BitshuffleError::corrupt_frame(CorruptionKind::TruncatedRecord))?;

    BlockLayout::new(element_count, element_size, header.block_size as usize).map_err(|_| {
        BitshuffleError::corrupt_frame(CorruptionKind::InvalidBlockSize(header.block_size))
    })
}

/// Walks the record headers of `frame` and checks them against `layout`.
///
/// Records are only collected while the frame has bytes for them, so a header promising
/// billions of blocks fails at the first missing record instead of allocating for all of
/// them.
pub(crate) fn scan_records(
    frame: &[u8],
    layout: &BlockLayout,
) -> Result<Vec<RecordLocation>, BitshuffleError> {
    let mut records = Vec::new();
    let mut cursor = FRAME_HEADER_SIZE;

    for span in layout.spans() {
        let block = span.index;
        let header = RecordHeader::from_bytes(&frame[cursor..], block)?;
        let start = cursor + RECORD_HEADER_SIZE;
        let payload_len = header.payload_len as usize;
        let end = start
            .checked_add(payload_len)
            .filter(|&end| end <= frame.len())
            .ok_or(BitshuffleError::corrupt_block(
                block,
                CorruptionKind::TruncatedRecord,
            ))?;

        match header.flag {
            RecordFlag::Raw if payload_len != span.byte_len => {
                return Err(BitshuffleError::corrupt_block(
                    block,
                    CorruptionKind::RawLengthMismatch {
                        expected: span.byte_len,
                        actual: payload_len,
                    },
                ));
            }
            RecordFlag::Compressed if span.kind == SpanKind::Tail => {
                return Err(BitshuffleError::corrupt_block(
                    block,
                    CorruptionKind::CompressedTail,
                ));
            }
            RecordFlag::Compressed if payload_len >= span.byte_len => {
                return Err(BitshuffleError::corrupt_block(
                    block,
                    CorruptionKind::CompressedNotSmaller {
                        block_bytes: span.byte_len,
                        payload: payload_len,
                    },
                ));
            }
            _ => {}
        }

        records.push(RecordLocation {
            span,
            flag: header.flag,
            payload: start..end,
        });
        cursor = end;
    }

    if unlikely(cursor != frame.len()) {
        return Err(BitshuffleError::corrupt_frame(
            CorruptionKind::TrailingBytes(frame.len() - cursor),
        ));
    }

    Ok(records)
}

/// Scratch buffers owned by one worker, reused for every block it handles.
#[derive(Default)]
struct DecodeScratch {
    decompressed: Vec<u8>,
    temp: Vec<u8>,
}

/// Decodes every record of `frame` into `output`, which is exactly the decompressed length.
fn decode_frame<C: BlockCompressor>(
    frame: &[u8],
    header: &FrameHeader,
    output: &mut [u8],
    compressor: &C,
    options: &BitshuffleOptions,
) -> Result<(), BitshuffleError> {
    let layout = header_layout(header)?;
    let records = scan_records(frame, &layout)?;
    let engine = options.engine()?;
    let pool = options.worker_pool()?;

    log::debug!(
        "Decompressing {} records into {} bytes with {}, {} using {}",
        records.len(),
        layout.total_bytes(),
        compressor.name(),
        options.mode.name(),
        engine.kernel()
    );

    let lengths: Vec<usize> = records.iter().map(|record| record.span.byte_len).collect();
    let (offsets, total) = exclusive_prefix_sum(&lengths);
    let available = output.len();
    let slots = split_disjoint(output, &offsets, total).ok_or(BitshuffleError::OutOfSpace {
        needed: total,
        actual: available,
    })?;

    let items: Vec<_> = records.into_iter().zip(slots).collect();
    let element_size = layout.element_size();
    pool.for_each_slot(items, DecodeScratch::default, |scratch, (record, slot)| {
        decode_block(
            &frame[record.payload.clone()],
            &record,
            slot,
            element_size,
            &engine,
            options.mode,
            compressor,
            scratch,
        )
    })
}

#[allow(clippy::too_many_arguments)]
fn decode_block<C: BlockCompressor>(
    payload: &[u8],
    record: &RecordLocation,
    output: &mut [u8],
    element_size: usize,
    engine: &TransposeEngine,
    mode: TransformMode,
    compressor: &C,
    scratch: &mut DecodeScratch,
) -> Result<(), BitshuffleError> {
    let block = record.span.index;
    let len = output.len();
    let temp = resized(&mut scratch.temp, len);

    match (record.span.kind, record.flag) {
        (SpanKind::Tail, _) => output.copy_from_slice(payload),
        (SpanKind::Transformed, RecordFlag::Raw) => engine
            .invert(mode, payload, output, temp, element_size)
            .map_err(|e| BitshuffleError::transform(block, e))?,
        (SpanKind::Transformed, RecordFlag::Compressed) => {
            let decompressed = resized(&mut scratch.decompressed, len);
            let written = compressor
                .decompress(payload, decompressed)
                .map_err(|e| BitshuffleError::CompressorFailure {
                    block,
                    codec: compressor.name(),
                    message: e.to_string(),
                })?;

            if unlikely(written != len) {
                return Err(BitshuffleError::corrupt_block(
                    block,
                    CorruptionKind::DecodedLengthMismatch {
                        expected: len,
                        actual: written,
                    },
                ));
            }

            engine
                .invert(mode, decompressed, output, temp, element_size)
                .map_err(|e| BitshuffleError::transform(block, e))?
        }
    }
    Ok(())
}

fn resized(buffer: &mut Vec<u8>, len: usize) -> &mut [u8] {
    if buffer.len() < len {
        buffer.resize(len, 0);
    }
    &mut buffer[..len]
}
