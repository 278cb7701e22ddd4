//! Reading the structure of a frame without decoding it.

use crate::decode::{header_layout, scan_records};
use crate::error::BitshuffleError;
use crate::format::{FrameHeader, RecordFlag};
use crate::layout::SpanKind;
use alloc::vec::Vec;

/// One record of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSummary {
    /// Index of the block.
    pub block: usize,
    /// How the payload is stored.
    pub flag: RecordFlag,
    /// Whether the block is transformed or the untransformed tail.
    pub kind: SpanKind,
    /// Length of the stored payload in bytes.
    pub payload_len: usize,
    /// Length of the block once decoded, in bytes.
    pub decoded_len: usize,
}

/// Header and record list of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSummary {
    /// The frame header.
    pub header: FrameHeader,
    /// Every record, in block order.
    pub records: Vec<RecordSummary>,
    /// Length of the whole frame in bytes.
    pub frame_len: usize,
}

impl FrameSummary {
    /// Number of records stored raw.
    pub fn raw_count(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.flag == RecordFlag::Raw)
            .count()
    }

    /// Number of records stored compressed.
    pub fn compressed_count(&self) -> usize {
        self.records.len() - self.raw_count()
    }

    /// Decompressed length divided by frame length. `0.0` for an empty buffer.
    pub fn ratio(&self) -> f64 {
        if self.header.total_bytes == 0 {
            return 0.0;
        }
        self.header.total_bytes as f64 / self.frame_len as f64
    }
}

/// Parses the header and record headers of `frame`, checking its structure.
///
/// Payloads are not decompressed, so a frame that passes may still fail to decode if a
/// compressed payload is damaged.
///
/// # Errors
///
/// [`BitshuffleError::CorruptFrame`] if the header or any record header is malformed.
///
/// # Examples
///
/// ```rust
/// use bitshuffle_api::{compress, inspect, BitshuffleOptions, NoCompression};
///
/// let frame = compress(&[0u8; 1000], 4, &NoCompression, &BitshuffleOptions::default())?;
/// let summary = inspect(&frame)?;
/// assert_eq!(summary.header.total_bytes, 1000);
/// assert_eq!(summary.compressed_count(), 0);
/// # Ok::<(), bitshuffle_api::BitshuffleError>(())
/// ```
pub fn inspect(frame: &[u8]) -> Result<FrameSummary, BitshuffleError> {
    let header = FrameHeader::from_bytes(frame)?;
    let layout = header_layout(&header)?;
    let records = scan_records(frame, &layout)?
        .into_iter()
        .map(|record| RecordSummary {
            block: record.span.index,
            flag: record.flag,
            kind: record.span.kind,
            payload_len: record.payload.len(),
            decoded_len: record.span.byte_len,
        })
        .collect();

    Ok(FrameSummary {
        header,
        records,
        frame_len: frame.len(),
    })
}
