//! # Frame Format
//!
//! A frame is a 13 byte header followed by one record per block, in block order.
//! All integers are big endian.
//!
//! ```ignore
//! Header:
//! +----------------------+--------------------+------------------+
//! | total_bytes (u64)    | block_size (u32)   | element_size (u8)|
//! +----------------------+--------------------+------------------+
//!
//! Record:
//! +----------------------+-----------+------------------------+
//! | payload_length (u32) | flag (u8) | payload_length bytes   |
//! +----------------------+-----------+------------------------+
//! ```
//!
//! `total_bytes` is the decompressed length, `block_size` is counted in elements. There is no
//! record count; the decoder derives it from the header (see [`BlockLayout`]).
//!
//! [`BlockLayout`]: crate::layout::BlockLayout

use crate::error::{BitshuffleError, CorruptionKind};

/// Size of the serialized [`FrameHeader`].
pub const FRAME_HEADER_SIZE: usize = 13;

/// Size of the serialized [`RecordHeader`].
pub const RECORD_HEADER_SIZE: usize = 5;

/// How a record's payload is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordFlag {
    /// The payload is the block as is (transposed, unless it is the tail).
    Raw = 0,
    /// The payload is the transposed block, compressed.
    Compressed = 1,
}

impl RecordFlag {
    /// Parses a flag byte.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(RecordFlag::Raw),
            1 => Some(RecordFlag::Compressed),
            _ => None,
        }
    }
}

/// The header at the start of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Length of the original buffer in bytes.
    pub total_bytes: u64,
    /// Number of elements per block.
    pub block_size: u32,
    /// Size of each element in bytes.
    pub element_size: u8,
}

impl FrameHeader {
    /// Serializes the header.
    pub fn to_bytes(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut bytes = [0u8; FRAME_HEADER_SIZE];
        bytes[0..8].copy_from_slice(&self.total_bytes.to_be_bytes());
        bytes[8..12].copy_from_slice(&self.block_size.to_be_bytes());
        bytes[12] = self.element_size;
        bytes
    }

    /// Reads a header from the start of `frame`.
    ///
    /// # Errors
    ///
    /// [`CorruptionKind::TruncatedHeader`] if `frame` is shorter than the header.
    pub fn from_bytes(frame: &[u8]) -> Result<Self, BitshuffleError> {
        let Some(bytes) = frame.get(..FRAME_HEADER_SIZE) else {
            return Err(BitshuffleError::corrupt_frame(
                CorruptionKind::TruncatedHeader(FRAME_HEADER_SIZE),
            ));
        };

        let mut total_bytes = [0u8; 8];
        let mut block_size = [0u8; 4];
        total_bytes.copy_from_slice(&bytes[0..8]);
        block_size.copy_from_slice(&bytes[8..12]);

        Ok(Self {
            total_bytes: u64::from_be_bytes(total_bytes),
            block_size: u32::from_be_bytes(block_size),
            element_size: bytes[12],
        })
    }
}

/// The header in front of every record's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Length of the payload in bytes.
    pub payload_len: u32,
    /// How the payload is stored.
    pub flag: RecordFlag,
}

impl RecordHeader {
    /// Serializes the header.
    pub fn to_bytes(&self) -> [u8; RECORD_HEADER_SIZE] {
        let mut bytes = [0u8; RECORD_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.payload_len.to_be_bytes());
        bytes[4] = self.flag as u8;
        bytes
    }

    /// Reads the header of block `block` from the start of `bytes`.
    ///
    /// # Errors
    ///
    /// - [`CorruptionKind::TruncatedRecord`] if `bytes` is shorter than the header
    /// - [`CorruptionKind::UnknownFlag`] if the flag is neither RAW nor COMPRESSED
    pub fn from_bytes(bytes: &[u8], block: usize) -> Result<Self, BitshuffleError> {
        let Some(bytes) = bytes.get(..RECORD_HEADER_SIZE) else {
            return Err(BitshuffleError::corrupt_block(
                block,
                CorruptionKind::TruncatedRecord,
            ));
        };

        let mut payload_len = [0u8; 4];
        payload_len.copy_from_slice(&bytes[0..4]);
        let flag = RecordFlag::from_u8(bytes[4]).ok_or(BitshuffleError::corrupt_block(
            block,
            CorruptionKind::UnknownFlag(bytes[4]),
        ))?;

        Ok(Self {
            payload_len: u32::from_be_bytes(payload_len),
            flag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn frame_header_is_big_endian() {
        let header = FrameHeader {
            total_bytes: 0x0102_0304_0506_0708,
            block_size: 0x0A0B_0C0D,
            element_size: 4,
        };

        let bytes = header.to_bytes();
        assert_eq!(
            bytes,
            [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x0A, 0x0B, 0x0C, 0x0D, 0x04]
        );
        assert_eq!(FrameHeader::from_bytes(&bytes), Ok(header));
    }

    #[test]
    fn record_header_layout() {
        let header = RecordHeader {
            payload_len: 300,
            flag: RecordFlag::Compressed,
        };
        let bytes = header.to_bytes();
        assert_eq!(bytes, [0x00, 0x00, 0x01, 0x2C, 0x01]);
        assert_eq!(RecordHeader::from_bytes(&bytes, 0), Ok(header));
    }

    #[test]
    fn short_frame_header_is_rejected() {
        assert_eq!(
            FrameHeader::from_bytes(&[0u8; 12]),
            Err(BitshuffleError::corrupt_frame(
                CorruptionKind::TruncatedHeader(13)
            ))
        );
    }

    #[rstest]
    #[case::truncated(&[0u8, 0, 0, 8], CorruptionKind::TruncatedRecord)]
    #[case::unknown_flag(&[0u8, 0, 0, 8, 2], CorruptionKind::UnknownFlag(2))]
    fn bad_record_headers_are_rejected(#[case] bytes: &[u8], #[case] kind: CorruptionKind) {
        assert_eq!(
            RecordHeader::from_bytes(bytes, 7),
            Err(BitshuffleError::corrupt_block(7, kind))
        );
    }
}
