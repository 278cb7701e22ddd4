use crate::error::CliError;
use bitshuffle_api::{BlockCompressor, NoCompression};
use bitshuffle_lz4::Lz4BlockCompressor;
use bitshuffle_zstd::ZStandardBlockCompressor;
use std::str::FromStr;

/// Codecs selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Lz4,
    Zstd,
    None,
}

impl FromStr for Codec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lz4" => Ok(Self::Lz4),
            "zstd" => Ok(Self::Zstd),
            "none" => Ok(Self::None),
            _ => Err(format!(
                "Unknown codec: {s}. Valid options: lz4, zstd, none"
            )),
        }
    }
}

impl Codec {
    /// Creates the compressor. `level` only applies to zstd.
    pub fn compressor(self, level: Option<i32>) -> Result<AnyCompressor, CliError> {
        Ok(match self {
            Codec::Lz4 => AnyCompressor::Lz4(Lz4BlockCompressor::new()),
            Codec::Zstd => AnyCompressor::Zstd(match level {
                Some(level) => ZStandardBlockCompressor::new(level)
                    .map_err(|e| CliError::Codec(e.to_string()))?,
                None => ZStandardBlockCompressor::new_default(),
            }),
            Codec::None => AnyCompressor::None(NoCompression),
        })
    }
}

/// One of the codecs, chosen at runtime.
#[derive(Debug, Clone, Copy)]
pub enum AnyCompressor {
    Lz4(Lz4BlockCompressor),
    Zstd(ZStandardBlockCompressor),
    None(NoCompression),
}

impl BlockCompressor for AnyCompressor {
    type Error = String;

    fn name(&self) -> &'static str {
        match self {
            AnyCompressor::Lz4(c) => c.name(),
            AnyCompressor::Zstd(c) => c.name(),
            AnyCompressor::None(c) => c.name(),
        }
    }

    fn max_compressed_size(&self, len_bytes: usize) -> usize {
        match self {
            AnyCompressor::Lz4(c) => c.max_compressed_size(len_bytes),
            AnyCompressor::Zstd(c) => c.max_compressed_size(len_bytes),
            AnyCompressor::None(c) => c.max_compressed_size(len_bytes),
        }
    }

    fn compress(&self, input: &[u8], output: &mut [u8]) -> Result<usize, Self::Error> {
        match self {
            AnyCompressor::Lz4(c) => c.compress(input, output).map_err(|e| e.to_string()),
            AnyCompressor::Zstd(c) => c.compress(input, output).map_err(|e| e.to_string()),
            AnyCompressor::None(c) => c.compress(input, output).map_err(|e| e.to_string()),
        }
    }

    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<usize, Self::Error> {
        match self {
            AnyCompressor::Lz4(c) => c.decompress(input, output).map_err(|e| e.to_string()),
            AnyCompressor::Zstd(c) => c.decompress(input, output).map_err(|e| e.to_string()),
            AnyCompressor::None(c) => c.decompress(input, output).map_err(|e| e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::lz4("lz4", Codec::Lz4)]
    #[case::zstd("ZSTD", Codec::Zstd)]
    #[case::none("none", Codec::None)]
    fn parses_codec_names(#[case] name: &str, #[case] expected: Codec) {
        assert_eq!(name.parse::<Codec>(), Ok(expected));
    }

    #[test]
    fn rejects_unknown_codec() {
        assert!("brotli".parse::<Codec>().is_err());
    }

    #[rstest]
    #[case::lz4(Codec::Lz4)]
    #[case::zstd(Codec::Zstd)]
    #[case::none(Codec::None)]
    fn compressor_roundtrips(#[case] codec: Codec) {
        let compressor = codec.compressor(None).unwrap();
        let input = [3u8; 512];
        let mut compressed = vec![0u8; compressor.max_compressed_size(input.len())];
        let len = compressor.compress(&input, &mut compressed).unwrap();

        let mut restored = [0u8; 512];
        let restored_len = compressor
            .decompress(&compressed[..len], &mut restored)
            .unwrap();
        assert_eq!(restored_len, 512);
        assert_eq!(restored, input);
    }

    #[test]
    fn rejects_bad_zstd_level() {
        assert!(matches!(
            Codec::Zstd.compressor(Some(99)),
            Err(CliError::Codec(_))
        ));
    }
}
