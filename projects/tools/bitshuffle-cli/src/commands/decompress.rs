use crate::codec::Codec;
use crate::commands::build_options;
use crate::error::CliError;
use crate::util::{read_file, size, write_file, Throughput};
use argh::FromArgs;
use bitshuffle_api::{decompress, BlockCompressor, FrameHeader};
use std::path::PathBuf;
use std::time::Instant;

#[derive(FromArgs, Debug)]
/// Decompress a bitshuffle frame back into the original file
#[argh(subcommand, name = "decompress")]
pub struct DecompressCmd {
    /// input file path
    #[argh(option)]
    pub input: PathBuf,

    /// output file path
    #[argh(option)]
    pub output: PathBuf,

    /// expected element size; checked against the frame header when given
    #[argh(option)]
    pub element_size: Option<usize>,

    /// block codec used to compress the frame: lz4, zstd, none [default: lz4]
    #[argh(option, default = "Codec::Lz4")]
    pub codec: Codec,

    /// worker threads, 0 for all cores [default: 0]
    #[argh(option, default = "0")]
    pub threads: usize,

    /// the frame was compressed with --byte-shuffle
    #[argh(switch)]
    pub byte_shuffle: bool,

    /// transpose kernel: portable, sse2, avx2 [default: best available]
    #[argh(option)]
    pub kernel: Option<String>,
}

pub fn handle_decompress_command(cmd: DecompressCmd) -> Result<(), Box<dyn std::error::Error>> {
    let options = build_options(None, cmd.threads, cmd.byte_shuffle, cmd.kernel.as_deref())?;
    let compressor = cmd.codec.compressor(None)?;
    let frame = read_file(&cmd.input)?;

    let header = FrameHeader::from_bytes(&frame)?;
    let element_size = cmd.element_size.unwrap_or(header.element_size as usize);
    let total_bytes = usize::try_from(header.total_bytes).map_err(|_| {
        CliError::InvalidArgument(format!(
            "Frame holds {} bytes, more than this platform can address",
            header.total_bytes
        ))
    })?;
    let element_count = total_bytes / element_size.max(1);
    log::debug!(
        "Decompressing {element_count} elements of {element_size} bytes in blocks of {} with {}",
        header.block_size,
        compressor.name()
    );

    let start = Instant::now();
    let output = decompress(&frame, element_count, element_size, &compressor, &options)?;
    let elapsed = start.elapsed();

    write_file(&cmd.output, &output)?;
    println!(
        "{} -> {} in {elapsed:.2?}, {}",
        size(frame.len()),
        size(output.len()),
        Throughput::new(output.len(), elapsed)
    );

    Ok(())
}
