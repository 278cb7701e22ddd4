use crate::codec::Codec;
use crate::commands::build_options;
use crate::util::{read_file, size, write_file, Throughput};
use argh::FromArgs;
use bitshuffle_api::{compress, inspect, BlockCompressor};
use std::path::PathBuf;
use std::time::Instant;

#[derive(FromArgs, Debug)]
/// Compress a file of fixed width elements into a bitshuffle frame
#[argh(subcommand, name = "compress")]
pub struct CompressCmd {
    /// input file path
    #[argh(option)]
    pub input: PathBuf,

    /// output file path
    #[argh(option)]
    pub output: PathBuf,

    /// size of each element in bytes (1-255)
    #[argh(option)]
    pub element_size: usize,

    /// elements per block, a multiple of 8 [default: derived from the element size]
    #[argh(option)]
    pub block_size: Option<usize>,

    /// block codec: lz4, zstd, none [default: lz4]
    #[argh(option, default = "Codec::Lz4")]
    pub codec: Codec,

    /// zstd compression level (1-22)
    #[argh(option)]
    pub level: Option<i32>,

    /// worker threads, 0 for all cores [default: 0]
    #[argh(option, default = "0")]
    pub threads: usize,

    /// shuffle whole bytes instead of bits
    #[argh(switch)]
    pub byte_shuffle: bool,

    /// transpose kernel: portable, sse2, avx2 [default: best available]
    #[argh(option)]
    pub kernel: Option<String>,
}

pub fn handle_compress_command(cmd: CompressCmd) -> Result<(), Box<dyn std::error::Error>> {
    let options = build_options(
        cmd.block_size,
        cmd.threads,
        cmd.byte_shuffle,
        cmd.kernel.as_deref(),
    )?;
    let compressor = cmd.codec.compressor(cmd.level)?;
    let input = read_file(&cmd.input)?;
    log::debug!(
        "Compressing {} ({}) as {}-byte elements with {}",
        cmd.input.display(),
        size(input.len()),
        cmd.element_size,
        compressor.name()
    );

    let start = Instant::now();
    let frame = compress(&input, cmd.element_size, &compressor, &options)?;
    let elapsed = start.elapsed();

    write_file(&cmd.output, &frame)?;

    let summary = inspect(&frame)?;
    println!(
        "{} -> {} ({:.2}x) in {elapsed:.2?}, {}",
        size(input.len()),
        size(frame.len()),
        summary.ratio(),
        Throughput::new(input.len(), elapsed)
    );
    println!(
        "{} blocks of {} elements: {} compressed, {} raw",
        summary.records.len(),
        summary.header.block_size,
        summary.compressed_count(),
        summary.raw_count()
    );

    Ok(())
}
