use crate::util::{read_file, size};
use argh::FromArgs;
use bitshuffle_api::{inspect, FrameSummary, RecordFlag};
use std::path::PathBuf;

#[derive(FromArgs, Debug)]
/// Print the header and block statistics of a bitshuffle frame
#[argh(subcommand, name = "inspect")]
pub struct InspectCmd {
    /// input file path
    #[argh(option)]
    pub input: PathBuf,

    /// list every block
    #[argh(switch)]
    pub blocks: bool,
}

pub fn handle_inspect_command(cmd: InspectCmd) -> Result<(), Box<dyn std::error::Error>> {
    let frame = read_file(&cmd.input)?;
    let summary = inspect(&frame)?;

    print_summary(&summary);
    if cmd.blocks {
        println!();
        println!("{:>8} {:>6} {:>10} {:>10}", "block", "flag", "stored", "decoded");
        for record in &summary.records {
            let flag = match record.flag {
                RecordFlag::Raw => "raw",
                RecordFlag::Compressed => "comp",
            };
            println!(
                "{:>8} {:>6} {:>10} {:>10}",
                record.block, flag, record.payload_len, record.decoded_len
            );
        }
    }

    Ok(())
}

fn print_summary(summary: &FrameSummary) {
    let header = &summary.header;
    println!("Frame size:      {}", size(summary.frame_len));
    println!("Decoded size:    {}", size(header.total_bytes as usize));
    println!("Ratio:           {:.3}x", summary.ratio());
    println!("Element size:    {} bytes", header.element_size);
    println!("Block size:      {} elements", header.block_size);
    println!(
        "Blocks:          {} ({} compressed, {} raw)",
        summary.records.len(),
        summary.compressed_count(),
        summary.raw_count()
    );
}
