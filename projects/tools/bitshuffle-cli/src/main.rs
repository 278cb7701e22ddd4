#![allow(unexpected_cfgs)]
#![cfg(not(tarpaulin_include))]

mod codec;
mod commands;
mod error;
mod util;
use argh::FromArgs;
use core::error::Error;

#[derive(FromArgs, Debug)]
/// Bitshuffle compression tool for arrays of fixed width elements
struct TopLevel {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand)]
enum Commands {
    Compress(commands::compress::CompressCmd),
    Decompress(commands::decompress::DecompressCmd),
    Inspect(commands::inspect::InspectCmd),
    Kernels(commands::kernels::KernelsCmd),
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli: TopLevel = argh::from_env();

    match cli.command {
        Commands::Compress(cmd) => {
            commands::compress::handle_compress_command(cmd)?;
        }
        Commands::Decompress(cmd) => {
            commands::decompress::handle_decompress_command(cmd)?;
        }
        Commands::Inspect(cmd) => {
            commands::inspect::handle_inspect_command(cmd)?;
        }
        Commands::Kernels(cmd) => {
            commands::kernels::handle_kernels_command(cmd);
        }
    }

    Ok(())
}
