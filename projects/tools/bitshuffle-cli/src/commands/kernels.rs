use argh::FromArgs;
use bitshuffle_api::KernelId;

#[derive(FromArgs, Debug)]
/// List the transpose kernels and whether this CPU supports them
#[argh(subcommand, name = "kernels")]
pub struct KernelsCmd {}

pub fn handle_kernels_command(_cmd: KernelsCmd) {
    let selected = KernelId::detect();
    for kernel in KernelId::all_values() {
        let status = if kernel.is_supported() {
            "supported"
        } else {
            "unsupported"
        };
        let marker = if *kernel == selected { " (selected)" } else { "" };
        println!(
            "{:<10} {:>3} bytes/step  {status}{marker}",
            kernel.name(),
            kernel.width_bytes()
        );
    }
}
