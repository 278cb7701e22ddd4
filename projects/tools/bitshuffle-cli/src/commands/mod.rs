pub mod compress;
pub mod decompress;
pub mod inspect;
pub mod kernels;

use crate::error::CliError;
use bitshuffle_api::{BitshuffleOptions, BitshuffleOptionsBuilder, KernelId, TransformMode};

/// Options shared by the commands that run the transform.
pub(crate) fn build_options(
    block_size: Option<usize>,
    threads: usize,
    byte_shuffle: bool,
    kernel: Option<&str>,
) -> Result<BitshuffleOptions, CliError> {
    let mut builder = BitshuffleOptionsBuilder::new().threads(threads).mode(
        if byte_shuffle {
            TransformMode::ByteShuffle
        } else {
            TransformMode::BitShuffle
        },
    );

    if let Some(block_size) = block_size {
        builder = builder.block_size(block_size);
    }

    if let Some(kernel) = kernel {
        let kernel: KernelId = kernel.parse().map_err(|_| {
            CliError::InvalidArgument(format!(
                "Unknown kernel: {kernel}. Valid options: {}",
                KernelId::all_values()
                    .iter()
                    .map(|k| k.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })?;
        builder = builder.kernel(kernel);
    }

    let options = builder.build();
    log::debug!("Using {options:?}");
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_byte_shuffle_options() {
        let options = build_options(Some(256), 2, true, Some("portable")).unwrap();
        assert_eq!(options.block_size, Some(256));
        assert_eq!(options.threads, 2);
        assert_eq!(options.mode, TransformMode::ByteShuffle);
        assert_eq!(options.kernel, Some(KernelId::Portable));
    }

    #[test]
    fn leaves_defaults_when_nothing_is_given() {
        let options = build_options(None, 0, false, None).unwrap();
        assert_eq!(options, BitshuffleOptions::default());
    }

    #[test]
    fn rejects_unknown_kernel() {
        assert!(matches!(
            build_options(None, 1, false, Some("neon")),
            Err(CliError::InvalidArgument(_))
        ));
    }
}
