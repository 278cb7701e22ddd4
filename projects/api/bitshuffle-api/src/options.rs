//! Configuration of compress, decompress and the blocked transforms.

use crate::error::BitshuffleError;
use crate::iochain::WorkerPool;
use crate::layout::{default_block_size, DEFAULT_TARGET_BLOCK_BYTES};
use bitshuffle_common::KernelId;
use bitshuffle_transpose::{TransformMode, TransposeEngine};

/// Options shared by every operation of this crate.
///
/// The same options (in particular [`mode`]) must be used to decompress a frame as were
/// used to compress it; the frame header only records the block and element sizes.
///
/// [`mode`]: BitshuffleOptions::mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitshuffleOptions {
    /// Elements per block. `None` picks one from [`target_block_bytes`].
    ///
    /// [`target_block_bytes`]: BitshuffleOptions::target_block_bytes
    pub block_size: Option<usize>,

    /// Block footprint in bytes used to derive the block size when none is set.
    pub target_block_bytes: usize,

    /// Number of worker threads. `0` uses all cores, `1` runs on the calling thread.
    pub threads: usize,

    /// Transpose kernel to use. `None` picks the best one for this CPU.
    pub kernel: Option<KernelId>,

    /// Transform applied to every block.
    pub mode: TransformMode,
}

impl BitshuffleOptions {
    /// Block size used for elements of `element_size` bytes.
    pub fn block_size_for(&self, element_size: usize) -> usize {
        self.block_size
            .unwrap_or_else(|| default_block_size(element_size, self.target_block_bytes))
    }

    /// Creates the transpose engine for these options.
    ///
    /// # Errors
    ///
    /// [`BitshuffleError::UnsupportedKernel`] if the requested kernel can't run on this CPU.
    pub fn engine(&self) -> Result<TransposeEngine, BitshuffleError> {
        match self.kernel {
            Some(kernel) => TransposeEngine::new(kernel)
                .map_err(|_| BitshuffleError::UnsupportedKernel(kernel)),
            None => Ok(TransposeEngine::detect()),
        }
    }

    /// Creates the worker pool for these options.
    pub fn worker_pool(&self) -> Result<WorkerPool, BitshuffleError> {
        WorkerPool::new(self.threads)
    }
}

impl Default for BitshuffleOptions {
    fn default() -> Self {
        BitshuffleOptionsBuilder::new().build()
    }
}

/// Builder for [`BitshuffleOptions`] with convenient configuration methods.
#[derive(Debug, Clone, Copy)]
pub struct BitshuffleOptionsBuilder {
    block_size: Option<usize>,
    target_block_bytes: Option<usize>,
    threads: Option<usize>,
    kernel: Option<KernelId>,
    mode: Option<TransformMode>,
}

impl BitshuffleOptionsBuilder {
    /// Create a new options builder.
    pub fn new() -> Self {
        Self {
            block_size: None,
            target_block_bytes: None,
            threads: None,
            kernel: None,
            mode: None,
        }
    }

    /// Set the number of elements per block.
    ///
    /// Must be a positive multiple of 8; this is checked when the options are used.
    /// Larger blocks usually compress better, smaller blocks parallelize better and stay in
    /// cache.
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = Some(block_size);
        self
    }

    /// Set the block footprint in bytes used when no block size is set.
    ///
    /// Defaults to [`DEFAULT_TARGET_BLOCK_BYTES`].
    pub fn target_block_bytes(mut self, bytes: usize) -> Self {
        self.target_block_bytes = Some(bytes);
        self
    }

    /// Set the number of worker threads.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Force a specific transpose kernel.
    ///
    /// Every kernel produces identical output; this is mostly useful for testing and
    /// benchmarking.
    pub fn kernel(mut self, kernel: KernelId) -> Self {
        self.kernel = Some(kernel);
        self
    }

    /// Set the transform applied to every block.
    pub fn mode(mut self, mode: TransformMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Build the options using the configured values.
    pub fn build(self) -> BitshuffleOptions {
        BitshuffleOptions {
            block_size: self.block_size,
            target_block_bytes: self.target_block_bytes.unwrap_or(DEFAULT_TARGET_BLOCK_BYTES),
            threads: self.threads.unwrap_or(0),
            kernel: self.kernel,
            mode: self.mode.unwrap_or_default(),
        }
    }
}

impl Default for BitshuffleOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = BitshuffleOptionsBuilder::new()
            .block_size(256)
            .threads(4)
            .kernel(KernelId::Portable)
            .mode(TransformMode::ByteShuffle)
            .build();

        assert_eq!(options.block_size, Some(256));
        assert_eq!(options.block_size_for(4), 256);
        assert_eq!(options.threads, 4);
        assert_eq!(options.kernel, Some(KernelId::Portable));
        assert_eq!(options.mode, TransformMode::ByteShuffle);
    }

    #[test]
    fn test_options_builder_defaults() {
        let options = BitshuffleOptionsBuilder::new().build();

        assert_eq!(options.block_size, None);
        assert_eq!(options.target_block_bytes, DEFAULT_TARGET_BLOCK_BYTES);
        assert_eq!(options.threads, 0);
        assert_eq!(options.kernel, None);
        assert_eq!(options.mode, TransformMode::BitShuffle);
        assert_eq!(options, BitshuffleOptions::default());
    }

    #[test]
    fn block_size_follows_target() {
        let options = BitshuffleOptionsBuilder::new()
            .target_block_bytes(4096)
            .build();
        assert_eq!(options.block_size_for(4), 1024);
        assert_eq!(options.block_size_for(64), 128);
    }

    #[test]
    fn portable_kernel_always_builds_an_engine() {
        let options = BitshuffleOptionsBuilder::new()
            .kernel(KernelId::Portable)
            .build();
        assert_eq!(options.engine().unwrap().kernel(), KernelId::Portable);
    }
}
