//! # Io-Chain
//!
//! Assembles independently produced records into one buffer in two phases.
//!
//! 1. **Size phase.** Every block is processed into a private buffer, possibly in parallel,
//!    which tells us the length of every record.
//! 2. **Placement phase.** An exclusive prefix sum over those lengths gives each record its
//!    final offset. The output is split into disjoint slices at those offsets and every
//!    record is written into its own slice.
//!
//! Record order is decided by the offsets alone, never by which worker finishes first, so
//! the output is identical for any number of threads. No locks are needed; the borrow
//! checker proves the slices don't overlap.

use crate::error::BitshuffleError;
use alloc::vec::Vec;

#[cfg(feature = "multithreaded")]
use {alloc::string::ToString, rayon::prelude::*};

/// Computes the exclusive prefix sum of `lengths`.
///
/// Returns the offset of every entry and the sum of all entries.
///
/// ```rust
/// use bitshuffle_api::iochain::exclusive_prefix_sum;
///
/// let (offsets, total) = exclusive_prefix_sum(&[5, 0, 3, 7]);
/// assert_eq!(offsets, [0, 5, 5, 8]);
/// assert_eq!(total, 15);
/// ```
pub fn exclusive_prefix_sum(lengths: &[usize]) -> (Vec<usize>, usize) {
    let mut offsets = Vec::with_capacity(lengths.len());
    let mut total = 0usize;
    for &length in lengths {
        offsets.push(total);
        total += length;
    }
    (offsets, total)
}

/// Splits the first `total` bytes of `buffer` into one slice per offset.
///
/// `offsets` and `total` are the output of [`exclusive_prefix_sum`]; slice `i` covers
/// `offsets[i]..offsets[i + 1]`, the last one ends at `total`.
///
/// Returns `None` if `total` exceeds `buffer.len()` or the offsets are not ascending from 0.
pub fn split_disjoint<'a>(
    buffer: &'a mut [u8],
    offsets: &[usize],
    total: usize,
) -> Option<Vec<&'a mut [u8]>> {
    let mut remaining = buffer.get_mut(..total)?;
    let mut slots = Vec::with_capacity(offsets.len());
    let mut position = 0;
    for (index, &start) in offsets.iter().enumerate() {
        let end = offsets.get(index + 1).copied().unwrap_or(total);
        if start != position || end < start {
            return None;
        }

        let (slot, rest) = core::mem::take(&mut remaining).split_at_mut(end - start);
        slots.push(slot);
        remaining = rest;
        position = end;
    }
    Some(slots)
}

/// Runs per-block work, sequentially or on a rayon thread pool.
///
/// Errors are reported deterministically: when several blocks fail, the error of the block
/// with the lowest index is returned. Blocks already running when an error occurs are
/// allowed to finish, and their results are dropped.
#[derive(Debug)]
pub struct WorkerPool {
    kind: PoolKind,
}

#[derive(Debug)]
enum PoolKind {
    Sequential,
    #[cfg(feature = "multithreaded")]
    Global,
    #[cfg(feature = "multithreaded")]
    Dedicated(rayon::ThreadPool),
}

impl WorkerPool {
    /// Creates a pool for `threads` workers.
    ///
    /// - `0` uses rayon's global pool, sized to the number of cores
    /// - `1` runs every block on the calling thread
    /// - `N` creates a dedicated pool of `N` threads
    ///
    /// Without the `multithreaded` feature every block runs on the calling thread.
    ///
    /// # Errors
    ///
    /// [`BitshuffleError::WorkerPool`] if the dedicated pool can't be created.
    pub fn new(threads: usize) -> Result<Self, BitshuffleError> {
        #[cfg(feature = "multithreaded")]
        {
            let kind = match threads {
                0 => {
                    log::debug!("Worker pool: rayon global pool");
                    PoolKind::Global
                }
                1 => {
                    log::debug!("Worker pool: sequential");
                    PoolKind::Sequential
                }
                threads => {
                    log::debug!("Worker pool: dedicated pool of {threads} threads");
                    let pool = rayon::ThreadPoolBuilder::new()
                        .num_threads(threads)
                        .build()
                        .map_err(|e| BitshuffleError::WorkerPool(e.to_string()))?;
                    PoolKind::Dedicated(pool)
                }
            };
            Ok(Self { kind })
        }

        #[cfg(not(feature = "multithreaded"))]
        {
            log::debug!("Worker pool: sequential ({threads} threads requested, multithreading disabled)");
            Ok(Self {
                kind: PoolKind::Sequential,
            })
        }
    }

    /// A pool that runs everything on the calling thread.
    pub const fn sequential() -> Self {
        Self {
            kind: PoolKind::Sequential,
        }
    }

    /// Returns `true` if blocks may run on more than one thread.
    pub fn is_parallel(&self) -> bool {
        !matches!(self.kind, PoolKind::Sequential)
    }

    /// Number of blocks that can run at the same time.
    pub fn parallelism(&self) -> usize {
        match &self.kind {
            PoolKind::Sequential => 1,
            #[cfg(feature = "multithreaded")]
            PoolKind::Global => rayon::current_num_threads(),
            #[cfg(feature = "multithreaded")]
            PoolKind::Dedicated(pool) => pool.current_num_threads(),
        }
    }

    /// Calls `f` for every index in `0..count` and collects the results in index order.
    ///
    /// `init` creates per-worker state (scratch buffers) that is reused between blocks
    /// handled by the same worker.
    pub fn map_blocks<S, T, Init, F>(
        &self,
        count: usize,
        init: Init,
        f: F,
    ) -> Result<Vec<T>, BitshuffleError>
    where
        T: Send,
        Init: Fn() -> S + Sync + Send,
        F: Fn(&mut S, usize) -> Result<T, BitshuffleError> + Sync + Send,
    {
        match &self.kind {
            PoolKind::Sequential => {
                let mut state = init();
                (0..count).map(|index| f(&mut state, index)).collect()
            }
            #[cfg(feature = "multithreaded")]
            PoolKind::Global => par_map_blocks(count, &init, &f),
            #[cfg(feature = "multithreaded")]
            PoolKind::Dedicated(pool) => pool.install(|| par_map_blocks(count, &init, &f)),
        }
    }

    /// Calls `f` once for every item, consuming `items`.
    ///
    /// Used for the placement phase, where every item owns a disjoint slice of the output.
    pub fn for_each_slot<I, S, Init, F>(
        &self,
        items: Vec<I>,
        init: Init,
        f: F,
    ) -> Result<(), BitshuffleError>
    where
        I: Send,
        Init: Fn() -> S + Sync + Send,
        F: Fn(&mut S, I) -> Result<(), BitshuffleError> + Sync + Send,
    {
        match &self.kind {
            PoolKind::Sequential => {
                let mut state = init();
                items.into_iter().try_for_each(|item| f(&mut state, item))
            }
            #[cfg(feature = "multithreaded")]
            PoolKind::Global => par_for_each_slot(items, &init, &f),
            #[cfg(feature = "multithreaded")]
            PoolKind::Dedicated(pool) => pool.install(|| par_for_each_slot(items, &init, &f)),
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::sequential()
    }
}

#[cfg(feature = "multithreaded")]
fn par_map_blocks<S, T, Init, F>(count: usize, init: &Init, f: &F) -> Result<Vec<T>, BitshuffleError>
where
    T: Send,
    Init: Fn() -> S + Sync + Send,
    F: Fn(&mut S, usize) -> Result<T, BitshuffleError> + Sync + Send,
{
    // Every block runs to completion; the first error by index wins.
    let results: Vec<Result<T, BitshuffleError>> = (0..count)
        .into_par_iter()
        .map_init(init, |state, index| f(state, index))
        .collect();
    results.into_iter().collect()
}

#[cfg(feature = "multithreaded")]
fn par_for_each_slot<I, S, Init, F>(items: Vec<I>, init: &Init, f: &F) -> Result<(), BitshuffleError>
where
    I: Send,
    Init: Fn() -> S + Sync + Send,
    F: Fn(&mut S, I) -> Result<(), BitshuffleError> + Sync + Send,
{
    let results: Vec<Result<(), BitshuffleError>> = items
        .into_par_iter()
        .map_init(init, |state, item| f(state, item))
        .collect();
    results.into_iter().collect()
}
