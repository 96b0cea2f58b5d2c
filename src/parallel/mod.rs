//! Parallel processing module
//!
//! Fans work out per input file and per client. Results are always returned
//! in input order so output stays identical to a sequential run.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Configuration for parallel processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Number of worker threads (0 = auto-detect CPU count)
    pub num_threads: usize,
    /// Process the clients of one file concurrently
    pub per_client: bool,
    /// Process the files of a batch concurrently
    pub per_file: bool,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_threads: 0, // Auto-detect
            per_client: true,
            per_file: true,
        }
    }
}

impl ParallelConfig {
    /// Get actual number of threads to use
    pub fn actual_threads(&self) -> usize {
        if self.num_threads == 0 {
            #[cfg(feature = "parallel")]
            {
                num_cpus::get().max(1)
            }
            #[cfg(not(feature = "parallel"))]
            {
                1
            }
        } else {
            self.num_threads
        }
    }

    /// Initialize the global thread pool with configured thread count
    #[cfg(feature = "parallel")]
    pub fn init_thread_pool(&self) -> Result<(), rayon::ThreadPoolBuildError> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.actual_threads())
            .build_global()
    }

    /// Create a new config with specified thread count
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Disable all fan-out
    pub fn sequential(mut self) -> Self {
        self.per_client = false;
        self.per_file = false;
        self
    }
}

/// Thread-safe processing counters
#[derive(Debug, Default)]
pub struct ParallelStats {
    pub files_processed: AtomicU64,
    pub files_failed: AtomicU64,
    pub clients_processed: AtomicU64,
    pub windows_processed: AtomicU64,
    pub records_dropped: AtomicU64,
    /// Current active workers
    pub active_workers: AtomicUsize,
}

impl ParallelStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create shared stats
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    #[inline]
    pub fn inc_files(&self) {
        self.files_processed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_failures(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_clients(&self, count: u64) {
        self.clients_processed.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_windows(&self, count: u64) {
        self.windows_processed.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_dropped(&self, count: u64) {
        self.records_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn get_files(&self) -> u64 {
        self.files_processed.load(Ordering::Relaxed)
    }

    pub fn get_failures(&self) -> u64 {
        self.files_failed.load(Ordering::Relaxed)
    }

    pub fn get_clients(&self) -> u64 {
        self.clients_processed.load(Ordering::Relaxed)
    }

    pub fn get_windows(&self) -> u64 {
        self.windows_processed.load(Ordering::Relaxed)
    }

    pub fn get_dropped(&self) -> u64 {
        self.records_dropped.load(Ordering::Relaxed)
    }

    /// Mark a worker busy until the returned guard is dropped
    pub fn enter(&self) -> WorkerGuard<'_> {
        self.active_workers.fetch_add(1, Ordering::Relaxed);
        WorkerGuard { stats: self }
    }

    pub fn active(&self) -> usize {
        self.active_workers.load(Ordering::Relaxed)
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.files_processed.store(0, Ordering::Relaxed);
        self.files_failed.store(0, Ordering::Relaxed);
        self.clients_processed.store(0, Ordering::Relaxed);
        self.windows_processed.store(0, Ordering::Relaxed);
        self.records_dropped.store(0, Ordering::Relaxed);
    }
}

pub struct WorkerGuard<'a> {
    stats: &'a ParallelStats,
}

impl Drop for WorkerGuard<'_> {
    fn drop(&mut self) {
        self.stats.active_workers.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Order-preserving map, concurrent when `parallel` is set and the
/// `parallel` feature is enabled.
#[cfg(feature = "parallel")]
pub fn maybe_par_map<T, R, F>(items: Vec<T>, parallel: bool, f: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Send + Sync,
{
    if parallel {
        items.par_map(f)
    } else {
        items.into_iter().map(f).collect()
    }
}

/// Order-preserving map (non-parallel fallback)
#[cfg(not(feature = "parallel"))]
pub fn maybe_par_map<T, R, F>(items: Vec<T>, _parallel: bool, f: F) -> Vec<R>
where
    F: Fn(T) -> R,
{
    items.into_iter().map(f).collect()
}

/// Parallel iterator extension for processing
#[cfg(feature = "parallel")]
pub trait ParallelExt<T> {
    /// Process items in parallel, returning results in input order
    fn par_map<F, R>(self, f: F) -> Vec<R>
    where
        F: Fn(T) -> R + Send + Sync,
        R: Send;
}

#[cfg(feature = "parallel")]
impl<T: Send> ParallelExt<T> for Vec<T> {
    fn par_map<F, R>(self, f: F) -> Vec<R>
    where
        F: Fn(T) -> R + Send + Sync,
        R: Send,
    {
        self.into_par_iter().map(f).collect()
    }
}
