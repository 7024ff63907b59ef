//! Bounded worker pool for per-shift work.
//!
//! With the `parallel` feature the pool owns a dedicated rayon thread pool
//! with a larger per-thread stack; without it every operation runs inline
//! on the calling thread, producing identical results.

use thiserror::Error;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Stack size per worker thread.
#[cfg(feature = "parallel")]
const STACK_SIZE: usize = 8 * 1024 * 1024;

/// Failure to start the worker threads.
#[derive(Debug, Error)]
#[error("failed to build worker pool: {0}")]
pub struct PoolError(String);

/// Fixed-size pool running closures over slices and pairs of tasks.
pub struct WorkerPool {
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
    threads: usize,
}

impl WorkerPool {
    /// Pool with `threads` workers; `0` picks the number of logical CPUs.
    #[cfg(feature = "parallel")]
    pub fn new(threads: usize) -> Result<Self, PoolError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .stack_size(STACK_SIZE)
            .thread_name(|i| format!("timeslide-worker-{i}"))
            .build()
            .map_err(|e| PoolError(e.to_string()))?;
        let threads = pool.current_num_threads();
        Ok(Self { pool, threads })
    }

    /// Pool that runs everything on the calling thread.
    #[cfg(not(feature = "parallel"))]
    pub fn new(_threads: usize) -> Result<Self, PoolError> {
        Ok(Self { threads: 1 })
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run `a` and `b`, potentially in parallel, and wait for both.
    #[cfg(feature = "parallel")]
    pub fn join<A, B, RA, RB>(&self, a: A, b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        self.pool.install(|| rayon::join(a, b))
    }

    /// Run `a` then `b`.
    #[cfg(not(feature = "parallel"))]
    pub fn join<A, B, RA, RB>(&self, a: A, b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        (a(), b())
    }

    /// Apply `f(index, item)` to every item, returning results in input
    /// order once all have completed.
    #[cfg(feature = "parallel")]
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(usize, &T) -> R + Sync + Send,
    {
        self.pool.install(|| {
            items
                .par_iter()
                .enumerate()
                .map(|(i, item)| f(i, item))
                .collect()
        })
    }

    /// Apply `f(index, item)` to every item in order.
    #[cfg(not(feature = "parallel"))]
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(usize, &T) -> R + Sync + Send,
    {
        items.iter().enumerate().map(|(i, item)| f(i, item)).collect()
    }
}
