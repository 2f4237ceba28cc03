//! Order-preserving fan-out of a slice across scoped worker threads.
//!
//! Shared inputs are only borrowed immutably, so workers need no locking.

use crate::config::ParallelConfig;

/// Number of workers worth spawning for `len` items: never more than
/// `parallel.workers`, and every worker gets at least `parallel.min_chunk` items.
pub fn effective_workers(len: usize, parallel: &ParallelConfig) -> usize {
    let by_size = len / parallel.min_chunk.max(1);
    parallel.workers.min(by_size).max(1)
}

/// Apply `f` to contiguous chunks of `items` and concatenate the outputs in input order.
pub fn map_chunks<T, U, F>(items: &[T], parallel: &ParallelConfig, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&[T]) -> Vec<U> + Sync,
{
    let workers = effective_workers(items.len(), parallel);
    if workers <= 1 {
        return f(items);
    }

    let chunk_size = items.len().div_ceil(workers);
    log::debug!("partitioning {} items across {workers} workers", items.len());

    let f = &f;
    std::thread::scope(|scope| {
        let handles: Vec<_> = items
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || f(chunk)))
            .collect();

        let mut out = Vec::with_capacity(items.len());
        for handle in handles {
            match handle.join() {
                Ok(part) => out.extend(part),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        out
    })
}
