//! Concurrent batch runner
//!
//! Runs a list of independent tasks on a bounded rayon pool built for the
//! batch and dropped when it returns. Results come back in input order
//! whatever order the tasks finish in, and a panicking task fails only
//! itself.

use crate::fetch::TaskStatus;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use tracing::{trace, warn};

/// Failure of a single task inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskFailure {
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Failure of the batch as a whole.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Pool size for a batch: `min(concurrency, tasks)`, at least one thread.
pub fn pool_size(concurrency: usize, tasks: usize) -> usize {
    concurrency.min(tasks).max(1)
}

/// Runs `f` over every task and returns one result per task, in order.
///
/// An empty task list returns immediately without building a pool.
pub fn run_batch_with<T, R, F>(
    tasks: Vec<T>,
    concurrency: usize,
    f: F,
) -> Result<Vec<Result<R, TaskFailure>>, BatchError>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    let threads = pool_size(concurrency, tasks.len());
    trace!(tasks = tasks.len(), threads, "Starting batch");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("tile-worker-{}", i))
        .build()?;

    let results = pool.install(|| {
        tasks
            .into_par_iter()
            .map(|task| {
                catch_unwind(AssertUnwindSafe(|| f(task)))
                    .map_err(|payload| TaskFailure::Panicked(panic_message(payload.as_ref())))
            })
            .collect()
    });

    Ok(results)
}

/// Runs fetch-style tasks and returns their status codes, in order.
///
/// A panicking task is reported as [`TaskStatus::Failed`].
pub fn run_batch<T, F>(
    tasks: Vec<T>,
    concurrency: usize,
    f: F,
) -> Result<Vec<TaskStatus>, BatchError>
where
    T: Send,
    F: Fn(T) -> TaskStatus + Sync,
{
    let results = run_batch_with(tasks, concurrency, f)?;
    Ok(results
        .into_iter()
        .map(|result| match result {
            Ok(status) => status,
            Err(failure) => {
                warn!(error = %failure, "Task did not complete");
                TaskStatus::Failed
            }
        })
        .collect())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_pool_size_bounds() {
        assert_eq!(pool_size(8, 3), 3);
        assert_eq!(pool_size(2, 10), 2);
        assert_eq!(pool_size(0, 10), 1);
        assert_eq!(pool_size(4, 0), 1);
    }

    #[test]
    fn test_empty_batch() {
        let results = run_batch_with(Vec::<u32>::new(), 4, |x| x).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_order_preserved_under_random_completion() {
        let tasks: Vec<u64> = (0..40).collect();
        let results = run_batch_with(tasks, 8, |i| {
            let delay = rand::thread_rng().gen_range(0..5);
            thread::sleep(Duration::from_millis(delay));
            i * 10
        })
        .unwrap();

        let values: Vec<u64> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, (0..40).map(|i| i * 10).collect::<Vec<_>>());
    }

    #[test]
    fn test_concurrency_is_bounded() {
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        run_batch_with((0..24).collect::<Vec<_>>(), 3, |_| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            active.fetch_sub(1, Ordering::SeqCst);
        })
        .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn test_panic_contained_to_one_task() {
        let results = run_batch_with(vec![1, 2, 3, 4], 2, |i| {
            if i == 3 {
                panic!("tile exploded");
            }
            i
        })
        .unwrap();

        assert_eq!(results[0], Ok(1));
        assert_eq!(results[1], Ok(2));
        assert_eq!(
            results[2],
            Err(TaskFailure::Panicked("tile exploded".to_string()))
        );
        assert_eq!(results[3], Ok(4));
    }

    #[test]
    fn test_run_batch_statuses() {
        let statuses = run_batch(vec![0, 1, 2, 3, 4, 5], 4, |i| {
            if i % 3 == 0 {
                TaskStatus::Failed
            } else if i == 5 {
                panic!("boom {}", i);
            } else {
                TaskStatus::Success
            }
        })
        .unwrap();

        let codes: Vec<u8> = statuses.iter().map(|s| s.code()).collect();
        assert_eq!(codes, vec![1, 0, 0, 1, 0, 1]);
    }

    #[test]
    fn test_tasks_may_own_mutable_regions() {
        let mut buffer = vec![0u8; 16];
        let regions: Vec<(usize, &mut [u8])> = buffer.chunks_mut(4).enumerate().collect();

        let seen = Mutex::new(HashSet::new());
        run_batch(regions, 4, |(i, region)| {
            region.fill(i as u8 + 1);
            seen.lock().unwrap().insert(i);
            TaskStatus::Success
        })
        .unwrap();

        assert_eq!(seen.into_inner().unwrap().len(), 4);
        assert_eq!(buffer, vec![1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4]);
    }
}
