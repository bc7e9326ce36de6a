//! Bounded worker pool backing the non-blocking dispatch layer.
//!
//! Each handle owns one [`WorkerPool`]; the free `*_async` functions share
//! a lazily-created process-wide pool. Dispatch hands the job's return
//! value back through a oneshot channel, so every pooled call resolves via
//! its own future and completion order never matters.

use futures::channel::oneshot;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{Error, Result};

pub(crate) struct WorkerPool {
    inner: ThreadPool,
}

impl WorkerPool {
    /// Build a pool with `threads` workers; `0` sizes it to the number of
    /// logical CPUs.
    pub(crate) fn new(threads: usize) -> Result<Self> {
        let inner = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("jxlx-worker-{}", i))
            .build()
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
        tracing::debug!(
            threads = inner.current_num_threads(),
            "codec worker pool started"
        );
        Ok(Self { inner })
    }

    /// Submit a job; the receiver resolves when the job completes.
    ///
    /// Once submitted the job always runs to completion; dropping the
    /// receiver does not cancel it.
    pub(crate) fn dispatch<T, F>(&self, job: F) -> oneshot::Receiver<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.inner.spawn(move || {
            // The caller may have abandoned its future; that is not an error.
            let _ = tx.send(job());
        });
        rx
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        tracing::debug!("codec worker pool shutting down");
    }
}

/// Await a dispatched result, mapping a dropped sender to
/// [`Error::PoolTerminated`].
pub(crate) async fn resolve<T>(rx: oneshot::Receiver<Result<T>>) -> Result<T> {
    rx.await.map_err(|_| Error::PoolTerminated)?
}

/// The process-wide pool used by the free `*_async` functions.
#[cfg(feature = "libjxl")]
pub(crate) fn shared() -> Result<&'static WorkerPool> {
    use std::sync::OnceLock;

    static SHARED: OnceLock<WorkerPool> = OnceLock::new();
    if let Some(pool) = SHARED.get() {
        return Ok(pool);
    }
    let pool = WorkerPool::new(0)?;
    // A lost race just drops the redundant, still-idle pool.
    Ok(SHARED.get_or_init(|| pool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_dispatch_resolves_to_job_result() {
        let pool = WorkerPool::new(2).expect("pool should build");
        let rx = pool.dispatch(|| 6 * 7);
        assert_eq!(block_on(rx).expect("job should report back"), 42);
    }

    #[test]
    fn test_auto_sizing_uses_at_least_one_thread() {
        let pool = WorkerPool::new(0).expect("pool should build");
        assert!(pool.inner.current_num_threads() >= 1);
    }

    #[test]
    fn test_queued_jobs_finish_before_drop_returns() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let pool = WorkerPool::new(1).expect("pool should build");
        let done = Arc::new(AtomicUsize::new(0));
        let mut receivers = Vec::new();
        for _ in 0..8 {
            let done = Arc::clone(&done);
            receivers.push(pool.dispatch(move || {
                std::thread::sleep(std::time::Duration::from_millis(2));
                done.fetch_add(1, Ordering::SeqCst);
            }));
        }
        drop(pool);
        assert_eq!(done.load(Ordering::SeqCst), 8);
    }
}
