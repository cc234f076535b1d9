//! Bounded-concurrency task queue for outbound RPC calls.
//!
//! A request fans out one task per on-chain item; each task waits for a
//! permit before its future is polled, so at most `concurrency` calls are in
//! flight across every request sharing the queue.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

/// Clone-shared limiter. Clones draw from the same permits.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    permits: Arc<Semaphore>,
    concurrency: usize,
}

impl TaskQueue {
    /// A queue admitting `concurrency` tasks at once (at least one).
    pub fn new(concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            permits: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    /// Run `task` once a slot is free. The slot is released when the task
    /// completes or is dropped.
    pub async fn run<F>(&self, task: F) -> F::Output
    where
        F: Future,
    {
        match self.permits.acquire().await {
            Ok(_permit) => task.await,
            Err(_) => {
                // Only reachable if the semaphore was closed
                tracing::warn!("Task queue closed, running without a permit");
                task.await
            }
        }
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }
}
