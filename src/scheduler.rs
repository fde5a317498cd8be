// src/scheduler.rs
//
// =============================================================================
// RESUMEPILOT: BOUNDED WORKER POOL
// =============================================================================
//
// Grounded on the orchestrator's `guardian.rs` `NodeGuardian`: a
// `Semaphore` bounding in-flight work, permits acquired before spawning
// and held for the task's lifetime. Used by both the Process stage
// (§4.4) and the Match stage (§4.5) to bound concurrent LLM/vector
// calls without a custom thread pool.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

pub struct WorkerPool {
    limiter: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self {
            limiter: Arc::new(Semaphore::new(size.max(1))),
        }
    }

    /// Runs `items` through `worker`, at most `size` concurrently, and
    /// returns results in the original order. A single item's failure
    /// does not cancel the others — callers classify/handle per-item
    /// errors in the returned `Result`.
    pub async fn run_all<T, F, Fut, R>(&self, items: Vec<T>, worker: F) -> Vec<anyhow::Result<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send,
    {
        let worker = Arc::new(worker);
        let mut handles: Vec<JoinHandle<anyhow::Result<R>>> = Vec::with_capacity(items.len());

        for item in items {
            let permit = self.limiter.clone();
            let worker = worker.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore closed");
                worker(item).await
            }));
        }

        let mut out = Vec::with_capacity(handles.len());
        for h in handles {
            match h.await {
                Ok(r) => out.push(r),
                Err(e) => out.push(Err(anyhow::anyhow!("worker task panicked: {e}"))),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn bounds_concurrency_to_pool_size() {
        let pool = WorkerPool::new(2);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let items: Vec<usize> = (0..10).collect();
        let in_flight2 = in_flight.clone();
        let max_seen2 = max_seen.clone();

        let results = pool
            .run_all(items, move |i| {
                let in_flight = in_flight2.clone();
                let max_seen = max_seen2.clone();
                async move {
                    let cur = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(cur, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(i * 2)
                }
            })
            .await;

        assert_eq!(results.len(), 10);
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
        assert_eq!(results[3].as_ref().unwrap(), &6);
    }
}
