//! Bounded pool for blocking work.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::trace;
use vellum_error::{MediaError, MediaErrorKind, VellumResult};

/// Runs blocking closures on tokio's blocking threads, at most `size` at a time.
///
/// Separate pools keep CPU-heavy transforms from starving ingestion and the
/// other way round. Dropping the returned future stops waiting for the job but
/// does not abort it; jobs must therefore not leave artifacts behind on their own.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: &'static str,
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Create a pool that runs at most `size` jobs concurrently (minimum 1).
    pub fn new(name: &'static str, size: usize) -> Self {
        let size = size.max(1);
        Self {
            name,
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Pool name, used in logs and errors.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Maximum number of concurrent jobs.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of jobs that could start right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `job` once a slot is free and return its result.
    ///
    /// # Errors
    ///
    /// Returns the job's own error, or `WorkerPool` if the job panicked.
    pub async fn run<F, T>(&self, job: F) -> VellumResult<T>
    where
        F: FnOnce() -> VellumResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self.permits.clone().acquire_owned().await.map_err(|e| {
            MediaError::new(MediaErrorKind::WorkerPool(format!("{}: {}", self.name, e)))
        })?;
        trace!(pool = self.name, available = self.available(), "Dispatching blocking job");

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| {
            MediaError::new(MediaErrorKind::WorkerPool(format!(
                "{} job failed: {}",
                self.name, e
            )))
        })?
    }
}
