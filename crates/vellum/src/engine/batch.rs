//! Partial-success batches.

use futures::future::join_all;
use std::future::Future;
use vellum_error::{MediaError, MediaErrorKind, VellumError, VellumResult};

/// Most items accepted in one batch call.
pub const MAX_BATCH_SIZE: usize = 10;

/// One failed item of a batch.
#[derive(Debug)]
pub struct BatchFailure {
    /// Position of the item in the request
    pub index: usize,
    /// Filename or media ID of the item
    pub item: String,
    /// Why it failed
    pub error: VellumError,
}

/// Result of a batch call in which at least one item succeeded.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    /// Successful items, in request order
    pub succeeded: Vec<T>,
    /// Failed items, in request order
    pub failed: Vec<BatchFailure>,
}

impl<T> BatchOutcome<T> {
    /// Whether every item succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub(super) fn check_batch_size(len: usize) -> VellumResult<()> {
    if len == 0 {
        return Err(MediaError::new(MediaErrorKind::InvalidBatch("batch is empty".to_string())).into());
    }
    if len > MAX_BATCH_SIZE {
        return Err(MediaError::new(MediaErrorKind::InvalidBatch(format!(
            "{} items exceed the limit of {}",
            len, MAX_BATCH_SIZE
        )))
        .into());
    }
    Ok(())
}

/// Run labelled jobs concurrently and split the results.
///
/// When nothing succeeds the first failure is returned as the error.
pub(super) async fn run_batch<T, F>(jobs: Vec<(String, F)>) -> VellumResult<BatchOutcome<T>>
where
    F: Future<Output = VellumResult<T>>,
{
    let (labels, futures): (Vec<_>, Vec<_>) = jobs.into_iter().unzip();
    let results = join_all(futures).await;

    let mut outcome = BatchOutcome {
        succeeded: Vec::new(),
        failed: Vec::new(),
    };
    for (index, (item, result)) in labels.into_iter().zip(results).enumerate() {
        match result {
            Ok(value) => outcome.succeeded.push(value),
            Err(error) => {
                tracing::warn!(index, %item, %error, "Batch item failed");
                outcome.failed.push(BatchFailure { index, item, error });
            }
        }
    }

    if outcome.succeeded.is_empty() && !outcome.failed.is_empty() {
        return Err(outcome.failed.remove(0).error);
    }
    tracing::debug!(
        succeeded = outcome.succeeded.len(),
        failed = outcome.failed.len(),
        "Batch finished"
    );
    Ok(outcome)
}
