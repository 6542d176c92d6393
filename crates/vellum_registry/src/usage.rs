//! Usage tracking.

use crate::MediaLock;
use async_trait::async_trait;
use vellum_core::{MediaId, MediaUsage, NewMediaUsage, Page, UsageFilter, UsageId, UsageStats};
use vellum_error::VellumResult;

/// Records references from domain entities to stored files.
///
/// "Unreferenced" is computed on demand as `count_by_media(id) == 0`. Callers
/// that act on that count hold [`UsageTracker::lock_media`] across the count
/// and the action; `create_usage` takes the same lock, so no usage can slip in
/// between.
#[async_trait]
pub trait UsageTracker: Send + Sync {
    /// Serialize against usage inserts for `media_id` until the lock is dropped.
    async fn lock_media(&self, media_id: MediaId) -> MediaLock;

    /// Record a new reference. Must not be called while holding the media's lock.
    ///
    /// # Errors
    ///
    /// `NotFound` if the referenced media does not exist.
    async fn create_usage(&self, usage: NewMediaUsage) -> VellumResult<MediaUsage>;

    /// Usages of one media file, oldest first.
    async fn list_by_media(&self, media_id: MediaId) -> VellumResult<Vec<MediaUsage>>;

    /// Usages recorded by one entity. `None` matches usages without a target.
    async fn list_by_target(
        &self,
        usage_type: &str,
        target_id: Option<i64>,
    ) -> VellumResult<Vec<MediaUsage>>;

    /// Paginated usages matching `filter`, newest first.
    async fn list_usages(&self, filter: &UsageFilter) -> VellumResult<Page<MediaUsage>>;

    /// Remove one usage. Returns false if no such usage exists.
    ///
    /// Takes the referenced media's lock, like `create_usage`.
    async fn delete_usage(&self, usage_id: UsageId) -> VellumResult<bool>;

    /// Remove every usage of one media file. Returns the number removed.
    async fn delete_by_media(&self, media_id: MediaId) -> VellumResult<u64>;

    /// Remove every usage recorded by one entity. Returns the number removed.
    async fn delete_by_target(&self, usage_type: &str, target_id: Option<i64>)
    -> VellumResult<u64>;

    /// Number of usages of one media file.
    async fn count_by_media(&self, media_id: MediaId) -> VellumResult<u64>;

    /// Totals, breakdown by usage type, most-referenced active files and latest usages.
    async fn usage_stats(&self) -> VellumResult<UsageStats>;
}
