//! File record persistence.

use async_trait::async_trait;
use vellum_core::{
    Fingerprint, MediaFile, MediaFilter, MediaId, MediaPatch, MediaStats, NewMediaFile, Page,
    PageRequest, UploaderId,
};
use vellum_error::VellumResult;

/// Persistence boundary for [`MediaFile`] records.
///
/// Implementations are the single source of truth for fingerprint uniqueness:
/// two concurrent `create` calls with the same fingerprint must leave exactly
/// one row behind, the other call failing with `DuplicateFingerprint`.
#[async_trait]
pub trait MediaRegistry: Send + Sync {
    /// Insert a new record with status `active`.
    ///
    /// # Errors
    ///
    /// `DuplicateFingerprint` if a record with the same fingerprint exists.
    async fn create(&self, new: NewMediaFile) -> VellumResult<MediaFile>;

    /// Fetch a record by ID, whatever its status.
    ///
    /// # Errors
    ///
    /// `NotFound` if no such record exists.
    async fn get_by_id(&self, id: MediaId) -> VellumResult<MediaFile>;

    /// Fetch a record by fingerprint. A miss is `Ok(None)`.
    async fn get_by_fingerprint(&self, fingerprint: &Fingerprint)
    -> VellumResult<Option<MediaFile>>;

    /// Apply a metadata patch and return the updated record.
    async fn update(&self, id: MediaId, patch: &MediaPatch) -> VellumResult<MediaFile>;

    /// Flip status to `deleted`. Bytes and usages are untouched.
    async fn soft_delete(&self, id: MediaId) -> VellumResult<MediaFile>;

    /// Flip status back to `active`.
    async fn restore(&self, id: MediaId) -> VellumResult<MediaFile>;

    /// Remove the row permanently.
    ///
    /// The caller is responsible for the bytes. Backends that enforce
    /// referential integrity fail with `InvalidState` while usages remain.
    async fn hard_delete(&self, id: MediaId) -> VellumResult<()>;

    /// Filtered, paginated listing, newest first.
    async fn list(&self, filter: &MediaFilter) -> VellumResult<Page<MediaFile>>;

    /// Keyword search over filename, alt text and caption of active records.
    async fn search(&self, keyword: &str, page: PageRequest) -> VellumResult<Page<MediaFile>>;

    /// Count and total size of active records by category, optionally for one uploader.
    async fn stats(&self, uploader_id: Option<UploaderId>) -> VellumResult<MediaStats>;

    /// Most recently created active public records.
    async fn list_recent(&self, limit: usize) -> VellumResult<Vec<MediaFile>>;
}
