//! The media engine: ingestion, transforms and lifecycle over one registry.

mod batch;
mod ingest;
mod lifecycle;
mod transform;

pub use batch::{BatchFailure, BatchOutcome, MAX_BATCH_SIZE};
pub use ingest::{IngestOutcome, Upload};
pub use lifecycle::Deletion;
pub use transform::{ImageInfo, TransformOutcome};

use std::future::Future;
use std::sync::Arc;
use vellum_core::{
    Fingerprint, MediaConfig, MediaFile, MediaFilter, MediaId, MediaPatch, MediaStats,
    MediaUsage, NewMediaUsage, Page, PageRequest, UploaderId, UsageFilter, UsageId, UsageStats,
    WorkerPool,
};
use vellum_error::{MediaError, MediaErrorKind, VellumResult};
use vellum_imaging::{BitmapTextRenderer, WatermarkRenderer};
use vellum_registry::{InMemoryRegistry, LockTable, MediaRegistry, UsageTracker};
use vellum_storage::{FileSystemStorage, StorageLayout};

/// Media engine.
///
/// Owns the storage root and talks to one [`MediaRegistry`] and
/// [`UsageTracker`], which are usually the same backend. Hashing, header
/// reads and disk writes run on an I/O pool sized by `io_workers`; decoding and
/// encoding run on a separate transform pool sized by `transform_workers`.
///
/// Ingestion, transforms and hard deletion serialize per fingerprint, so
/// bytes are never removed from under a record registered at the same path.
/// Where both are needed the fingerprint lock is taken before the media lock.
///
/// Cloning is cheap and clones share pools, locks, storage and registry.
///
/// # Example
///
/// ```rust,no_run
/// use vellum::{MediaConfig, MediaEngine, UploadMetadata};
///
/// # async fn example() -> vellum::VellumResult<()> {
/// let engine = MediaEngine::in_memory(MediaConfig::load()?)?;
///
/// let first = engine
///     .ingest(b"hello", "hello.txt", 7, UploadMetadata::default())
///     .await?;
/// let second = engine
///     .ingest(b"hello", "again.txt", 7, UploadMetadata::default())
///     .await?;
///
/// assert!(!first.existed && second.existed);
/// assert_eq!(first.media.id, second.media.id);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MediaEngine {
    config: MediaConfig,
    layout: StorageLayout,
    storage: FileSystemStorage,
    registry: Arc<dyn MediaRegistry>,
    usages: Arc<dyn UsageTracker>,
    io: WorkerPool,
    transforms: WorkerPool,
    fingerprints: LockTable<Fingerprint>,
    watermark: Arc<dyn WatermarkRenderer>,
}

impl std::fmt::Debug for MediaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaEngine")
            .field("storage_root", &self.layout.root())
            .field("io_workers", &self.io.size())
            .field("transform_workers", &self.transforms.size())
            .field("watermark", &self.watermark)
            .finish_non_exhaustive()
    }
}

impl MediaEngine {
    /// Create an engine over the given registry backend.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` does not validate, or
    /// `WriteFailure` if the storage root cannot be created.
    #[tracing::instrument(skip_all, fields(root = %config.storage_root().display()))]
    pub fn new(
        config: MediaConfig,
        registry: Arc<dyn MediaRegistry>,
        usages: Arc<dyn UsageTracker>,
    ) -> VellumResult<Self> {
        config.validate()?;

        let storage = FileSystemStorage::new(config.storage_root().clone(), *config.io_workers())?;
        let io = WorkerPool::new("ingest-io", *config.io_workers());
        let transforms = WorkerPool::new("transforms", config.effective_transform_workers());

        tracing::info!(
            io_workers = io.size(),
            transform_workers = transforms.size(),
            max_file_size = *config.max_file_size_bytes(),
            "Media engine ready"
        );

        Ok(Self {
            layout: StorageLayout::from_config(&config),
            storage,
            registry,
            usages,
            io,
            transforms,
            fingerprints: LockTable::new(),
            watermark: Arc::new(BitmapTextRenderer::new()),
            config,
        })
    }

    /// Create an engine backed by a fresh [`InMemoryRegistry`].
    pub fn in_memory(config: MediaConfig) -> VellumResult<Self> {
        let store = Arc::new(InMemoryRegistry::new());
        Self::new(config, store.clone(), store)
    }

    /// Replace the watermark renderer (the built-in bitmap font by default).
    pub fn with_watermark_renderer(mut self, renderer: Arc<dyn WatermarkRenderer>) -> Self {
        self.watermark = renderer;
        self
    }

    /// Engine configuration.
    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    /// Storage layout in use.
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Byte store in use.
    pub fn storage(&self) -> &FileSystemStorage {
        &self.storage
    }

    /// Run `operation` under the configured per-call deadline, if any.
    async fn deadline<T>(
        &self,
        name: &'static str,
        operation: impl Future<Output = VellumResult<T>>,
    ) -> VellumResult<T> {
        let Some(limit) = self.config.operation_timeout() else {
            return operation.await;
        };
        match tokio::time::timeout(limit, operation).await {
            Ok(result) => result,
            Err(_) => {
                let millis = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(operation = name, timeout_ms = millis, "Operation timed out");
                Err(MediaError::new(MediaErrorKind::Timeout(millis)).into())
            }
        }
    }

    // Reads and metadata

    /// Fetch a record by ID, whatever its status.
    ///
    /// Visibility is the caller's call; see [`MediaFile::is_visible_to`].
    pub async fn get(&self, id: MediaId) -> VellumResult<MediaFile> {
        self.registry.get_by_id(id).await
    }

    /// Change alt text, caption or the public flag.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&self, id: MediaId, patch: &MediaPatch) -> VellumResult<MediaFile> {
        let media = self.registry.update(id, patch).await?;
        tracing::info!("Updated media metadata");
        Ok(media)
    }

    /// Filtered, paginated listing, newest first.
    pub async fn list(&self, filter: &MediaFilter) -> VellumResult<Page<MediaFile>> {
        self.registry.list(filter).await
    }

    /// Keyword search over filename, alt text and caption of active files.
    pub async fn search(&self, keyword: &str, page: PageRequest) -> VellumResult<Page<MediaFile>> {
        self.registry.search(keyword, page).await
    }

    /// Counts and byte totals of active files, optionally for one uploader.
    pub async fn stats(&self, uploader_id: Option<UploaderId>) -> VellumResult<MediaStats> {
        self.registry.stats(uploader_id).await
    }

    /// Newest active public files.
    pub async fn list_recent(&self, limit: usize) -> VellumResult<Vec<MediaFile>> {
        self.registry.list_recent(limit).await
    }

    // Usage administration

    /// Record that an entity references a file.
    #[tracing::instrument(skip(self, usage), fields(media_id = usage.media_id, usage_type = %usage.usage_type))]
    pub async fn attach_usage(&self, usage: NewMediaUsage) -> VellumResult<MediaUsage> {
        self.usages.create_usage(usage).await
    }

    /// References to one file.
    pub async fn usages_for_media(&self, media_id: MediaId) -> VellumResult<Vec<MediaUsage>> {
        self.usages.list_by_media(media_id).await
    }

    /// References held by one entity.
    pub async fn usages_for_target(
        &self,
        usage_type: &str,
        target_id: Option<i64>,
    ) -> VellumResult<Vec<MediaUsage>> {
        self.usages.list_by_target(usage_type, target_id).await
    }

    /// Paginated usages, newest first: an uploader's, one type's, or one
    /// file's history.
    pub async fn list_usages(&self, filter: &UsageFilter) -> VellumResult<Page<MediaUsage>> {
        self.usages.list_usages(filter).await
    }

    /// Drop one reference. Returns false if it did not exist.
    ///
    /// Once the last reference is gone, [`MediaEngine::delete`] removes the
    /// file for good.
    #[tracing::instrument(skip(self))]
    pub async fn detach_usage(&self, usage_id: UsageId) -> VellumResult<bool> {
        let removed = self.usages.delete_usage(usage_id).await?;
        if removed {
            tracing::info!("Detached usage");
        }
        Ok(removed)
    }

    /// Drop every reference held by one entity, e.g. when a post is deleted.
    #[tracing::instrument(skip(self))]
    pub async fn detach_usages_for_target(
        &self,
        usage_type: &str,
        target_id: Option<i64>,
    ) -> VellumResult<u64> {
        let removed = self.usages.delete_by_target(usage_type, target_id).await?;
        tracing::info!(removed, "Detached usages");
        Ok(removed)
    }

    /// Drop every reference to one file.
    #[tracing::instrument(skip(self))]
    pub async fn detach_usages_for_media(&self, media_id: MediaId) -> VellumResult<u64> {
        let removed = self.usages.delete_by_media(media_id).await?;
        tracing::info!(removed, "Detached usages");
        Ok(removed)
    }

    /// Usage totals, breakdown by type, most referenced files, latest usages.
    pub async fn usage_stats(&self) -> VellumResult<UsageStats> {
        self.usages.usage_stats().await
    }
}
