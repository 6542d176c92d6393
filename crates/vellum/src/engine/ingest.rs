//! Ingestion pipeline.

use super::MediaEngine;
use super::batch::{BatchOutcome, check_batch_size, run_batch};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use vellum_core::{
    Dimensions, Fingerprint, MediaCategory, MediaFile, MediaUsage, NewMediaFile, NewMediaUsage,
    UploadMetadata, UploaderId, UsageTarget,
};
use vellum_error::{MediaError, MediaErrorKind, VellumResult};
use vellum_imaging::read_dimensions;
use vellum_registry::{KeyLock, MediaRegistry};
use vellum_storage::{FileSystemStorage, StagedFile, classify, ensure_allowed, fingerprint};

/// Result of an ingest call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    /// The stored record, new or pre-existing
    pub media: MediaFile,
    /// True when identical content was already stored and no bytes were written
    pub existed: bool,
    /// Usage recorded for this upload, when one was requested and succeeded
    pub usage: Option<MediaUsage>,
}

/// One file of a batch upload.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Original filename
    pub filename: String,
    /// Raw content
    pub content: Vec<u8>,
    /// Descriptive metadata
    pub metadata: UploadMetadata,
}

impl Upload {
    /// Upload with default metadata.
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            metadata: UploadMetadata::default(),
        }
    }

    /// Set the metadata.
    pub fn with_metadata(mut self, metadata: UploadMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Everything needed to register bytes that are not stored yet.
pub(super) struct Pending {
    pub content: Arc<[u8]>,
    pub fingerprint: Fingerprint,
    pub filename: String,
    pub mime_type: String,
    pub category: MediaCategory,
    pub dimensions: Option<Dimensions>,
    pub alt: String,
    pub caption: String,
    pub is_public: bool,
    pub uploader_id: Option<UploaderId>,
}

impl MediaEngine {
    /// Store `content` uploaded as `filename`, or find the identical content
    /// already stored.
    ///
    /// Equal bytes are stored once: a repeat upload returns the existing
    /// record with `existed` set and writes nothing. If `metadata` names a
    /// usage, it is recorded against whichever record is returned; failing to
    /// record it is logged, not returned.
    ///
    /// # Errors
    ///
    /// `FileTooLarge`, `UnsupportedType`, `WriteFailure`, `Timeout`, or a
    /// registry error. No bytes stay on disk when an error is returned.
    #[tracing::instrument(skip(self, content, metadata), fields(size = content.len()))]
    pub async fn ingest(
        &self,
        content: &[u8],
        filename: &str,
        uploader_id: UploaderId,
        metadata: UploadMetadata,
    ) -> VellumResult<IngestOutcome> {
        self.deadline("ingest", self.ingest_inner(content, filename, uploader_id, metadata))
            .await
    }

    /// Ingest up to [`MAX_BATCH_SIZE`](super::MAX_BATCH_SIZE) files concurrently.
    ///
    /// # Errors
    ///
    /// `InvalidBatch` for an empty or oversized batch; the first item's error
    /// when every item fails.
    #[tracing::instrument(skip(self, uploads), fields(count = uploads.len()))]
    pub async fn ingest_batch(
        &self,
        uploads: Vec<Upload>,
        uploader_id: UploaderId,
    ) -> VellumResult<BatchOutcome<IngestOutcome>> {
        check_batch_size(uploads.len())?;
        let jobs = uploads
            .into_iter()
            .map(|upload| {
                let label = upload.filename.clone();
                let job = async move {
                    self.ingest(&upload.content, &upload.filename, uploader_id, upload.metadata)
                        .await
                };
                (label, job)
            })
            .collect();
        run_batch(jobs).await
    }

    async fn ingest_inner(
        &self,
        content: &[u8],
        filename: &str,
        uploader_id: UploaderId,
        metadata: UploadMetadata,
    ) -> VellumResult<IngestOutcome> {
        let size = content.len() as u64;
        let limit = *self.config.max_file_size_bytes();
        if size > limit {
            return Err(MediaError::new(MediaErrorKind::FileTooLarge { size, limit }).into());
        }

        let kind = classify(filename, content);
        ensure_allowed(&kind, &self.config)?;

        let content: Arc<[u8]> = Arc::from(content);
        let is_image = kind.category == MediaCategory::Image;
        let (fingerprint, dimensions) = {
            let content = content.clone();
            self.io
                .run(move || {
                    let dimensions = if is_image { read_dimensions(&content) } else { None };
                    Ok((fingerprint(&content), dimensions))
                })
                .await?
        };
        if is_image && dimensions.is_none() {
            tracing::warn!(filename, mime = %kind.mime_type, "Could not read image dimensions");
        }

        let usage = metadata.usage().clone();

        // Held until the usage is recorded, so a concurrent hard delete of
        // this content cannot remove what is returned here.
        let held = Arc::new(self.fingerprints.lock(fingerprint.clone()).await);

        if let Some(existing) = self.registry.get_by_fingerprint(&fingerprint).await? {
            tracing::debug!(id = existing.id, %fingerprint, "Content already stored");
            let usage = self.record_usage(&existing, usage, uploader_id).await;
            return Ok(IngestOutcome {
                media: existing,
                existed: true,
                usage,
            });
        }

        let (media, existed) = self
            .store(
                Pending {
                    content,
                    fingerprint,
                    filename: filename.to_string(),
                    mime_type: kind.mime_type,
                    category: kind.category,
                    dimensions,
                    alt: metadata.alt().clone(),
                    caption: metadata.caption().clone(),
                    is_public: *metadata.is_public(),
                    uploader_id: Some(uploader_id),
                },
                Arc::clone(&held),
            )
            .await?;

        let usage = self.record_usage(&media, usage, uploader_id).await;
        drop(held);
        Ok(IngestOutcome {
            media,
            existed,
            usage,
        })
    }

    /// Best-effort usage insert.
    async fn record_usage(
        &self,
        media: &MediaFile,
        target: Option<UsageTarget>,
        uploader_id: UploaderId,
    ) -> Option<MediaUsage> {
        let target = target?;
        let usage = NewMediaUsage::new(media.id, target.usage_type, target.target_id, uploader_id);
        match self.usages.create_usage(usage).await {
            Ok(usage) => Some(usage),
            Err(error) => {
                tracing::warn!(media_id = media.id, %error, "Failed to record usage");
                None
            }
        }
    }

    /// Write pending bytes and register them.
    ///
    /// `held` must be the lock on `pending.fingerprint`; registration keeps it
    /// until the bytes are committed or discarded, even if this call is
    /// dropped. Returns the record and whether it already existed, which
    /// happens when a concurrent call registered the same fingerprint first.
    pub(super) async fn store(
        &self,
        pending: Pending,
        held: Arc<KeyLock<Fingerprint>>,
    ) -> VellumResult<(MediaFile, bool)> {
        let location = self.layout.locate(
            &pending.filename,
            &pending.fingerprint,
            Utc::now().date_naive(),
        );
        let staged = self.storage.stage(&location.path, &pending.content).await?;

        let new = NewMediaFile {
            fingerprint: pending.fingerprint,
            filename: pending.filename,
            mime_type: pending.mime_type,
            category: pending.category,
            size_bytes: pending.content.len() as u64,
            dimensions: pending.dimensions,
            duration_secs: None,
            storage_path: location.path,
            url: location.url,
            alt: pending.alt,
            caption: pending.caption,
            is_public: pending.is_public,
            uploader_id: pending.uploader_id,
        };

        // Insert and commit run to completion even if this call is dropped,
        // so a row never outlives its bytes.
        tokio::spawn(register(
            self.registry.clone(),
            self.storage.clone(),
            staged,
            new,
            pending.content,
            held,
        ))
        .await
        .map_err(|e| {
            MediaError::new(MediaErrorKind::WorkerPool(format!("registration failed: {}", e)))
        })?
    }
}

async fn register(
    registry: Arc<dyn MediaRegistry>,
    storage: FileSystemStorage,
    staged: StagedFile,
    new: NewMediaFile,
    content: Arc<[u8]>,
    _held: Arc<KeyLock<Fingerprint>>,
) -> VellumResult<(MediaFile, bool)> {
    let fingerprint = new.fingerprint.clone();

    match registry.create(new).await {
        Ok(media) => {
            let wrote = staged.is_owned();
            staged.commit();
            if !wrote && !storage.exists(&media.storage_path).await {
                // The writer we shared the path with gave up and removed it.
                tracing::warn!(path = %media.storage_path.display(), "Shared bytes vanished, rewriting");
                match storage.stage(&media.storage_path, &content).await {
                    Ok(rewritten) => rewritten.commit(),
                    Err(error) => tracing::error!(id = media.id, %error, "Stored record has no bytes"),
                }
            }
            tracing::info!(
                id = media.id,
                %fingerprint,
                size = media.size_bytes,
                path = %media.storage_path.display(),
                "Stored media"
            );
            Ok((media, false))
        }
        Err(error) if error.is_duplicate_fingerprint() => {
            tracing::debug!(%fingerprint, "Lost insert race, using existing record");
            let existing = registry
                .get_by_fingerprint(&fingerprint)
                .await?
                .ok_or_else(|| {
                    MediaError::new(MediaErrorKind::NotFound(format!(
                        "fingerprint {}",
                        fingerprint
                    )))
                })?;
            if existing.storage_path == staged.path() {
                staged.commit();
            }
            Ok((existing, true))
        }
        Err(error) => {
            tracing::warn!(%fingerprint, %error, "Registration failed, discarding bytes");
            Err(error)
        }
    }
}
