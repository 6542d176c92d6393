//! Transform engine: derived images as new records.

use super::MediaEngine;
use super::batch::{BatchOutcome, check_batch_size, run_batch};
use super::ingest::Pending;
use serde::Serialize;
use std::sync::Arc;
use vellum_core::{MediaCategory, MediaFile, MediaId};
use vellum_error::{MediaError, MediaErrorKind, VellumResult};
use vellum_imaging::{
    OutputFormat, TransformRequest, WatermarkStatus, apply, plan_optimization, read_header,
};
use vellum_storage::fingerprint;

/// Result of a transform call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformOutcome {
    /// The derived record (or an existing record with identical bytes)
    pub media: MediaFile,
    /// Whether a requested watermark was actually drawn
    pub watermark: WatermarkStatus,
}

/// Header facts about a stored image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    /// Record ID
    pub id: MediaId,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Decoder colour type, e.g. `Rgba8`
    pub color_type: String,
    /// Stored size in bytes
    pub size_bytes: u64,
    /// MIME type
    pub mime_type: String,
    /// Public URL
    pub url: String,
}

/// `photo.final.png` + resize + webp -> `photo.final_resize.webp`
fn derived_filename(source: &str, operation: &str, format: OutputFormat) -> String {
    let stem = match source.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => source,
    };
    format!("{}_{}.{}", stem, operation, format.extension())
}

fn derived_caption(source: &str, operation: &str) -> String {
    if source.is_empty() {
        format!("({})", operation)
    } else {
        format!("{} ({})", source, operation)
    }
}

fn ensure_transformable(media: &MediaFile) -> VellumResult<()> {
    if !media.is_image() {
        return Err(MediaError::new(MediaErrorKind::UnsupportedType(media.mime_type.clone())).into());
    }
    if !media.is_active() {
        return Err(MediaError::new(MediaErrorKind::InvalidState(format!(
            "media {} is deleted",
            media.id
        )))
        .into());
    }
    Ok(())
}

impl MediaEngine {
    /// Derive a new image from stored image `media_id`.
    ///
    /// The source record and its bytes are never modified. The result is a
    /// new record that inherits alt text, public flag and uploader, with the
    /// operation appended to filename and caption. Check
    /// [`TransformOutcome::watermark`] for watermark requests; a renderer
    /// that cannot draw leaves the pixels unchanged and says so there.
    ///
    /// # Errors
    ///
    /// `NotFound`, `UnsupportedType` for non-images, `InvalidState` for
    /// deleted sources, `InvalidTransformParameters`, `ReadFailure` when the
    /// stored bytes are missing or corrupt, `DecodeFailure`, `EncodeFailure`,
    /// `WriteFailure`, `Timeout`.
    #[tracing::instrument(skip(self, request), fields(op = request.op.name()))]
    pub async fn transform(
        &self,
        media_id: MediaId,
        request: &TransformRequest,
    ) -> VellumResult<TransformOutcome> {
        self.deadline("transform", async {
            let source = self.registry.get_by_id(media_id).await?;
            self.transform_media(source, request.clone()).await
        })
        .await
    }

    /// Apply one request to up to [`MAX_BATCH_SIZE`](super::MAX_BATCH_SIZE) images concurrently.
    ///
    /// # Errors
    ///
    /// `InvalidBatch` for an empty or oversized batch; the first item's error
    /// when every item fails.
    #[tracing::instrument(skip(self, request), fields(count = media_ids.len(), op = request.op.name()))]
    pub async fn transform_batch(
        &self,
        media_ids: &[MediaId],
        request: &TransformRequest,
    ) -> VellumResult<BatchOutcome<TransformOutcome>> {
        check_batch_size(media_ids.len())?;
        let jobs = media_ids
            .iter()
            .map(|&id| (format!("media {}", id), self.transform(id, request)))
            .collect();
        run_batch(jobs).await
    }

    /// Compress or shrink an image using size and width heuristics.
    ///
    /// See [`plan_optimization`] for the rules.
    ///
    /// # Errors
    ///
    /// As for [`MediaEngine::transform`].
    #[tracing::instrument(skip(self))]
    pub async fn optimize(&self, media_id: MediaId) -> VellumResult<TransformOutcome> {
        self.deadline("optimize", async {
            let source = self.registry.get_by_id(media_id).await?;
            let plan = plan_optimization(source.size_bytes, source.dimensions);
            tracing::debug!(op = plan.op.name(), quality = plan.quality(), "Planned optimization");
            self.transform_media(source, plan).await
        })
        .await
    }

    /// Read the stored image's header.
    ///
    /// # Errors
    ///
    /// `NotFound`, `UnsupportedType` for non-images, `ReadFailure`,
    /// `DecodeFailure`.
    #[tracing::instrument(skip(self))]
    pub async fn image_info(&self, media_id: MediaId) -> VellumResult<ImageInfo> {
        let media = self.registry.get_by_id(media_id).await?;
        if !media.is_image() {
            return Err(MediaError::new(MediaErrorKind::UnsupportedType(media.mime_type)).into());
        }

        let bytes = self
            .storage
            .read_verified(&media.storage_path, &media.fingerprint)
            .await?;
        let header = self.io.run(move || read_header(&bytes)).await?;

        Ok(ImageInfo {
            id: media.id,
            width: header.dimensions.width,
            height: header.dimensions.height,
            color_type: header.color_type,
            size_bytes: media.size_bytes,
            mime_type: media.mime_type,
            url: media.url,
        })
    }

    async fn transform_media(
        &self,
        source: MediaFile,
        request: TransformRequest,
    ) -> VellumResult<TransformOutcome> {
        ensure_transformable(&source)?;
        request.validate()?;

        let bytes = self
            .storage
            .read_verified(&source.storage_path, &source.fingerprint)
            .await?;

        let operation = request.op.name();
        let source_mime = source.mime_type.clone();
        let renderer = Arc::clone(&self.watermark);
        let (rendered, derived_fingerprint) = self
            .transforms
            .run(move || {
                let rendered = apply(&bytes, &source_mime, &request, renderer.as_ref())?;
                let derived_fingerprint = fingerprint(&rendered.bytes);
                Ok((rendered, derived_fingerprint))
            })
            .await?;

        let held = Arc::new(self.fingerprints.lock(derived_fingerprint.clone()).await);
        let pending = Pending {
            content: Arc::from(rendered.bytes),
            fingerprint: derived_fingerprint,
            filename: derived_filename(&source.filename, operation, rendered.format),
            mime_type: rendered.format.mime_type().to_string(),
            category: MediaCategory::Image,
            dimensions: Some(rendered.dimensions),
            alt: source.alt.clone(),
            caption: derived_caption(&source.caption, operation),
            is_public: source.is_public,
            uploader_id: source.uploader_id,
        };
        let (media, existed) = self.store(pending, held).await?;

        if existed {
            tracing::debug!(id = media.id, "Derived bytes already stored");
        } else {
            tracing::info!(
                source = source.id,
                id = media.id,
                operation,
                format = %rendered.format,
                "Transformed media"
            );
        }

        Ok(TransformOutcome {
            media,
            watermark: rendered.watermark,
        })
    }
}
