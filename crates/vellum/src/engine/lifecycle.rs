//! Deletion and restoration.
//!
//! ```text
//! Active --delete, usages > 0--> Deleted --purge--> Removed
//!   |  ^                           |
//!   |  +---------restore-----------+
//!   +------delete, no usages-----------------------> Removed
//! ```
//!
//! Every transition that depends on the usage count holds the media's lock
//! from [`UsageTracker::lock_media`](vellum_registry::UsageTracker::lock_media)
//! across the count and the action. Transitions that remove bytes also hold
//! the engine's fingerprint lock, taken first, so an upload of the same
//! content waits until the old file is gone.

use super::MediaEngine;
use serde::Serialize;
use vellum_core::{MediaFile, MediaId, MediaStatus};
use vellum_error::{MediaError, MediaErrorKind, VellumResult};

/// What [`MediaEngine::delete`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "deletion", content = "media", rename_all = "lowercase")]
pub enum Deletion {
    /// Still referenced: hidden, bytes kept
    Soft(MediaFile),
    /// Unreferenced: row and bytes removed
    Hard(MediaFile),
}

impl Deletion {
    /// The record as it was when the deletion finished.
    pub fn media(&self) -> &MediaFile {
        match self {
            Self::Soft(media) | Self::Hard(media) => media,
        }
    }

    /// Whether the row and bytes are gone.
    pub fn is_hard(&self) -> bool {
        matches!(self, Self::Hard(_))
    }
}

fn invalid_state(message: String) -> MediaError {
    MediaError::new(MediaErrorKind::InvalidState(message))
}

impl MediaEngine {
    /// Delete a file: soft while any usage references it, hard otherwise.
    ///
    /// A hard delete removes the row before the bytes, so a failed row
    /// delete never leaves a live record without its file. Both steps run
    /// under the fingerprint lock, and bytes still named by a live record
    /// (the same content uploaded again) are left in place.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown IDs, or a registry error.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, media_id: MediaId) -> VellumResult<Deletion> {
        let fingerprint = self.registry.get_by_id(media_id).await?.fingerprint;
        let _content = self.fingerprints.lock(fingerprint).await;
        let _lock = self.usages.lock_media(media_id).await;
        let media = self.registry.get_by_id(media_id).await?;
        let usages = self.usages.count_by_media(media_id).await?;

        if usages > 0 {
            let media = self.registry.soft_delete(media_id).await?;
            tracing::info!(usages, "Soft-deleted referenced media");
            return Ok(Deletion::Soft(media));
        }

        match self.registry.hard_delete(media_id).await {
            Ok(()) => {
                self.remove_bytes(&media).await?;
                tracing::info!("Hard-deleted media");
                Ok(Deletion::Hard(media))
            }
            Err(error) if matches!(error.media_kind(), Some(MediaErrorKind::InvalidState(_))) => {
                // Referenced by a writer outside this process since we counted.
                tracing::info!(%error, "Media gained a reference, soft-deleting instead");
                let media = self.registry.soft_delete(media_id).await?;
                Ok(Deletion::Soft(media))
            }
            Err(error) => Err(error),
        }
    }

    /// Bring a soft-deleted file back.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown IDs; `InvalidState` if the file is active or
    /// its bytes are gone.
    #[tracing::instrument(skip(self))]
    pub async fn restore(&self, media_id: MediaId) -> VellumResult<MediaFile> {
        let _lock = self.usages.lock_media(media_id).await;
        let media = self.registry.get_by_id(media_id).await?;
        if media.status != MediaStatus::Deleted {
            return Err(invalid_state(format!("media {} is not deleted", media_id)).into());
        }
        if !self.storage.exists(&media.storage_path).await {
            return Err(invalid_state(format!(
                "bytes of media {} are no longer on disk",
                media_id
            ))
            .into());
        }

        let media = self.registry.restore(media_id).await?;
        tracing::info!("Restored media");
        Ok(media)
    }

    /// Permanently remove a soft-deleted, unreferenced file.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown IDs; `InvalidState` if the file is active or
    /// still referenced.
    #[tracing::instrument(skip(self))]
    pub async fn purge(&self, media_id: MediaId) -> VellumResult<MediaFile> {
        let fingerprint = self.registry.get_by_id(media_id).await?.fingerprint;
        let _content = self.fingerprints.lock(fingerprint).await;
        let _lock = self.usages.lock_media(media_id).await;
        let media = self.registry.get_by_id(media_id).await?;
        if media.status != MediaStatus::Deleted {
            return Err(invalid_state(format!(
                "media {} must be deleted before it is purged",
                media_id
            ))
            .into());
        }
        let usages = self.usages.count_by_media(media_id).await?;
        if usages > 0 {
            return Err(invalid_state(format!(
                "media {} is still referenced by {} usages",
                media_id, usages
            ))
            .into());
        }

        self.registry.hard_delete(media_id).await?;
        self.remove_bytes(&media).await?;
        tracing::info!("Purged media");
        Ok(media)
    }

    /// Remove bytes after their row is gone. Caller holds the fingerprint lock.
    async fn remove_bytes(&self, media: &MediaFile) -> VellumResult<()> {
        if let Some(live) = self.registry.get_by_fingerprint(&media.fingerprint).await?
            && live.storage_path == media.storage_path
        {
            tracing::info!(id = live.id, "Bytes are shared with a newer record, keeping them");
            return Ok(());
        }
        match self.storage.remove(&media.storage_path).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(path = %media.storage_path.display(), "Bytes were already missing")
            }
            Err(error) => tracing::error!(%error, "Failed to remove bytes of deleted media"),
        }
        Ok(())
    }
}
