//! Usage records: references from domain entities to stored files.

use crate::{MediaId, PageRequest, UploaderId, UsageId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reference from a domain entity (post, profile, ...) to a [`MediaFile`](crate::MediaFile).
///
/// `usage_type` is opaque to the engine; callers pick values such as
/// `"post_cover"` or `"user_avatar"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaUsage {
    /// Registry-assigned identifier
    pub id: UsageId,
    /// Referenced file
    pub media_id: MediaId,
    /// Caller-defined kind of reference
    pub usage_type: String,
    /// Referencing entity, when there is one
    pub target_id: Option<i64>,
    /// Who created the reference
    pub uploader_id: UploaderId,
    /// When the reference was recorded
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a [`MediaUsage`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewMediaUsage {
    /// Referenced file
    pub media_id: MediaId,
    /// Caller-defined kind of reference
    pub usage_type: String,
    /// Referencing entity
    pub target_id: Option<i64>,
    /// Who created the reference
    pub uploader_id: UploaderId,
}

impl NewMediaUsage {
    /// Create a usage payload.
    pub fn new(
        media_id: MediaId,
        usage_type: impl Into<String>,
        target_id: Option<i64>,
        uploader_id: UploaderId,
    ) -> Self {
        Self {
            media_id,
            usage_type: usage_type.into(),
            target_id,
            uploader_id,
        }
    }
}

/// Filter for paginated usage listings, newest first.
///
/// Covers an uploader's usages, all usages of one type, and the usage
/// history of one file; criteria combine.
///
/// # Examples
///
/// ```
/// use vellum_core::{PageRequest, UsageFilter};
///
/// let history = UsageFilter::for_media(42).with_page(PageRequest::new(2, 10));
/// assert_eq!(history.media_id, Some(42));
/// assert_eq!(history.page.offset(), 10);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageFilter {
    /// Referenced file
    pub media_id: Option<MediaId>,
    /// Kind of reference
    pub usage_type: Option<String>,
    /// Who created the reference
    pub uploader_id: Option<UploaderId>,
    /// Page selection
    pub page: PageRequest,
}

impl UsageFilter {
    /// Usage history of one file.
    pub fn for_media(media_id: MediaId) -> Self {
        Self {
            media_id: Some(media_id),
            ..Default::default()
        }
    }

    /// Usages of one type.
    pub fn for_type(usage_type: impl Into<String>) -> Self {
        Self {
            usage_type: Some(usage_type.into()),
            ..Default::default()
        }
    }

    /// Usages created by one uploader.
    pub fn for_uploader(uploader_id: UploaderId) -> Self {
        Self {
            uploader_id: Some(uploader_id),
            ..Default::default()
        }
    }

    /// Select a page.
    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    /// Whether a usage satisfies every criterion.
    pub fn matches(&self, usage: &MediaUsage) -> bool {
        self.media_id.is_none_or(|id| id == usage.media_id)
            && self
                .usage_type
                .as_deref()
                .is_none_or(|t| t == usage.usage_type)
            && self.uploader_id.is_none_or(|id| id == usage.uploader_id)
    }
}
