//! Stored media records.

use crate::{Fingerprint, MediaCategory, MediaId, UploaderId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle status of a stored file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum MediaStatus {
    /// Visible in listings, bytes on disk
    #[display("active")]
    Active,
    /// Soft-deleted: hidden from listings, bytes retained
    #[display("deleted")]
    Deleted,
}

impl MediaStatus {
    /// Convert to string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaStatus::Active => "active",
            MediaStatus::Deleted => "deleted",
        }
    }
}

impl std::str::FromStr for MediaStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(MediaStatus::Active),
            "deleted" => Ok(MediaStatus::Deleted),
            _ => Err(format!("Unknown media status: {}", s)),
        }
    }
}

/// Pixel dimensions. Width and height are always known together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Dimensions {
    /// Create dimensions from a width and height.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A stored binary object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    /// Registry-assigned identifier
    pub id: MediaId,
    /// Content hash, unique across every row regardless of status
    pub fingerprint: Fingerprint,
    /// Original filename as uploaded
    pub filename: String,
    /// MIME type (e.g., "image/png")
    pub mime_type: String,
    /// Coarse category derived from the MIME type
    pub category: MediaCategory,
    /// Size of the content in bytes
    pub size_bytes: u64,
    /// Pixel dimensions, when the content is an image that could be read
    pub dimensions: Option<Dimensions>,
    /// Audio/video duration in seconds
    pub duration_secs: Option<u32>,
    /// On-disk location of the bytes
    pub storage_path: PathBuf,
    /// Public URL derived from the storage path
    pub url: String,
    /// Alternative text
    pub alt: String,
    /// Caption
    pub caption: String,
    /// Lifecycle status
    pub status: MediaStatus,
    /// Whether anyone may view the file
    pub is_public: bool,
    /// Who uploaded the file
    pub uploader_id: Option<UploaderId>,
    /// When the row was created
    pub created_at: DateTime<Utc>,
    /// When the row was last modified
    pub updated_at: DateTime<Utc>,
}

impl MediaFile {
    /// Build a record from an insert payload and registry-assigned values.
    pub fn from_new(id: MediaId, new: NewMediaFile, now: DateTime<Utc>) -> Self {
        Self {
            id,
            fingerprint: new.fingerprint,
            filename: new.filename,
            mime_type: new.mime_type,
            category: new.category,
            size_bytes: new.size_bytes,
            dimensions: new.dimensions,
            duration_secs: new.duration_secs,
            storage_path: new.storage_path,
            url: new.url,
            alt: new.alt,
            caption: new.caption,
            status: MediaStatus::Active,
            is_public: new.is_public,
            uploader_id: new.uploader_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// True for still images.
    pub fn is_image(&self) -> bool {
        self.category == MediaCategory::Image
    }

    /// True for video and audio.
    pub fn is_video(&self) -> bool {
        self.category == MediaCategory::Video
    }

    /// True for documents.
    pub fn is_document(&self) -> bool {
        self.category == MediaCategory::Document
    }

    /// True unless soft-deleted.
    pub fn is_active(&self) -> bool {
        self.status == MediaStatus::Active
    }

    /// Extension of the original filename, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let (stem, ext) = self.filename.rsplit_once('.')?;
        if ext.is_empty() || stem.is_empty() {
            return None;
        }
        Some(ext)
    }

    /// Human-readable size, e.g. `"1.5 MB"`.
    pub fn formatted_size(&self) -> String {
        const UNIT: u64 = 1024;
        const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

        if self.size_bytes < UNIT {
            return format!("{} B", self.size_bytes);
        }

        let mut div = UNIT;
        let mut exp = 0;
        let mut n = self.size_bytes / UNIT;
        while n >= UNIT && exp < UNITS.len() - 1 {
            div *= UNIT;
            exp += 1;
            n /= UNIT;
        }

        format!("{:.1} {}", self.size_bytes as f64 / div as f64, UNITS[exp])
    }

    /// Width divided by height, when both are known and height is non-zero.
    pub fn aspect_ratio(&self) -> Option<f64> {
        let dims = self.dimensions?;
        if dims.height == 0 {
            return None;
        }
        Some(f64::from(dims.width) / f64::from(dims.height))
    }

    /// Case-insensitive substring match over filename, alt text and caption.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let needle = keyword.to_lowercase();
        [&self.filename, &self.alt, &self.caption]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    /// Whether `caller` may see this file: it is public, or the caller uploaded it.
    pub fn is_visible_to(&self, caller: Option<UploaderId>) -> bool {
        self.is_public || (caller.is_some() && caller == self.uploader_id)
    }
}

/// Insert payload for a new [`MediaFile`]; status starts as active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMediaFile {
    /// Content hash
    pub fingerprint: Fingerprint,
    /// Original filename
    pub filename: String,
    /// MIME type
    pub mime_type: String,
    /// Coarse category
    pub category: MediaCategory,
    /// Size in bytes
    pub size_bytes: u64,
    /// Pixel dimensions
    pub dimensions: Option<Dimensions>,
    /// Duration in seconds
    pub duration_secs: Option<u32>,
    /// On-disk location
    pub storage_path: PathBuf,
    /// Public URL
    pub url: String,
    /// Alternative text
    pub alt: String,
    /// Caption
    pub caption: String,
    /// Public flag
    pub is_public: bool,
    /// Uploader
    pub uploader_id: Option<UploaderId>,
}

/// Partial update of a file's descriptive metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPatch {
    /// New alternative text
    #[serde(default)]
    pub alt: Option<String>,
    /// New caption
    #[serde(default)]
    pub caption: Option<String>,
    /// New public flag
    #[serde(default)]
    pub is_public: Option<bool>,
}

impl MediaPatch {
    /// True when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.alt.is_none() && self.caption.is_none() && self.is_public.is_none()
    }

    /// Apply the patch to a record, bumping `updated_at` when anything changed.
    pub fn apply_to(&self, media: &mut MediaFile, now: DateTime<Utc>) {
        if self.is_empty() {
            return;
        }
        if let Some(alt) = &self.alt {
            media.alt = alt.clone();
        }
        if let Some(caption) = &self.caption {
            media.caption = caption.clone();
        }
        if let Some(is_public) = self.is_public {
            media.is_public = is_public;
        }
        media.updated_at = now;
    }
}
