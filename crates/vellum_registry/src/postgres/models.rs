//! Diesel models for the media tables.

use super::schema::{media_files, media_usages};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use std::path::PathBuf;
use vellum_core::{
    Dimensions, Fingerprint, MediaCategory, MediaFile, MediaPatch, MediaStatus, MediaUsage,
    NewMediaFile, NewMediaUsage,
};
use vellum_error::{DatabaseError, DatabaseErrorKind};

/// Database row for the `media_files` table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = media_files)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MediaFileRow {
    pub id: i64,
    pub fingerprint: String,
    pub filename: String,
    pub mime_type: String,
    pub category: String,
    pub size_bytes: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration_secs: Option<i32>,
    pub storage_path: String,
    pub url: String,
    pub alt: String,
    pub caption: String,
    pub status: String,
    pub is_public: bool,
    pub uploader_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn corrupt(field: &str, detail: impl std::fmt::Display) -> DatabaseError {
    DatabaseError::new(DatabaseErrorKind::Query(format!(
        "Invalid {} in media_files: {}",
        field, detail
    )))
}

impl TryFrom<MediaFileRow> for MediaFile {
    type Error = DatabaseError;

    fn try_from(row: MediaFileRow) -> Result<Self, Self::Error> {
        let fingerprint = Fingerprint::parse(&row.fingerprint)
            .ok_or_else(|| corrupt("fingerprint", &row.fingerprint))?;
        let category = row
            .category
            .parse::<MediaCategory>()
            .map_err(|e| corrupt("category", e))?;
        let status = row
            .status
            .parse::<MediaStatus>()
            .map_err(|e| corrupt("status", e))?;
        let dimensions = match (row.width, row.height) {
            (Some(w), Some(h)) => Some(Dimensions::new(
                u32::try_from(w).map_err(|e| corrupt("width", e))?,
                u32::try_from(h).map_err(|e| corrupt("height", e))?,
            )),
            _ => None,
        };

        Ok(MediaFile {
            id: row.id,
            fingerprint,
            filename: row.filename,
            mime_type: row.mime_type,
            category,
            size_bytes: u64::try_from(row.size_bytes).map_err(|e| corrupt("size_bytes", e))?,
            dimensions,
            duration_secs: row.duration_secs.and_then(|d| u32::try_from(d).ok()),
            storage_path: PathBuf::from(row.storage_path),
            url: row.url,
            alt: row.alt,
            caption: row.caption,
            status,
            is_public: row.is_public,
            uploader_id: row.uploader_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Insertable row for a new media file.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = media_files)]
pub(crate) struct NewMediaFileRow {
    pub fingerprint: String,
    pub filename: String,
    pub mime_type: String,
    pub category: String,
    pub size_bytes: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration_secs: Option<i32>,
    pub storage_path: String,
    pub url: String,
    pub alt: String,
    pub caption: String,
    pub status: String,
    pub is_public: bool,
    pub uploader_id: Option<i64>,
}

impl From<NewMediaFile> for NewMediaFileRow {
    fn from(new: NewMediaFile) -> Self {
        let clamp = |v: u32| i32::try_from(v).unwrap_or(i32::MAX);
        Self {
            fingerprint: new.fingerprint.into(),
            filename: new.filename,
            mime_type: new.mime_type,
            category: new.category.as_str().to_string(),
            size_bytes: i64::try_from(new.size_bytes).unwrap_or(i64::MAX),
            width: new.dimensions.map(|d| clamp(d.width)),
            height: new.dimensions.map(|d| clamp(d.height)),
            duration_secs: new.duration_secs.map(clamp),
            storage_path: new.storage_path.to_string_lossy().into_owned(),
            url: new.url,
            alt: new.alt,
            caption: new.caption,
            status: MediaStatus::Active.as_str().to_string(),
            is_public: new.is_public,
            uploader_id: new.uploader_id,
        }
    }
}

/// Metadata changes; `None` columns are left alone.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = media_files)]
pub(crate) struct MediaChangeset {
    pub alt: Option<String>,
    pub caption: Option<String>,
    pub is_public: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

impl From<&MediaPatch> for MediaChangeset {
    fn from(patch: &MediaPatch) -> Self {
        Self {
            alt: patch.alt.clone(),
            caption: patch.caption.clone(),
            is_public: patch.is_public,
            updated_at: Utc::now(),
        }
    }
}

/// Database row for the `media_usages` table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = media_usages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MediaUsageRow {
    pub id: i64,
    pub media_id: i64,
    pub usage_type: String,
    pub target_id: Option<i64>,
    pub uploader_id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<MediaUsageRow> for MediaUsage {
    fn from(row: MediaUsageRow) -> Self {
        Self {
            id: row.id,
            media_id: row.media_id,
            usage_type: row.usage_type,
            target_id: row.target_id,
            uploader_id: row.uploader_id,
            created_at: row.created_at,
        }
    }
}

/// Insertable row for a new usage.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = media_usages)]
pub(crate) struct NewMediaUsageRow {
    pub media_id: i64,
    pub usage_type: String,
    pub target_id: Option<i64>,
    pub uploader_id: i64,
}

impl From<NewMediaUsage> for NewMediaUsageRow {
    fn from(usage: NewMediaUsage) -> Self {
        Self {
            media_id: usage.media_id,
            usage_type: usage.usage_type,
            target_id: usage.target_id,
            uploader_id: usage.uploader_id,
        }
    }
}

/// Per-category aggregate from the stats query.
#[derive(Debug, QueryableByName)]
pub(crate) struct CategoryTotalsRow {
    #[diesel(sql_type = Text)]
    pub category: String,
    #[diesel(sql_type = BigInt)]
    pub count: i64,
    #[diesel(sql_type = BigInt)]
    pub total_bytes: i64,
}

/// Usage count per type.
#[derive(Debug, QueryableByName)]
pub(crate) struct UsageTypeCountRow {
    #[diesel(sql_type = Text)]
    pub usage_type: String,
    #[diesel(sql_type = BigInt)]
    pub count: i64,
}

/// Usage count per media file.
#[derive(Debug, QueryableByName)]
pub(crate) struct MediaUsageCountRow {
    #[diesel(sql_type = BigInt)]
    pub media_id: i64,
    #[diesel(sql_type = BigInt)]
    pub usage_count: i64,
}
