//! Listing filters and pagination.

use crate::{MediaCategory, MediaFile, MediaStatus, UploaderId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Largest page a caller may request.
const MAX_PER_PAGE: u32 = 100;
/// Page size used when none is given.
const DEFAULT_PER_PAGE: u32 = 20;

/// One-based page selection, normalised into range on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    /// Page numbers below 1 become 1; sizes are clamped to 1..=100.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// One-based page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Items per page.
    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Number of items skipped before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PER_PAGE)
    }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Total matches across all pages
    pub total: u64,
    /// The page that was requested
    pub request: PageRequest,
}

impl<T> Page<T> {
    /// Number of pages needed to show every match.
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.request.per_page()))
    }
}

/// Filter for listing files. Every criterion is optional; unset means "any".
///
/// # Examples
///
/// ```
/// use vellum_core::{MediaCategory, MediaFilter};
///
/// let filter = MediaFilter::builder()
///     .category(Some(MediaCategory::Image))
///     .keyword(Some("sunset".to_string()))
///     .build()
///     .unwrap();
/// assert_eq!(filter.page.page(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, derive_builder::Builder)]
#[builder(default)]
pub struct MediaFilter {
    /// Coarse category
    pub category: Option<MediaCategory>,
    /// Uploader
    pub uploader_id: Option<UploaderId>,
    /// Lifecycle status
    pub status: Option<MediaStatus>,
    /// Public flag
    pub is_public: Option<bool>,
    /// Minimum size in bytes, inclusive
    pub min_size: Option<u64>,
    /// Maximum size in bytes, inclusive
    pub max_size: Option<u64>,
    /// Created at or after
    pub created_after: Option<DateTime<Utc>>,
    /// Created at or before
    pub created_before: Option<DateTime<Utc>>,
    /// Case-insensitive substring of filename, alt text or caption
    pub keyword: Option<String>,
    /// Page selection
    pub page: PageRequest,
}

impl MediaFilter {
    /// Creates a new filter builder.
    pub fn builder() -> MediaFilterBuilder {
        MediaFilterBuilder::default()
    }

    /// Whether a record satisfies every criterion of the filter.
    pub fn matches(&self, media: &MediaFile) -> bool {
        if self.category.is_some_and(|c| c != media.category) {
            return false;
        }
        if self.uploader_id.is_some() && self.uploader_id != media.uploader_id {
            return false;
        }
        if self.status.is_some_and(|s| s != media.status) {
            return false;
        }
        if self.is_public.is_some_and(|p| p != media.is_public) {
            return false;
        }
        if self.min_size.is_some_and(|min| media.size_bytes < min) {
            return false;
        }
        if self.max_size.is_some_and(|max| media.size_bytes > max) {
            return false;
        }
        if self.created_after.is_some_and(|t| media.created_at < t) {
            return false;
        }
        if self.created_before.is_some_and(|t| media.created_at > t) {
            return false;
        }
        match self.keyword.as_deref().map(str::trim) {
            Some(keyword) if !keyword.is_empty() => media.matches_keyword(keyword),
            _ => true,
        }
    }
}
