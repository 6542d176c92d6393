//! Aggregate statistics.

use crate::{MediaCategory, MediaFile, MediaUsage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Count and byte total for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    /// Number of files
    pub count: u64,
    /// Sum of file sizes in bytes
    pub total_bytes: u64,
}

/// Count and byte totals over active files, broken down by category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaStats {
    /// Number of files
    pub total_count: u64,
    /// Sum of file sizes in bytes
    pub total_bytes: u64,
    /// Per-category breakdown; categories with no files are absent
    pub by_category: BTreeMap<MediaCategory, CategoryStats>,
}

impl MediaStats {
    /// Fold one file into the totals.
    pub fn record(&mut self, media: &MediaFile) {
        self.add(media.category, 1, media.size_bytes);
    }

    /// Fold a pre-aggregated category row into the totals.
    pub fn add(&mut self, category: MediaCategory, count: u64, total_bytes: u64) {
        self.total_count += count;
        self.total_bytes += total_bytes;
        let entry = self.by_category.entry(category).or_default();
        entry.count += count;
        entry.total_bytes += total_bytes;
    }

    /// Number of files in a category.
    pub fn count_for(&self, category: MediaCategory) -> u64 {
        self.by_category.get(&category).map_or(0, |s| s.count)
    }
}

/// A file together with how many usages reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUsageCount {
    /// The referenced file
    pub media: MediaFile,
    /// Number of usage records pointing at it
    pub usage_count: u64,
}

/// Aggregate usage statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Number of usage records
    pub total_usages: u64,
    /// Usage count per usage type
    pub by_type: BTreeMap<String, u64>,
    /// Most referenced active files, most referenced first
    pub top_media: Vec<MediaUsageCount>,
    /// Most recently recorded usages, newest first
    pub recent: Vec<MediaUsage>,
}
