//! Date-partitioned, fingerprint-sharded storage layout.

use chrono::{Datelike, NaiveDate};
use std::path::{Path, PathBuf};
use vellum_core::{Fingerprint, MediaConfig};

/// Extension used when a filename has none (or an unusable one).
pub const FALLBACK_EXTENSION: &str = "bin";

/// Longest extension carried over from a filename.
const MAX_EXTENSION_LEN: usize = 10;

/// Where a blob lives on disk and how it is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocation {
    /// Absolute (or root-relative) filesystem path
    pub path: PathBuf,
    /// Path below the storage root, always `/`-separated
    pub relative: String,
    /// Public URL
    pub url: String,
}

/// Maps fingerprints onto paths and URLs.
///
/// Layout: `{root}/{YYYY}/{MM}/{DD}/{fp[0..2]}/{fp[2..]}.{ext}`.
/// Pure; nothing here touches the disk.
///
/// ```
/// use chrono::NaiveDate;
/// use vellum_core::Fingerprint;
/// use vellum_storage::StorageLayout;
///
/// let layout = StorageLayout::new("/srv/media", "https://cdn.example.com/media/");
/// let fp = Fingerprint::parse("abcdef0123").unwrap();
/// let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
/// let location = layout.locate("Cat.PNG", &fp, date);
///
/// assert_eq!(location.relative, "2024/03/09/ab/cdef0123.png");
/// assert_eq!(location.url, "https://cdn.example.com/media/2024/03/09/ab/cdef0123.png");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    root: PathBuf,
    public_base: String,
}

impl StorageLayout {
    /// Create a layout rooted at `root`, served under `public_base`.
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    /// Layout described by the engine configuration.
    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(config.storage_root().clone(), config.public_base_url().clone())
    }

    /// Storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Compute the location for content with `fingerprint` uploaded as `filename` on `date`.
    pub fn locate(&self, filename: &str, fingerprint: &Fingerprint, date: NaiveDate) -> StorageLocation {
        let year = format!("{:04}", date.year());
        let month = format!("{:02}", date.month());
        let day = format!("{:02}", date.day());
        let file_name = format!("{}.{}", fingerprint.remainder(), extension_for(filename));

        let path = self
            .root
            .join(&year)
            .join(&month)
            .join(&day)
            .join(fingerprint.shard())
            .join(&file_name);
        let relative = [year.as_str(), &month, &day, fingerprint.shard(), &file_name].join("/");
        let url = self.url_for_relative(&relative);

        StorageLocation { path, relative, url }
    }

    /// Public URL of a path below the root, or `None` if it lies elsewhere.
    pub fn url_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Some(self.url_for_relative(&relative))
    }

    fn url_for_relative(&self, relative: &str) -> String {
        format!("{}/{}", self.public_base.trim_end_matches('/'), relative)
    }
}

/// Lowercase extension of `filename`, or [`FALLBACK_EXTENSION`].
///
/// Only short alphanumeric extensions are carried over so that a filename
/// can never inject path separators into the layout.
pub fn extension_for(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}
