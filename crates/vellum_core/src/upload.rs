//! Caller-supplied upload metadata.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Where an uploaded file is about to be used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageTarget {
    /// Caller-defined kind of reference (e.g., "post_cover")
    pub usage_type: String,
    /// Referencing entity
    pub target_id: Option<i64>,
}

impl UsageTarget {
    /// Create a usage target.
    pub fn new(usage_type: impl Into<String>, target_id: Option<i64>) -> Self {
        Self {
            usage_type: usage_type.into(),
            target_id,
        }
    }
}

/// Descriptive metadata accompanying an upload.
///
/// # Examples
///
/// ```
/// use vellum_core::{UploadMetadata, UsageTarget};
///
/// let metadata = UploadMetadata::builder()
///     .alt("A red square")
///     .usage(Some(UsageTarget::new("post_cover", Some(12))))
///     .build()
///     .unwrap();
///
/// assert!(*metadata.is_public());
/// assert_eq!(metadata.caption(), "");
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize, derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct UploadMetadata {
    /// Alternative text
    #[builder(default)]
    #[serde(default)]
    alt: String,

    /// Caption
    #[builder(default)]
    #[serde(default)]
    caption: String,

    /// Whether the file is publicly visible
    #[builder(default = "true")]
    #[serde(default = "default_public")]
    is_public: bool,

    /// Usage to record once the file is stored
    #[builder(default)]
    #[serde(default)]
    usage: Option<UsageTarget>,
}

fn default_public() -> bool {
    true
}

impl Default for UploadMetadata {
    fn default() -> Self {
        Self {
            alt: String::new(),
            caption: String::new(),
            is_public: true,
            usage: None,
        }
    }
}

impl UploadMetadata {
    /// Creates a new metadata builder.
    pub fn builder() -> UploadMetadataBuilder {
        UploadMetadataBuilder::default()
    }
}
