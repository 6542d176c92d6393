//! Core data types for the Vellum media engine.
//!
//! This crate holds the records the engine persists ([`MediaFile`], [`MediaUsage`]),
//! the request and query types callers build, the engine configuration, and the
//! bounded worker pool used to keep blocking work off the async executor.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod category;
mod config;
mod fingerprint;
mod media;
mod pool;
mod query;
mod stats;
mod upload;
mod usage;

pub use category::MediaCategory;
pub use config::MediaConfig;
pub use fingerprint::Fingerprint;
pub use media::{Dimensions, MediaFile, MediaPatch, MediaStatus, NewMediaFile};
pub use pool::WorkerPool;
pub use query::{MediaFilter, MediaFilterBuilder, Page, PageRequest};
pub use stats::{CategoryStats, MediaStats, MediaUsageCount, UsageStats};
pub use upload::{UploadMetadata, UploadMetadataBuilder, UsageTarget};
pub use usage::{MediaUsage, NewMediaUsage, UsageFilter};

/// Registry-assigned identifier of a [`MediaFile`].
pub type MediaId = i64;

/// Opaque identity of the user who uploaded or referenced a file.
pub type UploaderId = i64;

/// Registry-assigned identifier of a [`MediaUsage`].
pub type UsageId = i64;
