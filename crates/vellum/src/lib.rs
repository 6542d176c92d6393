//! Vellum - content-addressed media storage for blogs and CMSs
//!
//! Vellum stores uploaded files once per distinct content, derives new images
//! from stored ones, and decides between soft and hard deletion from the
//! references other entities hold.
//!
//! # Features
//!
//! - **Deduplication**: SHA-256 fingerprints; identical uploads share one record and one file
//! - **Sharded layout**: `{root}/YYYY/MM/DD/{shard}/{fingerprint}.{ext}`
//! - **Transforms**: resize, compress, watermark, thumbnail and automatic optimization
//! - **Reference-counted lifecycle**: soft delete while referenced, hard delete otherwise
//! - **Backends**: in-memory registry, PostgreSQL behind the `postgres` feature
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use vellum::{MediaConfig, MediaEngine, TransformRequest, UploadMetadata};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     vellum::init_console_telemetry()?;
//!
//!     let engine = MediaEngine::in_memory(MediaConfig::load()?)?;
//!     let photo = std::fs::read("photo.jpg")?;
//!
//!     let stored = engine.ingest(&photo, "photo.jpg", 1, UploadMetadata::default()).await?;
//!     let thumb = engine.transform(stored.media.id, &TransformRequest::thumbnail()).await?;
//!     println!("{} -> {}", stored.media.url, thumb.media.url);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `vellum_error` - Error types
//! - `vellum_core` - Records, queries, configuration, worker pools
//! - `vellum_storage` - Fingerprints, classification, layout, filesystem
//! - `vellum_registry` - Registry and usage tracker traits and backends
//! - `vellum_imaging` - Image codecs and transforms
//!
//! This crate (`vellum`) composes them into [`MediaEngine`] and re-exports
//! everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod telemetry;

pub use engine::{
    BatchFailure, BatchOutcome, Deletion, ImageInfo, IngestOutcome, MAX_BATCH_SIZE, MediaEngine,
    TransformOutcome, Upload,
};
pub use telemetry::{DEFAULT_DIRECTIVE, init_console_telemetry, init_telemetry};

pub use vellum_core::*;
pub use vellum_error::*;
pub use vellum_imaging::{
    BitmapTextRenderer, NoWatermark, OutputFormat, TransformOp, TransformRequest,
    WatermarkRenderer, WatermarkStatus,
};
#[cfg(feature = "postgres")]
pub use vellum_registry::PostgresRegistry;
pub use vellum_registry::{
    InMemoryRegistry, KeyLock, LockTable, MediaLock, MediaRegistry, UsageTracker,
};
pub use vellum_storage::{Classification, StorageLayout, StorageLocation, classify, fingerprint};
