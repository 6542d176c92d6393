//! Media registry and usage tracking for Vellum.
//!
//! [`MediaRegistry`] persists file records and owns fingerprint uniqueness.
//! [`UsageTracker`] records which entities reference which file and hands out
//! per-media locks so that counting usages and acting on the count cannot be
//! interleaved with a concurrent usage insert.
//!
//! Two backends ship here:
//!
//! - [`InMemoryRegistry`] for tests and single-process embedding
//! - `PostgresRegistry` behind the `postgres` feature

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod in_memory;
mod lock;
mod registry;
mod usage;

#[cfg(feature = "postgres")]
mod postgres;

pub use in_memory::InMemoryRegistry;
pub use lock::{KeyLock, LockTable, MediaLock, MediaLocks};
pub use registry::MediaRegistry;
pub use usage::UsageTracker;

#[cfg(feature = "postgres")]
pub use postgres::PostgresRegistry;

use vellum_core::MediaId;
use vellum_error::{MediaError, MediaErrorKind, VellumError};

/// Maximum number of rows returned by "top" and "recent" aggregates.
pub const AGGREGATE_LIMIT: usize = 10;

pub(crate) fn media_not_found(id: MediaId) -> VellumError {
    MediaError::new(MediaErrorKind::NotFound(format!("media {}", id))).into()
}
