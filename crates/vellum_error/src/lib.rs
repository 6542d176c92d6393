//! Error types for the Vellum media engine.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! Callers map failures to responses by matching on kinds, never on message text:
//!
//! ```
//! use vellum_error::{MediaError, MediaErrorKind, VellumResult};
//!
//! fn check(size: u64) -> VellumResult<()> {
//!     Err(MediaError::new(MediaErrorKind::FileTooLarge { size, limit: 10 }))?
//! }
//!
//! let err = check(11).unwrap_err();
//! assert!(matches!(
//!     err.media_kind(),
//!     Some(MediaErrorKind::FileTooLarge { size: 11, limit: 10 })
//! ));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod database;
mod error;
mod media;

pub use config::{ConfigError, ConfigErrorKind};
pub use database::{DatabaseError, DatabaseErrorKind};
pub use error::{VellumError, VellumErrorKind, VellumResult};
pub use media::{MediaError, MediaErrorKind};
