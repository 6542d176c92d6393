//! Content-addressable media storage for Vellum.
//!
//! The pure pieces ([`fingerprint`], [`classify`], [`StorageLayout`]) decide
//! *what* a blob is and *where* it lives; [`FileSystemStorage`] is the only
//! code that touches the disk.
//!
//! # Example
//!
//! ```rust
//! use vellum_storage::{classify, fingerprint, FileSystemStorage, StorageLayout};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let root = std::env::temp_dir().join("vellum-doc");
//! let storage = FileSystemStorage::new(&root, 4)?;
//! let layout = StorageLayout::new(&root, "https://cdn.example.com/media");
//!
//! let data = b"%PDF-1.7 minimal";
//! let kind = classify("report.pdf", data);
//! let fp = fingerprint(data);
//! let location = layout.locate("report.pdf", &fp, chrono::Utc::now().date_naive());
//!
//! let staged = storage.stage(&location.path, data).await?;
//! staged.commit();
//! assert_eq!(storage.read_verified(&location.path, &fp).await?, data);
//! assert_eq!(kind.mime_type, "application/pdf");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod classify;
mod filesystem;
mod fingerprint;
mod layout;

pub use classify::{Classification, classify, ensure_allowed, mime_from_extension, sniff};
pub use filesystem::{FileSystemStorage, StagedFile};
pub use fingerprint::fingerprint;
pub use layout::{FALLBACK_EXTENSION, StorageLayout, StorageLocation, extension_for};
