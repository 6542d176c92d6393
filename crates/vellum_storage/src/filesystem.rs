//! Filesystem byte store.
//!
//! Writes land in a uniquely named temp file next to their destination and are
//! hard-linked into place, so a path either holds complete content or nothing.
//! Every write hands back a [`StagedFile`] guard that deletes the bytes again
//! unless the caller commits them, which keeps a failed or cancelled ingest
//! from leaving orphans behind.

use crate::fingerprint::fingerprint;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use vellum_core::{Fingerprint, WorkerPool};
use vellum_error::{MediaError, MediaErrorKind, VellumResult};

/// Filesystem storage backend.
///
/// Paths come from [`StorageLayout`](crate::StorageLayout); this type only
/// refuses paths outside its root. Concurrent writes are bounded by the
/// `max_concurrent_writes` given at construction.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    root: PathBuf,
    writers: WorkerPool,
}

impl FileSystemStorage {
    /// Create a new filesystem storage backend.
    ///
    /// Creates the root directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    #[tracing::instrument(skip(root))]
    pub fn new(root: impl Into<PathBuf>, max_concurrent_writes: usize) -> VellumResult<Self> {
        let root = root.into();

        std::fs::create_dir_all(&root).map_err(|e| {
            MediaError::new(MediaErrorKind::WriteFailure(format!(
                "{}: {}",
                root.display(),
                e
            )))
        })?;

        tracing::info!(path = %root.display(), "Created filesystem storage");
        Ok(Self {
            root,
            writers: WorkerPool::new("storage-writes", max_concurrent_writes),
        })
    }

    /// Storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `data` to `path` and return an uncommitted guard for it.
    ///
    /// If `path` already holds content, it is left untouched and the guard
    /// does not own it: content-addressed paths with equal names carry equal
    /// bytes. The write runs to completion even if the returned future is
    /// dropped; the guard is then dropped with the task output and removes
    /// what it wrote.
    ///
    /// # Errors
    ///
    /// Returns `WriteFailure` if the path escapes the root or any filesystem
    /// step fails.
    #[tracing::instrument(skip(self, data), fields(path = %path.display(), size = data.len()))]
    pub async fn stage(&self, path: &Path, data: &[u8]) -> VellumResult<StagedFile> {
        let path = self.confine(path)?;
        let data = data.to_vec();

        let staged = self.writers.run(move || write_linked(path, &data)).await?;
        tracing::debug!(owned = staged.owned, "Staged media bytes");
        Ok(staged)
    }

    /// Read the bytes stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ReadFailure` if the file is missing or unreadable.
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    pub async fn read(&self, path: &Path) -> VellumResult<Vec<u8>> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            MediaError::new(MediaErrorKind::ReadFailure(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })?;
        tracing::trace!(size = data.len(), "Read media bytes");
        Ok(data)
    }

    /// Read `path` and check the bytes still hash to `expected`.
    ///
    /// # Errors
    ///
    /// Returns `ReadFailure` on I/O failure or fingerprint mismatch.
    pub async fn read_verified(&self, path: &Path, expected: &Fingerprint) -> VellumResult<Vec<u8>> {
        let data = self.read(path).await?;
        let actual = fingerprint(&data);
        if &actual != expected {
            tracing::error!(path = %path.display(), %expected, %actual, "Stored bytes do not match fingerprint");
            return Err(MediaError::new(MediaErrorKind::ReadFailure(format!(
                "Fingerprint mismatch at {}: expected {}, got {}",
                path.display(),
                expected,
                actual
            )))
            .into());
        }
        Ok(data)
    }

    /// Delete the file at `path`. Returns `false` if it was already gone.
    ///
    /// # Errors
    ///
    /// Returns `WriteFailure` if the file exists but cannot be removed.
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    pub async fn remove(&self, path: &Path) -> VellumResult<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                tracing::debug!("Removed media bytes");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MediaError::new(MediaErrorKind::WriteFailure(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            )))
            .into()),
        }
    }

    /// Check if a file exists at `path`.
    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    fn confine(&self, path: &Path) -> VellumResult<PathBuf> {
        let inside = path.strip_prefix(&self.root).is_ok_and(|rest| {
            rest.components().next().is_some()
                && rest
                    .components()
                    .all(|c| matches!(c, std::path::Component::Normal(_)))
        });
        if !inside {
            return Err(MediaError::new(MediaErrorKind::WriteFailure(format!(
                "Path {} is outside storage root {}",
                path.display(),
                self.root.display()
            )))
            .into());
        }
        Ok(path.to_path_buf())
    }
}

/// Bytes written to their final path but not yet committed.
///
/// Dropping the guard deletes the file it created. [`StagedFile::commit`]
/// hands ownership of the bytes to whoever recorded them.
#[derive(Debug)]
#[must_use = "dropping a StagedFile deletes the staged bytes"]
pub struct StagedFile {
    path: PathBuf,
    owned: bool,
}

impl StagedFile {
    /// Final path of the bytes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this write created the file (and dropping would remove it).
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Keep the bytes.
    pub fn commit(mut self) {
        self.owned = false;
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Discarded staged bytes"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "Failed to discard staged bytes"),
        }
    }
}

/// Temp file removed on drop.
struct TempFile(PathBuf);

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn write_failure(path: &Path, e: std::io::Error) -> MediaError {
    MediaError::new(MediaErrorKind::WriteFailure(format!(
        "{}: {}",
        path.display(),
        e
    )))
}

/// Write through a temp file and link it into place without clobbering.
fn write_linked(path: PathBuf, data: &[u8]) -> VellumResult<StagedFile> {
    let parent = path
        .parent()
        .ok_or_else(|| write_failure(&path, std::io::ErrorKind::InvalidInput.into()))?;
    std::fs::create_dir_all(parent).map_err(|e| write_failure(parent, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = TempFile(parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple())));

    let mut file = std::fs::File::create(&temp.0).map_err(|e| write_failure(&temp.0, e))?;
    file.write_all(data).map_err(|e| write_failure(&temp.0, e))?;
    file.sync_all().map_err(|e| write_failure(&temp.0, e))?;
    drop(file);

    let owned = match std::fs::hard_link(&temp.0, &path) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            tracing::debug!(path = %path.display(), "Content already on disk");
            false
        }
        Err(e) => return Err(write_failure(&path, e).into()),
    };

    Ok(StagedFile { path, owned })
}
