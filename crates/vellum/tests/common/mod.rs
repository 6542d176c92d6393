//! Shared fixtures for engine tests.
#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;
use vellum::{
    DatabaseError, DatabaseErrorKind, Fingerprint, InMemoryRegistry, MediaConfig, MediaEngine,
    MediaFile, MediaFilter, MediaId, MediaPatch, MediaRegistry, MediaStats, NewMediaFile, Page,
    PageRequest, UploaderId, VellumResult,
};

pub const UPLOADER: UploaderId = 7;

pub fn config(temp_dir: &TempDir) -> MediaConfig {
    MediaConfig::default()
        .with_storage_root(temp_dir.path())
        .with_public_base_url("/uploads")
        .with_io_workers(4)
        .with_transform_workers(2)
}

pub fn engine(temp_dir: &TempDir) -> (MediaEngine, Arc<InMemoryRegistry>) {
    let store = Arc::new(InMemoryRegistry::new());
    let engine = MediaEngine::new(config(temp_dir), store.clone(), store.clone()).unwrap();
    (engine, store)
}

/// A PNG whose pixels depend on `seed`, so different seeds give different bytes.
pub fn png(width: u32, height: u32, seed: u8) -> Vec<u8> {
    encode(width, height, seed, ImageFormat::Png)
}

pub fn jpeg(width: u32, height: u32, seed: u8) -> Vec<u8> {
    encode(width, height, seed, ImageFormat::Jpeg)
}

fn encode(width: u32, height: u32, seed: u8, format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x as u8).wrapping_mul(3), (y as u8).wrapping_add(seed), seed])
    });
    let mut buffer = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, format)
        .unwrap();
    buffer.into_inner()
}

pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            found.extend(files_under(&path));
        } else {
            found.push(path);
        }
    }
    found.sort();
    found
}

/// Registry wrapper that injects faults in front of an in-memory registry.
#[derive(Debug, Default)]
pub struct Faulty {
    pub inner: Arc<InMemoryRegistry>,
    /// Fingerprint lookups that report a miss before lookups work again
    pub lookup_misses: AtomicUsize,
    /// Every `create` fails with a database error
    pub fail_create: bool,
    /// Delay before each `create`
    pub create_delay: Option<Duration>,
    /// Delay before each fingerprint lookup
    pub lookup_delay: Option<Duration>,
    /// Signalled once a row has been hard-deleted
    pub hard_deleted: Arc<Notify>,
    /// Delay after each hard delete, before returning to the caller
    pub hard_delete_pause: Option<Duration>,
}

impl Faulty {
    pub fn new(inner: Arc<InMemoryRegistry>) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn miss_next_lookups(&self, count: usize) {
        self.lookup_misses.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaRegistry for Faulty {
    async fn create(&self, new: NewMediaFile) -> VellumResult<MediaFile> {
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_create {
            return Err(DatabaseError::new(DatabaseErrorKind::Query("insert rejected".to_string())).into());
        }
        self.inner.create(new).await
    }

    async fn get_by_id(&self, id: MediaId) -> VellumResult<MediaFile> {
        self.inner.get_by_id(id).await
    }

    async fn get_by_fingerprint(&self, fingerprint: &Fingerprint) -> VellumResult<Option<MediaFile>> {
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }
        let missed = self
            .lookup_misses
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if missed {
            return Ok(None);
        }
        self.inner.get_by_fingerprint(fingerprint).await
    }

    async fn update(&self, id: MediaId, patch: &MediaPatch) -> VellumResult<MediaFile> {
        self.inner.update(id, patch).await
    }

    async fn soft_delete(&self, id: MediaId) -> VellumResult<MediaFile> {
        self.inner.soft_delete(id).await
    }

    async fn restore(&self, id: MediaId) -> VellumResult<MediaFile> {
        self.inner.restore(id).await
    }

    async fn hard_delete(&self, id: MediaId) -> VellumResult<()> {
        self.inner.hard_delete(id).await?;
        self.hard_deleted.notify_one();
        if let Some(pause) = self.hard_delete_pause {
            tokio::time::sleep(pause).await;
        }
        Ok(())
    }

    async fn list(&self, filter: &MediaFilter) -> VellumResult<Page<MediaFile>> {
        self.inner.list(filter).await
    }

    async fn search(&self, keyword: &str, page: PageRequest) -> VellumResult<Page<MediaFile>> {
        self.inner.search(keyword, page).await
    }

    async fn stats(&self, uploader_id: Option<UploaderId>) -> VellumResult<MediaStats> {
        self.inner.stats(uploader_id).await
    }

    async fn list_recent(&self, limit: usize) -> VellumResult<Vec<MediaFile>> {
        self.inner.list_recent(limit).await
    }
}

/// Engine over a [`Faulty`] registry; usages go straight to the inner store.
pub fn faulty_engine(config: MediaConfig, faulty: Faulty) -> (MediaEngine, Arc<Faulty>) {
    let usages = faulty.inner.clone();
    let faulty = Arc::new(faulty);
    let engine = MediaEngine::new(config, faulty.clone(), usages).unwrap();
    (engine, faulty)
}
