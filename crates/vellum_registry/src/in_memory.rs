//! In-memory registry backend.
//!
//! Keeps records in maps behind a single `RwLock`, so every check-then-insert
//! runs under one write guard. All data is lost when the registry is dropped.

use crate::{AGGREGATE_LIMIT, MediaLock, MediaLocks, MediaRegistry, UsageTracker, media_not_found};
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use vellum_core::{
    Fingerprint, MediaFile, MediaFilter, MediaId, MediaPatch, MediaStats, MediaStatus,
    MediaUsage, MediaUsageCount, NewMediaFile, NewMediaUsage, Page, PageRequest, UploaderId,
    UsageFilter, UsageId, UsageStats,
};
use vellum_error::{MediaError, MediaErrorKind, VellumResult};

/// In-memory implementation of [`MediaRegistry`] and [`UsageTracker`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use vellum_registry::{InMemoryRegistry, MediaRegistry, UsageTracker};
///
/// let store = Arc::new(InMemoryRegistry::new());
/// let registry: Arc<dyn MediaRegistry> = store.clone();
/// let usages: Arc<dyn UsageTracker> = store;
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    state: Arc<RwLock<State>>,
    locks: MediaLocks,
}

#[derive(Debug, Default)]
struct State {
    media: BTreeMap<MediaId, MediaFile>,
    by_fingerprint: HashMap<Fingerprint, MediaId>,
    usages: BTreeMap<UsageId, MediaUsage>,
    last_media_id: MediaId,
    last_usage_id: UsageId,
}

impl InMemoryRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, whatever their status (for testing).
    pub async fn len(&self) -> usize {
        self.state.read().await.media.len()
    }

    /// Whether no records are stored (for testing).
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.media.is_empty()
    }

    async fn modify(
        &self,
        id: MediaId,
        change: impl FnOnce(&mut MediaFile) + Send,
    ) -> VellumResult<MediaFile> {
        let mut state = self.state.write().await;
        let media = state.media.get_mut(&id).ok_or_else(|| media_not_found(id))?;
        change(media);
        Ok(media.clone())
    }
}

/// Newest first, ties broken by descending ID.
fn newest_first(items: &mut [MediaFile]) {
    items.sort_by_key(|m| Reverse((m.created_at, m.id)));
}

fn paginate(mut items: Vec<MediaFile>, request: PageRequest) -> Page<MediaFile> {
    newest_first(&mut items);
    page_of(items, request)
}

/// Slice an already ordered list.
fn page_of<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
        .take(request.per_page() as usize)
        .collect();
    Page {
        items,
        total,
        request,
    }
}

#[async_trait]
impl MediaRegistry for InMemoryRegistry {
    #[tracing::instrument(skip(self, new), fields(fingerprint = %new.fingerprint))]
    async fn create(&self, new: NewMediaFile) -> VellumResult<MediaFile> {
        let mut state = self.state.write().await;
        if state.by_fingerprint.contains_key(&new.fingerprint) {
            tracing::debug!("Fingerprint already registered");
            return Err(MediaError::new(MediaErrorKind::DuplicateFingerprint(
                new.fingerprint.to_string(),
            ))
            .into());
        }

        state.last_media_id += 1;
        let media = MediaFile::from_new(state.last_media_id, new, Utc::now());
        state
            .by_fingerprint
            .insert(media.fingerprint.clone(), media.id);
        state.media.insert(media.id, media.clone());

        tracing::debug!(id = media.id, "Registered media");
        Ok(media)
    }

    async fn get_by_id(&self, id: MediaId) -> VellumResult<MediaFile> {
        self.state
            .read()
            .await
            .media
            .get(&id)
            .cloned()
            .ok_or_else(|| media_not_found(id))
    }

    async fn get_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> VellumResult<Option<MediaFile>> {
        let state = self.state.read().await;
        Ok(state
            .by_fingerprint
            .get(fingerprint)
            .and_then(|id| state.media.get(id))
            .cloned())
    }

    async fn update(&self, id: MediaId, patch: &MediaPatch) -> VellumResult<MediaFile> {
        self.modify(id, |media| patch.apply_to(media, Utc::now()))
            .await
    }

    async fn soft_delete(&self, id: MediaId) -> VellumResult<MediaFile> {
        self.modify(id, |media| {
            media.status = MediaStatus::Deleted;
            media.updated_at = Utc::now();
        })
        .await
    }

    async fn restore(&self, id: MediaId) -> VellumResult<MediaFile> {
        self.modify(id, |media| {
            media.status = MediaStatus::Active;
            media.updated_at = Utc::now();
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn hard_delete(&self, id: MediaId) -> VellumResult<()> {
        let mut state = self.state.write().await;
        if state.usages.values().any(|u| u.media_id == id) {
            return Err(MediaError::new(MediaErrorKind::InvalidState(format!(
                "media {} is still referenced",
                id
            )))
            .into());
        }
        let media = state.media.remove(&id).ok_or_else(|| media_not_found(id))?;
        state.by_fingerprint.remove(&media.fingerprint);
        tracing::debug!("Removed media row");
        Ok(())
    }

    async fn list(&self, filter: &MediaFilter) -> VellumResult<Page<MediaFile>> {
        let state = self.state.read().await;
        let matching = state
            .media
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        Ok(paginate(matching, filter.page))
    }

    async fn search(&self, keyword: &str, page: PageRequest) -> VellumResult<Page<MediaFile>> {
        let keyword = keyword.trim();
        let state = self.state.read().await;
        let matching = state
            .media
            .values()
            .filter(|m| m.is_active() && (keyword.is_empty() || m.matches_keyword(keyword)))
            .cloned()
            .collect();
        Ok(paginate(matching, page))
    }

    async fn stats(&self, uploader_id: Option<UploaderId>) -> VellumResult<MediaStats> {
        let state = self.state.read().await;
        let mut stats = MediaStats::default();
        state
            .media
            .values()
            .filter(|m| m.is_active())
            .filter(|m| uploader_id.is_none() || m.uploader_id == uploader_id)
            .for_each(|m| stats.record(m));
        Ok(stats)
    }

    async fn list_recent(&self, limit: usize) -> VellumResult<Vec<MediaFile>> {
        let state = self.state.read().await;
        let mut recent: Vec<_> = state
            .media
            .values()
            .filter(|m| m.is_active() && m.is_public)
            .cloned()
            .collect();
        newest_first(&mut recent);
        recent.truncate(limit);
        Ok(recent)
    }
}

#[async_trait]
impl UsageTracker for InMemoryRegistry {
    async fn lock_media(&self, media_id: MediaId) -> MediaLock {
        self.locks.lock(media_id).await
    }

    #[tracing::instrument(skip(self, usage), fields(media_id = usage.media_id, usage_type = %usage.usage_type))]
    async fn create_usage(&self, usage: NewMediaUsage) -> VellumResult<MediaUsage> {
        let _lock = self.locks.lock(usage.media_id).await;
        let mut state = self.state.write().await;
        if !state.media.contains_key(&usage.media_id) {
            return Err(media_not_found(usage.media_id));
        }

        state.last_usage_id += 1;
        let record = MediaUsage {
            id: state.last_usage_id,
            media_id: usage.media_id,
            usage_type: usage.usage_type,
            target_id: usage.target_id,
            uploader_id: usage.uploader_id,
            created_at: Utc::now(),
        };
        state.usages.insert(record.id, record.clone());
        tracing::debug!(id = record.id, "Recorded usage");
        Ok(record)
    }

    async fn list_by_media(&self, media_id: MediaId) -> VellumResult<Vec<MediaUsage>> {
        let state = self.state.read().await;
        Ok(state
            .usages
            .values()
            .filter(|u| u.media_id == media_id)
            .cloned()
            .collect())
    }

    async fn list_by_target(
        &self,
        usage_type: &str,
        target_id: Option<i64>,
    ) -> VellumResult<Vec<MediaUsage>> {
        let state = self.state.read().await;
        Ok(state
            .usages
            .values()
            .filter(|u| u.usage_type == usage_type && u.target_id == target_id)
            .cloned()
            .collect())
    }

    async fn list_usages(&self, filter: &UsageFilter) -> VellumResult<Page<MediaUsage>> {
        let state = self.state.read().await;
        let mut matching: Vec<MediaUsage> = state
            .usages
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        matching.sort_by_key(|u| Reverse((u.created_at, u.id)));
        Ok(page_of(matching, filter.page))
    }

    #[tracing::instrument(skip(self))]
    async fn delete_usage(&self, usage_id: UsageId) -> VellumResult<bool> {
        let Some(media_id) = self
            .state
            .read()
            .await
            .usages
            .get(&usage_id)
            .map(|u| u.media_id)
        else {
            return Ok(false);
        };

        let _lock = self.locks.lock(media_id).await;
        let removed = self.state.write().await.usages.remove(&usage_id).is_some();
        if removed {
            tracing::debug!(media_id, "Removed usage");
        }
        Ok(removed)
    }

    async fn delete_by_media(&self, media_id: MediaId) -> VellumResult<u64> {
        let mut state = self.state.write().await;
        let before = state.usages.len();
        state.usages.retain(|_, u| u.media_id != media_id);
        Ok((before - state.usages.len()) as u64)
    }

    async fn delete_by_target(
        &self,
        usage_type: &str,
        target_id: Option<i64>,
    ) -> VellumResult<u64> {
        let mut state = self.state.write().await;
        let before = state.usages.len();
        state
            .usages
            .retain(|_, u| !(u.usage_type == usage_type && u.target_id == target_id));
        Ok((before - state.usages.len()) as u64)
    }

    async fn count_by_media(&self, media_id: MediaId) -> VellumResult<u64> {
        let state = self.state.read().await;
        Ok(state
            .usages
            .values()
            .filter(|u| u.media_id == media_id)
            .count() as u64)
    }

    async fn usage_stats(&self) -> VellumResult<UsageStats> {
        let state = self.state.read().await;
        let mut stats = UsageStats {
            total_usages: state.usages.len() as u64,
            ..Default::default()
        };

        let mut per_media: HashMap<MediaId, u64> = HashMap::new();
        for usage in state.usages.values() {
            *stats.by_type.entry(usage.usage_type.clone()).or_default() += 1;
            *per_media.entry(usage.media_id).or_default() += 1;
        }

        let mut top: Vec<MediaUsageCount> = per_media
            .into_iter()
            .filter_map(|(id, usage_count)| {
                state
                    .media
                    .get(&id)
                    .filter(|m| m.is_active())
                    .map(|media| MediaUsageCount {
                        media: media.clone(),
                        usage_count,
                    })
            })
            .collect();
        top.sort_by_key(|entry| (Reverse(entry.usage_count), entry.media.id));
        top.truncate(AGGREGATE_LIMIT);
        stats.top_media = top;

        let mut recent: Vec<MediaUsage> = state.usages.values().cloned().collect();
        recent.sort_by_key(|u| Reverse((u.created_at, u.id)));
        recent.truncate(AGGREGATE_LIMIT);
        stats.recent = recent;

        Ok(stats)
    }
}
