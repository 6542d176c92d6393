//! Tests for the in-memory registry backend.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use vellum_core::{
    Fingerprint, MediaCategory, MediaFilter, MediaPatch, MediaStatus, NewMediaFile,
    NewMediaUsage, PageRequest, UsageFilter,
};
use vellum_error::MediaErrorKind;
use vellum_registry::{InMemoryRegistry, MediaRegistry, UsageTracker};

fn new_media(seed: u8, filename: &str, category: MediaCategory, size: u64) -> NewMediaFile {
    let fingerprint = Fingerprint::from_digest(&[seed; 32]);
    NewMediaFile {
        storage_path: PathBuf::from(format!("/tmp/vellum/{}", fingerprint)),
        url: format!("/uploads/{}", fingerprint),
        fingerprint,
        filename: filename.to_string(),
        mime_type: "image/png".to_string(),
        category,
        size_bytes: size,
        dimensions: None,
        duration_secs: None,
        alt: String::new(),
        caption: String::new(),
        is_public: true,
        uploader_id: Some(1),
    }
}

#[tokio::test]
async fn test_create_and_lookup() {
    let registry = InMemoryRegistry::new();
    let created = registry
        .create(new_media(1, "a.png", MediaCategory::Image, 10))
        .await
        .unwrap();

    assert_eq!(created.status, MediaStatus::Active);
    assert_eq!(registry.get_by_id(created.id).await.unwrap(), created);
    assert_eq!(
        registry
            .get_by_fingerprint(&created.fingerprint)
            .await
            .unwrap(),
        Some(created.clone())
    );

    let miss = Fingerprint::from_digest(&[9; 32]);
    assert_eq!(registry.get_by_fingerprint(&miss).await.unwrap(), None);
    assert!(registry.get_by_id(999).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_duplicate_fingerprint_rejected() {
    let registry = InMemoryRegistry::new();
    registry
        .create(new_media(1, "a.png", MediaCategory::Image, 10))
        .await
        .unwrap();
    let err = registry
        .create(new_media(1, "b.png", MediaCategory::Image, 10))
        .await
        .unwrap_err();
    assert!(err.is_duplicate_fingerprint());
    assert_eq!(registry.len().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_leave_one_row() {
    let registry = Arc::new(InMemoryRegistry::new());
    let attempts = (0..8).map(|_| {
        let registry = registry.clone();
        tokio::spawn(async move {
            registry
                .create(new_media(7, "same.png", MediaCategory::Image, 1))
                .await
        })
    });

    let results = futures::future::join_all(attempts).await;
    let created = results
        .into_iter()
        .map(|r| r.unwrap())
        .filter(|r| r.is_ok())
        .count();
    assert_eq!(created, 1);
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn test_update_soft_delete_restore() {
    let registry = InMemoryRegistry::new();
    let media = registry
        .create(new_media(1, "a.png", MediaCategory::Image, 10))
        .await
        .unwrap();

    let patch = MediaPatch {
        alt: Some("A cat".to_string()),
        is_public: Some(false),
        ..Default::default()
    };
    let updated = registry.update(media.id, &patch).await.unwrap();
    assert_eq!(updated.alt, "A cat");
    assert!(!updated.is_public);
    assert_eq!(updated.caption, "");

    let deleted = registry.soft_delete(media.id).await.unwrap();
    assert_eq!(deleted.status, MediaStatus::Deleted);
    assert_eq!(
        registry.get_by_id(media.id).await.unwrap().status,
        MediaStatus::Deleted
    );

    let restored = registry.restore(media.id).await.unwrap();
    assert_eq!(restored.status, MediaStatus::Active);
}

#[tokio::test]
async fn test_hard_delete_frees_fingerprint() {
    let registry = InMemoryRegistry::new();
    let media = registry
        .create(new_media(1, "a.png", MediaCategory::Image, 10))
        .await
        .unwrap();

    registry.hard_delete(media.id).await.unwrap();
    assert!(registry.get_by_id(media.id).await.unwrap_err().is_not_found());
    assert!(registry.hard_delete(media.id).await.unwrap_err().is_not_found());

    let again = registry
        .create(new_media(1, "a.png", MediaCategory::Image, 10))
        .await
        .unwrap();
    assert_ne!(again.id, media.id);
}

#[tokio::test]
async fn test_hard_delete_refused_while_referenced() {
    let registry = InMemoryRegistry::new();
    let media = registry
        .create(new_media(1, "a.png", MediaCategory::Image, 10))
        .await
        .unwrap();
    registry.create_usage(NewMediaUsage::new(media.id, "post", Some(3), 1))
        .await
        .unwrap();

    let err = registry.hard_delete(media.id).await.unwrap_err();
    assert!(matches!(err.media_kind(), Some(MediaErrorKind::InvalidState(_))));
}

#[tokio::test]
async fn test_list_filters_and_pagination() {
    let registry = InMemoryRegistry::new();
    for seed in 0..5u8 {
        registry
            .create(new_media(seed, &format!("photo-{}.png", seed), MediaCategory::Image, 100))
            .await
            .unwrap();
    }
    let doc = registry
        .create(new_media(50, "report.pdf", MediaCategory::Document, 5000))
        .await
        .unwrap();
    registry.soft_delete(doc.id).await.unwrap();

    let images = registry
        .list(
            &MediaFilter::builder()
                .category(Some(MediaCategory::Image))
                .page(PageRequest::new(2, 2))
                .build()
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(images.total, 5);
    assert_eq!(images.items.len(), 2);
    assert_eq!(images.total_pages(), 3);

    let large = registry
        .list(
            &MediaFilter::builder()
                .min_size(Some(1000))
                .build()
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(large.total, 1);
    assert_eq!(large.items[0].id, doc.id);

    let active = registry
        .list(
            &MediaFilter::builder()
                .status(Some(MediaStatus::Active))
                .build()
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(active.total, 5);
    // Newest first
    assert!(active.items.windows(2).all(|w| w[0].id > w[1].id));
}

#[tokio::test]
async fn test_search_only_returns_active() {
    let registry = InMemoryRegistry::new();
    let mut sunset = new_media(1, "beach.png", MediaCategory::Image, 10);
    sunset.caption = "Sunset over the bay".to_string();
    let sunset = registry.create(sunset).await.unwrap();

    let mut hidden = new_media(2, "sunset-old.png", MediaCategory::Image, 10);
    hidden.alt = "sunset".to_string();
    let hidden = registry.create(hidden).await.unwrap();
    registry.soft_delete(hidden.id).await.unwrap();

    let found = registry
        .search("SUNSET", PageRequest::default())
        .await
        .unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].id, sunset.id);
}

#[tokio::test]
async fn test_stats_by_category_and_uploader() {
    let registry = InMemoryRegistry::new();
    registry
        .create(new_media(1, "a.png", MediaCategory::Image, 10))
        .await
        .unwrap();
    registry
        .create(new_media(2, "b.png", MediaCategory::Image, 20))
        .await
        .unwrap();
    let mut other = new_media(3, "c.pdf", MediaCategory::Document, 30);
    other.uploader_id = Some(2);
    registry.create(other).await.unwrap();

    let all = registry.stats(None).await.unwrap();
    assert_eq!(all.total_count, 3);
    assert_eq!(all.total_bytes, 60);
    assert_eq!(all.count_for(MediaCategory::Image), 2);
    assert_eq!(all.count_for(MediaCategory::Video), 0);

    let mine = registry.stats(Some(2)).await.unwrap();
    assert_eq!(mine.total_count, 1);
    assert_eq!(mine.count_for(MediaCategory::Document), 1);
}

#[tokio::test]
async fn test_list_recent_only_public_active() {
    let registry = InMemoryRegistry::new();
    let first = registry
        .create(new_media(1, "a.png", MediaCategory::Image, 1))
        .await
        .unwrap();
    let mut private = new_media(2, "b.png", MediaCategory::Image, 1);
    private.is_public = false;
    registry.create(private).await.unwrap();
    let third = registry
        .create(new_media(3, "c.png", MediaCategory::Image, 1))
        .await
        .unwrap();

    let recent = registry.list_recent(10).await.unwrap();
    let ids: Vec<_> = recent.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![third.id, first.id]);
    assert_eq!(registry.list_recent(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_usage_lifecycle() {
    let registry = InMemoryRegistry::new();
    let a = registry
        .create(new_media(1, "a.png", MediaCategory::Image, 1))
        .await
        .unwrap();
    let b = registry
        .create(new_media(2, "b.png", MediaCategory::Image, 1))
        .await
        .unwrap();

    registry.create_usage(NewMediaUsage::new(a.id, "post", Some(1), 9))
        .await
        .unwrap();
    registry.create_usage(NewMediaUsage::new(a.id, "post", Some(2), 9))
        .await
        .unwrap();
    registry.create_usage(NewMediaUsage::new(b.id, "post", Some(1), 9))
        .await
        .unwrap();
    registry.create_usage(NewMediaUsage::new(b.id, "avatar", None, 9))
        .await
        .unwrap();

    assert_eq!(registry.count_by_media(a.id).await.unwrap(), 2);
    assert_eq!(registry.list_by_media(b.id).await.unwrap().len(), 2);
    assert_eq!(registry.list_by_target("post", Some(1)).await.unwrap().len(), 2);
    assert_eq!(registry.list_by_target("avatar", None).await.unwrap().len(), 1);

    let stats = registry.usage_stats().await.unwrap();
    assert_eq!(stats.total_usages, 4);
    assert_eq!(stats.by_type.get("post"), Some(&3));
    assert_eq!(stats.top_media[0].media.id, a.id);
    assert_eq!(stats.top_media[0].usage_count, 2);
    assert_eq!(stats.recent.len(), 4);

    assert_eq!(registry.delete_by_target("post", Some(1)).await.unwrap(), 2);
    assert_eq!(registry.delete_by_media(a.id).await.unwrap(), 1);
    assert_eq!(registry.count_by_media(a.id).await.unwrap(), 0);
    assert_eq!(registry.count_by_media(b.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_usage_requires_existing_media() {
    let registry = InMemoryRegistry::new();
    let err = registry.create_usage(NewMediaUsage::new(42, "post", None, 1))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_media_lock_blocks_usage_insert() {
    let registry = Arc::new(InMemoryRegistry::new());
    let media = registry
        .create(new_media(1, "a.png", MediaCategory::Image, 1))
        .await
        .unwrap();

    let media_id = media.id;
    let lock = registry.lock_media(media_id).await;
    let pending = {
        let registry = registry.clone();
        tokio::spawn(async move {
            registry.create_usage(NewMediaUsage::new(media_id, "post", None, 1)).await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(registry.count_by_media(media.id).await.unwrap(), 0);

    drop(lock);
    pending.await.unwrap().unwrap();
    assert_eq!(registry.count_by_media(media.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_single_usage() {
    let registry = InMemoryRegistry::new();
    let media = registry
        .create(new_media(1, "a.png", MediaCategory::Image, 1))
        .await
        .unwrap();
    let first = registry
        .create_usage(NewMediaUsage::new(media.id, "post", Some(1), 9))
        .await
        .unwrap();
    registry
        .create_usage(NewMediaUsage::new(media.id, "post", Some(2), 9))
        .await
        .unwrap();

    assert!(registry.delete_usage(first.id).await.unwrap());
    assert!(!registry.delete_usage(first.id).await.unwrap());
    assert!(!registry.delete_usage(9999).await.unwrap());
    assert_eq!(registry.count_by_media(media.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_usage_waits_for_media_lock() {
    let registry = Arc::new(InMemoryRegistry::new());
    let media = registry
        .create(new_media(1, "a.png", MediaCategory::Image, 1))
        .await
        .unwrap();
    let usage = registry
        .create_usage(NewMediaUsage::new(media.id, "post", None, 1))
        .await
        .unwrap();

    let lock = registry.lock_media(media.id).await;
    let pending = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.delete_usage(usage.id).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(registry.count_by_media(media.id).await.unwrap(), 1);

    drop(lock);
    assert!(pending.await.unwrap().unwrap());
    assert_eq!(registry.count_by_media(media.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_list_usages_filters_and_pages() {
    let registry = InMemoryRegistry::new();
    let a = registry
        .create(new_media(1, "a.png", MediaCategory::Image, 1))
        .await
        .unwrap();
    let b = registry
        .create(new_media(2, "b.png", MediaCategory::Image, 1))
        .await
        .unwrap();
    for (media, usage_type, uploader) in [
        (a.id, "post", 1),
        (a.id, "avatar", 1),
        (b.id, "post", 1),
        (b.id, "post", 2),
        (b.id, "banner", 1),
    ] {
        registry
            .create_usage(NewMediaUsage::new(media, usage_type, None, uploader))
            .await
            .unwrap();
    }

    let by_uploader = UsageFilter::for_uploader(1).with_page(PageRequest::new(1, 3));
    let first = registry.list_usages(&by_uploader).await.unwrap();
    assert_eq!(first.total, 4);
    assert_eq!(first.items.len(), 3);
    // Newest first.
    assert_eq!(first.items[0].usage_type, "banner");
    let second = registry
        .list_usages(&by_uploader.clone().with_page(PageRequest::new(2, 3)))
        .await
        .unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].usage_type, "post");
    assert_eq!(second.items[0].media_id, a.id);

    let posts = registry.list_usages(&UsageFilter::for_type("post")).await.unwrap();
    assert_eq!(posts.total, 3);

    let history = registry.list_usages(&UsageFilter::for_media(b.id)).await.unwrap();
    assert_eq!(history.total, 3);
    assert!(history.items.iter().all(|u| u.media_id == b.id));

    let combined = UsageFilter {
        usage_type: Some("post".to_string()),
        uploader_id: Some(2),
        ..Default::default()
    };
    assert_eq!(registry.list_usages(&combined).await.unwrap().total, 1);
}
