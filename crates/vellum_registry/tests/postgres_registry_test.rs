//! Tests for the PostgreSQL registry backend.
//!
//! Run with `--features postgres` and `DATABASE_URL` pointing at a scratch
//! database; without `DATABASE_URL` each test returns early.

#![cfg(feature = "postgres")]

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use vellum_core::{
    Fingerprint, MediaCategory, MediaPatch, MediaStatus, NewMediaFile, NewMediaUsage, PageRequest,
    UsageFilter,
};
use vellum_error::MediaErrorKind;
use vellum_registry::{MediaRegistry, PostgresRegistry, UsageTracker};

async fn registry() -> Option<PostgresRegistry> {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    }
    let registry = PostgresRegistry::new().unwrap();
    registry.run_migrations().await.unwrap();
    Some(registry)
}

/// Fingerprint unique across test runs against the same database.
fn unique_fingerprint() -> Fingerprint {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos() as u64;
    let mut digest = nanos.to_be_bytes().to_vec();
    digest.extend_from_slice(&COUNTER.fetch_add(1, Ordering::SeqCst).to_be_bytes());
    digest.extend_from_slice(&std::process::id().to_be_bytes());
    Fingerprint::from_digest(&digest)
}

fn new_media(fingerprint: Fingerprint, caption: &str) -> NewMediaFile {
    NewMediaFile {
        storage_path: PathBuf::from(format!("/srv/vellum/{}.png", fingerprint)),
        url: format!("/uploads/{}.png", fingerprint),
        filename: format!("{}.png", fingerprint),
        fingerprint,
        mime_type: "image/png".to_string(),
        category: MediaCategory::Image,
        size_bytes: 128,
        dimensions: Some(vellum_core::Dimensions::new(4, 3)),
        duration_secs: None,
        alt: String::new(),
        caption: caption.to_string(),
        is_public: true,
        uploader_id: Some(77),
    }
}

#[tokio::test]
async fn test_create_duplicate_and_lookup() {
    let Some(registry) = registry().await else {
        return;
    };
    let fingerprint = unique_fingerprint();

    let created = registry
        .create(new_media(fingerprint.clone(), ""))
        .await
        .unwrap();
    assert_eq!(created.dimensions.unwrap().width, 4);

    let err = registry
        .create(new_media(fingerprint.clone(), ""))
        .await
        .unwrap_err();
    assert!(err.is_duplicate_fingerprint());

    let found = registry.get_by_fingerprint(&fingerprint).await.unwrap();
    assert_eq!(found.map(|m| m.id), Some(created.id));

    registry.hard_delete(created.id).await.unwrap();
    assert!(registry.get_by_id(created.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_update_status_and_search() {
    let Some(registry) = registry().await else {
        return;
    };
    let marker = unique_fingerprint().to_string();
    let media = registry
        .create(new_media(unique_fingerprint(), &format!("caption {}", marker)))
        .await
        .unwrap();

    let updated = registry
        .update(
            media.id,
            &MediaPatch {
                alt: Some("updated alt".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.alt, "updated alt");

    let found = registry
        .search(&marker.to_uppercase(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(found.total, 1);

    registry.soft_delete(media.id).await.unwrap();
    let hidden = registry
        .search(&marker, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(hidden.total, 0);

    let restored = registry.restore(media.id).await.unwrap();
    assert_eq!(restored.status, MediaStatus::Active);
    registry.hard_delete(media.id).await.unwrap();
}

#[tokio::test]
async fn test_usages_restrict_hard_delete() {
    let Some(registry) = registry().await else {
        return;
    };
    let media = registry
        .create(new_media(unique_fingerprint(), ""))
        .await
        .unwrap();

    registry
        .create_usage(NewMediaUsage::new(media.id, "post_cover", Some(media.id), 77))
        .await
        .unwrap();
    assert_eq!(registry.count_by_media(media.id).await.unwrap(), 1);
    assert_eq!(
        registry
            .list_by_target("post_cover", Some(media.id))
            .await
            .unwrap()
            .len(),
        1
    );

    let err = registry.hard_delete(media.id).await.unwrap_err();
    assert!(matches!(err.media_kind(), Some(MediaErrorKind::InvalidState(_))));

    assert_eq!(registry.delete_by_media(media.id).await.unwrap(), 1);
    registry.hard_delete(media.id).await.unwrap();

    let err = registry
        .create_usage(NewMediaUsage::new(media.id, "post_cover", None, 77))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_single_usage_delete_and_history() {
    let Some(registry) = registry().await else {
        return;
    };
    let media = registry
        .create(new_media(unique_fingerprint(), ""))
        .await
        .unwrap();

    let first = registry
        .create_usage(NewMediaUsage::new(media.id, "gallery", Some(1), 77))
        .await
        .unwrap();
    let second = registry
        .create_usage(NewMediaUsage::new(media.id, "gallery", Some(2), 77))
        .await
        .unwrap();

    let history = registry
        .list_usages(&UsageFilter::for_media(media.id).with_page(PageRequest::new(1, 1)))
        .await
        .unwrap();
    assert_eq!(history.total, 2);
    assert_eq!(history.items[0].id, second.id);

    assert!(registry.delete_usage(first.id).await.unwrap());
    assert!(!registry.delete_usage(first.id).await.unwrap());
    let err = registry.hard_delete(media.id).await.unwrap_err();
    assert!(matches!(err.media_kind(), Some(MediaErrorKind::InvalidState(_))));

    assert!(registry.delete_usage(second.id).await.unwrap());
    registry.hard_delete(media.id).await.unwrap();
}
