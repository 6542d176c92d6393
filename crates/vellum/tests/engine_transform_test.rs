//! Tests for the transform engine.

mod common;

use common::{UPLOADER, engine, files_under, jpeg, png};
use std::sync::Arc;
use tempfile::TempDir;
use vellum::{
    Dimensions, MediaEngine, MediaErrorKind, MediaFile, NoWatermark, OutputFormat, TransformOp,
    TransformRequest, UploadMetadata, WatermarkStatus,
};

async fn ingest(engine: &MediaEngine, data: &[u8], filename: &str) -> MediaFile {
    let metadata = UploadMetadata::builder()
        .alt("Beach at dusk")
        .caption("Sunset")
        .build()
        .unwrap();
    engine
        .ingest(data, filename, UPLOADER, metadata)
        .await
        .unwrap()
        .media
}

fn stored_dimensions(media: &MediaFile) -> (u32, u32) {
    let bytes = std::fs::read(&media.storage_path).unwrap();
    let image = image::load_from_memory(&bytes).unwrap();
    (image.width(), image.height())
}

#[tokio::test]
async fn test_resize_preserves_aspect_ratio_and_source() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = engine(&temp_dir);
    let source = ingest(&engine, &png(300, 200, 1), "photo.png").await;

    let by_width = engine
        .transform(source.id, &TransformRequest::resize(Some(150), None))
        .await
        .unwrap();
    let by_height = engine
        .transform(source.id, &TransformRequest::resize(None, Some(50)))
        .await
        .unwrap();

    let derived = &by_width.media;
    assert_ne!(derived.id, source.id);
    assert_eq!(derived.dimensions, Some(Dimensions::new(150, 100)));
    assert_eq!(stored_dimensions(derived), (150, 100));
    assert_eq!(by_height.media.dimensions, Some(Dimensions::new(75, 50)));

    assert_eq!(derived.filename, "photo_resize.png");
    assert_eq!(derived.caption, "Sunset (resize)");
    assert_eq!(derived.alt, source.alt);
    assert_eq!(derived.is_public, source.is_public);
    assert_eq!(derived.uploader_id, Some(UPLOADER));
    assert_eq!(derived.mime_type, "image/png");
    assert_eq!(by_width.watermark, WatermarkStatus::NotRequested);

    assert_eq!(engine.get(source.id).await.unwrap(), source);
    assert_eq!(store.len().await, 3);
    assert_eq!(files_under(temp_dir.path()).len(), 3);
}

#[tokio::test]
async fn test_invalid_parameters_create_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = engine(&temp_dir);
    let source = ingest(&engine, &png(50, 50, 2), "photo.png").await;

    for request in [
        TransformRequest::resize(None, None),
        TransformRequest::resize(Some(0), None),
        TransformRequest::compress().with_quality(101),
    ] {
        let err = engine.transform(source.id, &request).await.unwrap_err();
        assert!(matches!(
            err.media_kind(),
            Some(MediaErrorKind::InvalidTransformParameters(_))
        ));
    }
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_thumbnail_is_square_jpeg() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, _) = engine(&temp_dir);
    let source = ingest(&engine, &png(640, 480, 3), "holiday.png").await;

    let thumb = engine
        .transform(source.id, &TransformRequest::thumbnail())
        .await
        .unwrap()
        .media;

    assert_eq!(thumb.dimensions, Some(Dimensions::new(200, 200)));
    assert_eq!(thumb.mime_type, "image/jpeg");
    assert_eq!(thumb.filename, "holiday_thumbnail.jpg");
    assert!(thumb.storage_path.to_string_lossy().ends_with(".jpg"));
    assert_eq!(stored_dimensions(&thumb), (200, 200));

    let sized = engine
        .transform(
            source.id,
            &TransformRequest::new(TransformOp::Thumbnail {
                width: Some(64),
                height: None,
            }),
        )
        .await
        .unwrap()
        .media;
    assert_eq!(sized.dimensions, Some(Dimensions::new(64, 48)));
}

#[tokio::test]
async fn test_compress_keeps_dimensions_and_format() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, _) = engine(&temp_dir);
    let source = ingest(&engine, &jpeg(120, 90, 4), "shot.jpg").await;

    let compressed = engine
        .transform(source.id, &TransformRequest::compress().with_quality(30))
        .await
        .unwrap()
        .media;

    assert_eq!(compressed.mime_type, "image/jpeg");
    assert_eq!(compressed.dimensions, Some(Dimensions::new(120, 90)));
    assert_eq!(compressed.filename, "shot_compress.jpg");

    let as_webp = engine
        .transform(
            source.id,
            &TransformRequest::compress().with_format(OutputFormat::WebP),
        )
        .await
        .unwrap()
        .media;
    assert_eq!(as_webp.mime_type, "image/webp");
    assert_eq!(as_webp.filename, "shot_compress.webp");
}

#[tokio::test]
async fn test_watermark_outcome_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, _) = engine(&temp_dir);
    let source = ingest(&engine, &png(300, 200, 5), "photo.png").await;

    let drawn = engine
        .transform(source.id, &TransformRequest::watermark("Vellum 2024"))
        .await
        .unwrap();
    assert_eq!(drawn.watermark, WatermarkStatus::Applied);
    assert_ne!(drawn.media.fingerprint, source.fingerprint);

    let plain = engine.with_watermark_renderer(Arc::new(NoWatermark));
    let skipped = plain
        .transform(source.id, &TransformRequest::watermark("Vellum 2024"))
        .await
        .unwrap();
    assert!(skipped.watermark.is_degraded());
    assert_eq!(skipped.media.caption, "Sunset (watermark)");
}

#[tokio::test]
async fn test_repeated_transform_resolves_to_existing_record() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = engine(&temp_dir);
    let source = ingest(&engine, &png(100, 100, 6), "photo.png").await;
    let request = TransformRequest::resize(Some(40), None);

    let first = engine.transform(source.id, &request).await.unwrap();
    let second = engine.transform(source.id, &request).await.unwrap();

    assert_eq!(first.media.id, second.media.id);
    assert_eq!(store.len().await, 2);
    assert_eq!(files_under(temp_dir.path()).len(), 2);
}

#[tokio::test]
async fn test_optimize_heuristics() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, _) = engine(&temp_dir);

    let small = ingest(&engine, &png(64, 64, 7), "small.png").await;
    let optimized = engine.optimize(small.id).await.unwrap().media;
    assert_eq!(optimized.mime_type, "image/jpeg");
    assert_eq!(optimized.dimensions, small.dimensions);
    assert_eq!(optimized.filename, "small_compress.jpg");

    let wide = ingest(&engine, &png(3000, 100, 8), "panorama.png").await;
    let optimized = engine.optimize(wide.id).await.unwrap().media;
    assert_eq!(optimized.dimensions, Some(Dimensions::new(2048, 68)));
    assert_eq!(optimized.filename, "panorama_resize.jpg");
}

#[tokio::test]
async fn test_non_images_and_corrupt_bytes_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = engine(&temp_dir);

    let doc = ingest(&engine, b"%PDF-1.7 body", "doc.pdf").await;
    let err = engine
        .transform(doc.id, &TransformRequest::thumbnail())
        .await
        .unwrap_err();
    assert_eq!(
        err.media_kind(),
        Some(&MediaErrorKind::UnsupportedType("application/pdf".to_string()))
    );

    let photo = ingest(&engine, &png(20, 20, 9), "photo.png").await;
    std::fs::write(&photo.storage_path, b"not the original bytes").unwrap();
    let err = engine
        .transform(photo.id, &TransformRequest::thumbnail())
        .await
        .unwrap_err();
    assert!(matches!(err.media_kind(), Some(MediaErrorKind::ReadFailure(_))));

    assert!(engine.transform(999, &TransformRequest::thumbnail()).await.unwrap_err().is_not_found());
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_deleted_sources_are_not_transformed() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, _) = engine(&temp_dir);
    let metadata = UploadMetadata::builder()
        .usage(Some(vellum::UsageTarget::new("post_cover", Some(3))))
        .build()
        .unwrap();
    let source = engine
        .ingest(&png(20, 20, 10), "photo.png", UPLOADER, metadata)
        .await
        .unwrap()
        .media;
    engine.delete(source.id).await.unwrap();

    let err = engine
        .transform(source.id, &TransformRequest::thumbnail())
        .await
        .unwrap_err();
    assert!(matches!(err.media_kind(), Some(MediaErrorKind::InvalidState(_))));
}

#[tokio::test]
async fn test_image_info_reads_header() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, _) = engine(&temp_dir);
    let photo = ingest(&engine, &png(33, 21, 11), "photo.png").await;

    let info = engine.image_info(photo.id).await.unwrap();
    assert_eq!((info.width, info.height), (33, 21));
    assert_eq!(info.color_type, "Rgb8");
    assert_eq!(info.size_bytes, photo.size_bytes);
    assert_eq!(info.mime_type, "image/png");
    assert_eq!(info.url, photo.url);

    let doc = ingest(&engine, b"just words", "words.txt").await;
    assert!(matches!(
        engine.image_info(doc.id).await.unwrap_err().media_kind(),
        Some(MediaErrorKind::UnsupportedType(_))
    ));
}

#[tokio::test]
async fn test_transform_batch_is_partial() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, _) = engine(&temp_dir);
    let a = ingest(&engine, &png(50, 40, 12), "a.png").await;
    let b = ingest(&engine, &png(40, 50, 13), "b.png").await;

    let outcome = engine
        .transform_batch(&[a.id, 999, b.id], &TransformRequest::thumbnail())
        .await
        .unwrap();

    assert_eq!(outcome.succeeded.len(), 2);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].index, 1);
    assert!(outcome.failed[0].error.is_not_found());

    let err = engine
        .transform_batch(&[], &TransformRequest::thumbnail())
        .await
        .unwrap_err();
    assert!(matches!(err.media_kind(), Some(MediaErrorKind::InvalidBatch(_))));
}
