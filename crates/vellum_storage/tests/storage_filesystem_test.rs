//! Tests for the filesystem byte store.

use chrono::NaiveDate;
use tempfile::TempDir;
use vellum_core::Fingerprint;
use vellum_error::MediaErrorKind;
use vellum_storage::{FileSystemStorage, StorageLayout, fingerprint};

fn setup(temp_dir: &TempDir) -> (FileSystemStorage, StorageLayout) {
    let storage = FileSystemStorage::new(temp_dir.path(), 4).unwrap();
    let layout = StorageLayout::new(temp_dir.path(), "/uploads");
    (storage, layout)
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn files_under(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            found.extend(files_under(&path));
        } else {
            found.push(path);
        }
    }
    found
}

#[tokio::test]
async fn test_stage_commit_and_read() {
    let temp_dir = TempDir::new().unwrap();
    let (storage, layout) = setup(&temp_dir);

    let data = b"Hello, world!";
    let fp = fingerprint(data);
    let location = layout.locate("hello.txt", &fp, date());

    let staged = storage.stage(&location.path, data).await.unwrap();
    assert!(staged.is_owned());
    assert_eq!(staged.path(), location.path.as_path());
    staged.commit();

    assert!(storage.exists(&location.path).await);
    assert_eq!(storage.read_verified(&location.path, &fp).await.unwrap(), data);
    // Temp files are gone
    assert_eq!(files_under(temp_dir.path()), vec![location.path]);
}

#[tokio::test]
async fn test_dropped_stage_removes_bytes() {
    let temp_dir = TempDir::new().unwrap();
    let (storage, layout) = setup(&temp_dir);

    let data = b"never recorded";
    let location = layout.locate("x.bin", &fingerprint(data), date());

    let staged = storage.stage(&location.path, data).await.unwrap();
    drop(staged);

    assert!(!storage.exists(&location.path).await);
    assert!(files_under(temp_dir.path()).is_empty());
}

#[tokio::test]
async fn test_second_stage_of_same_content_does_not_own_file() {
    let temp_dir = TempDir::new().unwrap();
    let (storage, layout) = setup(&temp_dir);

    let data = b"Duplicate content";
    let location = layout.locate("dup.txt", &fingerprint(data), date());

    let first = storage.stage(&location.path, data).await.unwrap();
    let second = storage.stage(&location.path, data).await.unwrap();
    assert!(first.is_owned());
    assert!(!second.is_owned());

    // Dropping the non-owner keeps the bytes for the owner
    drop(second);
    assert!(storage.exists(&location.path).await);
    first.commit();
    assert_eq!(files_under(temp_dir.path()).len(), 1);
}

#[tokio::test]
async fn test_fingerprint_verification() {
    let temp_dir = TempDir::new().unwrap();
    let (storage, layout) = setup(&temp_dir);

    let data = b"Original data";
    let fp = fingerprint(data);
    let location = layout.locate("o.txt", &fp, date());
    storage.stage(&location.path, data).await.unwrap().commit();

    std::fs::write(&location.path, b"Tampered data").unwrap();

    let err = storage.read_verified(&location.path, &fp).await.unwrap_err();
    assert!(matches!(err.media_kind(), Some(MediaErrorKind::ReadFailure(_))));
}

#[tokio::test]
async fn test_rejects_paths_outside_root() {
    let temp_dir = TempDir::new().unwrap();
    let (storage, _) = setup(&temp_dir);

    let outside = temp_dir.path().join("..").join("escape.bin");
    let err = storage.stage(&outside, b"x").await.unwrap_err();
    assert!(matches!(err.media_kind(), Some(MediaErrorKind::WriteFailure(_))));
}

#[tokio::test]
async fn test_remove_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let (storage, layout) = setup(&temp_dir);

    let data = b"short lived";
    let location = layout.locate("s.txt", &fingerprint(data), date());
    storage.stage(&location.path, data).await.unwrap().commit();

    assert!(storage.remove(&location.path).await.unwrap());
    assert!(!storage.remove(&location.path).await.unwrap());
}

#[tokio::test]
async fn test_read_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let (storage, _) = setup(&temp_dir);

    let missing = temp_dir.path().join("nope.bin");
    let fp = Fingerprint::parse("abcdef").unwrap();
    let err = storage.read_verified(&missing, &fp).await.unwrap_err();
    assert!(matches!(err.media_kind(), Some(MediaErrorKind::ReadFailure(_))));
}
