//! Persisting and restoring the active task through sled

use std::sync::Arc;

use notegen::store::{
    parse_outline, GenerationStateStore, SledSnapshotStorage, Snapshot, SnapshotStorage,
};
use notegen::types::{ImageStatus, PageType, ProgressStatus, ReferenceImage, Stage};
use tempfile::TempDir;

fn sled_storage(dir: &TempDir) -> Arc<SledSnapshotStorage> {
    Arc::new(SledSnapshotStorage::new(dir.path().join("state")).unwrap())
}

#[test]
fn test_restored_store_resumes_mid_run() {
    let temp_dir = TempDir::new().unwrap();
    let storage = sled_storage(&temp_dir);

    let mut store = GenerationStateStore::open(storage.clone());
    store.set_topic("tea");
    store.set_user_images(vec![ReferenceImage::new("image/png", vec![1, 2, 3])]);
    store.set_outline(
        "[cover] a\n\n<page>\n\nb\n\n<page>\n\nc",
        parse_outline("[cover] a\n\n<page>\n\nb\n\n<page>\n\nc"),
    );
    store.start_generation();
    store.update_progress(0, ImageStatus::Done, Some("/api/ai/images/t/0.png"), None);
    store.update_progress(1, ImageStatus::Error, None, Some("blocked"));
    store.set_record_id(Some("rec1".to_string()));

    let restored = GenerationStateStore::open(storage);
    assert_eq!(restored.stage(), Stage::Generating);
    assert_eq!(restored.topic(), "tea");
    assert_eq!(restored.pages().len(), 3);
    assert_eq!(restored.pages()[0].page_type, PageType::Cover);
    assert_eq!(restored.progress().current, 1);
    assert_eq!(restored.progress().status, ProgressStatus::Generating);
    assert_eq!(restored.image(1).unwrap().error.as_deref(), Some("blocked"));
    assert_eq!(restored.image(2).unwrap().status, ImageStatus::Generating);
    assert_eq!(restored.record_id(), Some("rec1"));
    assert!(
        restored.user_images().is_empty(),
        "reference images are never persisted"
    );
    assert_eq!(restored.snapshot(), store.snapshot());
}

#[test]
fn test_reset_removes_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let storage = sled_storage(&temp_dir);

    let mut store = GenerationStateStore::open(storage.clone());
    store.set_topic("tea");
    assert!(storage.read().unwrap().is_some());

    store.reset();
    assert!(storage.read().unwrap().is_none());
    let restored = GenerationStateStore::open(storage);
    assert_eq!(restored.snapshot(), Snapshot::default());
}

#[test]
fn test_garbage_snapshot_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let storage = sled_storage(&temp_dir);
    storage.write(b"{not json").unwrap();

    let store = GenerationStateStore::open(storage);
    assert_eq!(store.stage(), Stage::Input);
    assert!(store.pages().is_empty());
}
