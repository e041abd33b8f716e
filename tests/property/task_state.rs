//! Outline and progress invariants under arbitrary edit and report sequences

use std::sync::Arc;

use notegen::store::{join_pages, GenerationStateStore, MemorySnapshotStorage};
use notegen::types::{ImageStatus, Page, PageType};
use proptest::prelude::*;

fn store_with(count: usize) -> GenerationStateStore {
    let mut store = GenerationStateStore::open(Arc::new(MemorySnapshotStorage::new()));
    let pages = (0..count)
        .map(|i| Page::new(i, PageType::Content, format!("page {}", i)))
        .collect();
    store.set_outline("", pages);
    store
}

fn status_strategy() -> impl Strategy<Value = ImageStatus> {
    prop_oneof![
        Just(ImageStatus::Generating),
        Just(ImageStatus::Done),
        Just(ImageStatus::Error),
        Just(ImageStatus::Retrying),
    ]
}

proptest! {
    #[test]
    fn deletes_keep_indices_dense_and_raw_joined(
        count in 1usize..10,
        deletes in prop::collection::vec(0usize..12, 0..10),
    ) {
        let mut store = store_with(count);
        for index in deletes {
            let before = store.pages().len();
            let result = store.delete_page(index);
            prop_assert_eq!(result.is_ok(), index < before);

            let indices: Vec<usize> = store.pages().iter().map(|p| p.index).collect();
            prop_assert_eq!(indices, (0..store.pages().len()).collect::<Vec<_>>());
            prop_assert_eq!(&store.outline().raw, &join_pages(store.pages()));
        }
    }

    #[test]
    fn progress_stays_within_bounds(
        count in 1usize..8,
        reports in prop::collection::vec((0usize..10, status_strategy(), any::<bool>()), 0..40),
    ) {
        let mut store = store_with(count);
        store.start_generation();
        for (index, status, with_url) in reports {
            let url = with_url.then(|| format!("/img/{}.png", index));
            store.update_progress(index, status, url.as_deref(), Some("failed"));

            let progress = store.progress();
            prop_assert!(progress.current <= progress.total);
            prop_assert_eq!(progress.current, store.completed_count());
            let percent = store.progress_percent();
            prop_assert!((0.0..=100.0).contains(&percent));
            prop_assert!(store.completed_count() + store.failed_count() <= count);
            let done_images_have_urls = store.images().iter().all(|img| {
                img.status != ImageStatus::Done || !img.url.is_empty()
            });
            prop_assert!(done_images_have_urls);
        }
    }
}
