//! End-to-end runs against a mock generation service over HTTP

use std::sync::Arc;

use mockito::Matcher;
use notegen::error::ApiError;
use notegen::history::HttpHistoryRepository;
use notegen::orchestrator::{GenerationOrchestrator, NoopObserver, RunOutcome, NOT_GENERATED};
use notegen::service::{HttpGenerationService, ServiceConfig};
use notegen::store::{GenerationStateStore, MemorySnapshotStorage};
use notegen::types::{ImageStatus, PageType, ProgressStatus, Stage};
use serde_json::json;

const OUTLINE: &str = "[封面] Tea basics\n\n<page>\n\n[内容] Water temperature\n\n<page>\n\n[总结] Enjoy";

fn config_for(server: &mockito::ServerGuard) -> ServiceConfig {
    ServiceConfig {
        base_url: server.url(),
        ..ServiceConfig::default()
    }
}

fn orchestrator_for(server: &mockito::ServerGuard) -> GenerationOrchestrator {
    let config = config_for(server);
    let service = Arc::new(HttpGenerationService::new(config.clone()).unwrap());
    let history = Arc::new(HttpHistoryRepository::new(config.clone()).unwrap());
    GenerationOrchestrator::from_config(service, Some(history), &config)
}

fn record(event: &str, data: serde_json::Value) -> String {
    format!("event: {}\ndata: {}\n\n", event, data)
}

fn empty_store() -> GenerationStateStore {
    GenerationStateStore::open(Arc::new(MemorySnapshotStorage::new()))
}

#[tokio::test]
async fn test_outline_generate_and_retry_failed_page() {
    let mut server = mockito::Server::new_async().await;
    let outline_mock = server
        .mock("POST", "/api/ai/outline")
        .match_body(Matcher::PartialJson(json!({"topic": "tea"})))
        .with_body(json!({"success": true, "outline": OUTLINE}).to_string())
        .create_async()
        .await;
    let create_mock = server
        .mock("POST", "/api/ai/history")
        .with_body(r#"{"success":true,"record_id":"rec1"}"#)
        .create_async()
        .await;

    let body = [
        record("progress", json!({"index": 0, "status": "generating", "current": 1, "total": 3, "phase": "cover"})),
        record("complete", json!({"index": 0, "status": "done", "image_url": "/api/ai/images/task_1/0.png"})),
        record("progress", json!({"status": "batch_start", "phase": "content"})),
        record("error", json!({"index": 1, "status": "error", "message": "content blocked"})),
        record("complete", json!({"index": 2, "status": "done", "image_url": "/api/ai/images/task_1/2.png"})),
        record("finish", json!({
            "success": false,
            "task_id": "task_1",
            "images": ["0.png", "2.png"],
            "total": 3,
            "completed": 2,
            "failed": 1,
            "failed_indices": [1]
        })),
    ]
    .concat();
    let generate_mock = server
        .mock("POST", "/api/ai/generate")
        .match_body(Matcher::PartialJson(json!({"task_id": null, "user_topic": "tea"})))
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;
    let partial_mock = server
        .mock("PUT", "/api/ai/history/rec1")
        .match_body(Matcher::PartialJson(json!({
            "status": "partial",
            "images": {"task_id": "task_1", "generated": ["0.png", "2.png"]}
        })))
        .with_body(r#"{"success":true}"#)
        .create_async()
        .await;
    let regenerate_mock = server
        .mock("POST", "/api/ai/regenerate")
        .match_body(Matcher::PartialJson(json!({
            "task_id": "task_1",
            "use_reference": true,
            "page": {"index": 1}
        })))
        .with_body(r#"{"success":true,"index":1,"image_url":"/api/ai/images/task_1/1.png"}"#)
        .create_async()
        .await;
    let completed_mock = server
        .mock("PUT", "/api/ai/history/rec1")
        .match_body(Matcher::PartialJson(json!({
            "status": "completed",
            "thumbnail": "0.png"
        })))
        .with_body(r#"{"success":true}"#)
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    let mut store = empty_store();

    orchestrator.create_outline(&mut store, "tea").await.unwrap();
    outline_mock.assert_async().await;
    create_mock.assert_async().await;
    assert_eq!(store.stage(), Stage::Outline);
    assert_eq!(store.record_id(), Some("rec1"));
    assert_eq!(store.pages().len(), 3);
    assert_eq!(store.pages()[2].page_type, PageType::Summary);

    let outcome = orchestrator
        .generate(&mut store, &mut NoopObserver)
        .await
        .unwrap();
    generate_mock.assert_async().await;
    partial_mock.assert_async().await;
    assert!(outcome.is_finished());
    assert_eq!(store.stage(), Stage::Result);
    assert_eq!(store.task_id(), Some("task_1"));
    assert_eq!(store.completed_count(), 2);
    assert_eq!(store.image(1).unwrap().error.as_deref(), Some("content blocked"));
    assert_eq!(store.progress().status, ProgressStatus::Done);

    let summary = orchestrator.retry_failed(&mut store, true).await.unwrap();
    regenerate_mock.assert_async().await;
    completed_mock.assert_async().await;
    assert_eq!(summary.succeeded, vec![1]);
    assert!(summary.failed.is_empty());
    assert!(!store.has_failed_images());
    let retried = store.image(1).unwrap();
    assert_eq!(retried.status, ImageStatus::Done);
    assert!(retried.url.starts_with("/api/ai/images/task_1/1.png"));
    assert_eq!(store.progress_percent(), 100.0);
}

#[tokio::test]
async fn test_stream_without_finish_stalls() {
    let mut server = mockito::Server::new_async().await;
    let body = [
        record("complete", json!({"index": 0, "status": "done", "image_url": "/api/ai/images/t/0.png"})),
        record("progress", json!({"index": 1, "status": "generating"})),
    ]
    .concat();
    let _mock = server
        .mock("POST", "/api/ai/generate")
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let config = config_for(&server);
    let orchestrator = GenerationOrchestrator::new(Arc::new(HttpGenerationService::new(config).unwrap()));
    let mut store = empty_store();
    store.set_outline("a\n\n<page>\n\nb", notegen::store::parse_outline("a\n\n<page>\n\nb"));

    let outcome = orchestrator
        .generate(&mut store, &mut NoopObserver)
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        RunOutcome::Stalled {
            completed: 1,
            failed: 0,
            pending: 1
        }
    ));
    assert_eq!(store.stage(), Stage::Generating);
    assert_eq!(store.image(1).unwrap().status, ImageStatus::Generating);
}

#[tokio::test]
async fn test_rejected_stream_marks_run_failed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/ai/generate")
        .with_status(500)
        .with_body(r#"{"success":false,"error":"generator offline"}"#)
        .create_async()
        .await;

    let config = config_for(&server);
    let orchestrator = GenerationOrchestrator::new(Arc::new(HttpGenerationService::new(config).unwrap()));
    let mut store = empty_store();
    store.set_outline("only", notegen::store::parse_outline("only"));

    let outcome = orchestrator
        .generate(&mut store, &mut NoopObserver)
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::StreamFailed(_)));
    assert_eq!(store.progress().status, ProgressStatus::Error);
    assert!(!store.is_generating());
}

#[tokio::test]
async fn test_load_history_record_supersedes_task() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/ai/history/rec9")
        .with_body(
            json!({
                "success": true,
                "record": {
                    "id": "rec9",
                    "title": "Coffee",
                    "created_at": "2024-03-01T10:00:00",
                    "updated_at": "2024-03-01T10:05:00",
                    "outline": {
                        "raw": "beans\n\n<page>\n\nroast",
                        "pages": [
                            {"index": 0, "type": "cover", "content": "beans"},
                            {"index": 1, "type": "content", "content": "roast"}
                        ]
                    },
                    "images": {"task_id": "task_9", "generated": ["0.png"]},
                    "status": "partial",
                    "thumbnail": "0.png"
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    let mut store = empty_store();
    store.set_topic("tea");

    orchestrator
        .load_history_record(&mut store, "rec9")
        .await
        .unwrap();

    assert_eq!(store.stage(), Stage::Result);
    assert_eq!(store.topic(), "Coffee");
    assert_eq!(store.task_id(), Some("task_9"));
    assert_eq!(store.record_id(), Some("rec9"));
    let cover = store.image(0).unwrap();
    assert_eq!(cover.status, ImageStatus::Done);
    assert_eq!(
        cover.url,
        format!("{}/api/ai/images/task_9/0.png?thumbnail=false", server.url())
    );
    assert_eq!(store.image(1).unwrap().error.as_deref(), Some(NOT_GENERATED));
    assert_eq!(store.progress().current, 1);
}

#[tokio::test]
async fn test_missing_history_record() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/ai/history/gone")
        .with_status(404)
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    let mut store = empty_store();
    let result = orchestrator.load_history_record(&mut store, "gone").await;
    assert!(matches!(result, Err(ApiError::HistoryRecordNotFound(_))));
    assert_eq!(store.stage(), Stage::Input);
}
