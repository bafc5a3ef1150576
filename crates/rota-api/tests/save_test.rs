//! Integration tests for duty-schedule submission.
//!
//! Drives the full pipeline behind a valid principal: payload rejections,
//! the unconfigured-storage error, backend failure, and the success path
//! with a deterministic clock and an in-memory store double.

use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
    time::{Duration, UNIX_EPOCH},
};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use rota_api::{create_router, AppState};
use rota_core::{CoreError, ScheduleEntry, ScheduleStore, TestClock, SCHEDULE_PARTITION};
use serde_json::{json, Value};
use tower::ServiceExt;

/// In-memory store recording created entries.
#[derive(Default)]
struct MemoryStore {
    entries: Mutex<Vec<ScheduleEntry>>,
}

impl MemoryStore {
    fn entries(&self) -> Vec<ScheduleEntry> {
        self.entries.lock().expect("store lock").clone()
    }
}

impl ScheduleStore for MemoryStore {
    fn create_entry(
        &self,
        entry: ScheduleEntry,
    ) -> Pin<Box<dyn Future<Output = rota_core::Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.entries.lock().expect("store lock").push(entry);
            Ok(())
        })
    }
}

/// Store double that fails every write.
struct FailingStore;

impl ScheduleStore for FailingStore {
    fn create_entry(
        &self,
        _entry: ScheduleEntry,
    ) -> Pin<Box<dyn Future<Output = rota_core::Result<()>> + Send + '_>> {
        Box::pin(async { Err(CoreError::Database("connection reset".to_string())) })
    }
}

fn test_app(store: Option<Arc<dyn ScheduleStore>>, clock: TestClock) -> Router {
    create_router(AppState::new(store, None, Arc::new(clock)))
}

fn aad_header(user_details: &str, user_id: &str) -> String {
    STANDARD.encode(
        json!({
            "identityProvider": "aad",
            "userId": user_id,
            "userDetails": user_details,
            "userRoles": ["authenticated"],
            "claims": []
        })
        .to_string(),
    )
}

fn save_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/duties")
        .header("content-type", "application/json")
        .header("x-ms-client-principal", aad_header("user@example.com", "abc123"))
        .body(Body::from(body.to_string()))
        .expect("request build")
}

async fn response_json(response: axum::response::Response) -> Value {
    let body =
        axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body extraction");
    serde_json::from_slice(&body).expect("json deserialization")
}

#[tokio::test]
async fn invalid_json_body_is_rejected() {
    let store = Arc::new(MemoryStore::default());
    let app = test_app(Some(store.clone()), TestClock::new());

    let response = app.oneshot(save_request("{not json")).await.expect("request execution");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Bad Request: Invalid JSON body");
    assert!(store.entries().is_empty());
}

#[tokio::test]
async fn missing_empty_or_non_array_duties_are_rejected() {
    let bodies = [
        json!({}),
        json!({"schedule": []}),
        json!({"duties": "d1"}),
        json!({"duties": []}),
    ];

    for payload in bodies {
        let store = Arc::new(MemoryStore::default());
        let app = test_app(Some(store.clone()), TestClock::new());

        let response =
            app.oneshot(save_request(&payload.to_string())).await.expect("request execution");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "payload: {payload}");
        let body = response_json(response).await;
        assert_eq!(body["error"], "Bad Request: duties must be a non-empty array");
        assert!(store.entries().is_empty());
    }
}

#[tokio::test]
async fn one_malformed_duty_rejects_the_whole_batch() {
    let payload = json!({"duties": [
        {"id": "d1", "day": "2026-08-03", "member": "alice"},
        {"id": "d2", "day": "2026-08-04", "member": 42},
    ]});

    let store = Arc::new(MemoryStore::default());
    let app = test_app(Some(store.clone()), TestClock::new());

    let response =
        app.oneshot(save_request(&payload.to_string())).await.expect("request execution");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Bad Request: each duty must have id, day, member as strings");
    assert!(store.entries().is_empty(), "no entries may be persisted for a rejected batch");
}

#[tokio::test]
async fn unconfigured_storage_is_a_server_error() {
    let app = test_app(None, TestClock::new());
    let payload = json!({"duties": [{"id": "d1", "day": "mon", "member": "alice"}]});

    let response =
        app.oneshot(save_request(&payload.to_string())).await.expect("request execution");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Server configuration error: DATABASE_URL not set");
}

#[tokio::test]
async fn backend_failure_is_reported_opaquely() {
    let app = test_app(Some(Arc::new(FailingStore)), TestClock::new());
    let payload = json!({"duties": [{"id": "d1", "day": "mon", "member": "alice"}]});

    let response =
        app.oneshot(save_request(&payload.to_string())).await.expect("request execution");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn valid_submission_persists_one_entry() {
    let start = UNIX_EPOCH + Duration::from_millis(1_754_000_000_123);
    let clock = TestClock::with_start_time(start);
    let store = Arc::new(MemoryStore::default());
    let app = test_app(Some(store.clone()), clock);

    let duties = json!([
        {"id": "d1", "day": "2026-08-03", "member": "alice", "note": "swap with bob"},
        {"id": "d2", "day": "2026-08-04", "member": "bob"},
    ]);
    let payload = json!({ "duties": duties.clone() });

    let response =
        app.oneshot(save_request(&payload.to_string())).await.expect("request execution");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);

    let expected_saved_at = DateTime::<Utc>::from(start);
    let saved_at = DateTime::parse_from_rfc3339(body["savedAt"].as_str().expect("savedAt string"))
        .expect("savedAt parses")
        .with_timezone(&Utc);
    assert_eq!(saved_at, expected_saved_at);

    let entries = store.entries();
    assert_eq!(entries.len(), 1, "exactly one persistence write");

    let entry = &entries[0];
    assert_eq!(entry.id, "1754000000123");
    assert_eq!(entry.partition_key, SCHEDULE_PARTITION);
    assert_eq!(entry.saved_by, "user@example.com");
    assert_eq!(entry.saved_at, expected_saved_at);

    // The persisted JSON is the submitted batch, extra fields included.
    let persisted: Value = serde_json::from_str(&entry.duties_json).expect("duties_json parses");
    assert_eq!(persisted, duties);
}

#[tokio::test]
async fn saved_by_falls_back_to_user_id_then_sentinel() {
    for (user_details, user_id, expected) in
        [("", "abc123", "abc123"), ("", "", "unknown")]
    {
        let store = Arc::new(MemoryStore::default());
        let app = test_app(Some(store.clone()), TestClock::new());

        let request = Request::builder()
            .method("POST")
            .uri("/api/duties")
            .header("content-type", "application/json")
            .header("x-ms-client-principal", aad_header(user_details, user_id))
            .body(Body::from(
                json!({"duties": [{"id": "d1", "day": "mon", "member": "alice"}]}).to_string(),
            ))
            .expect("request build");

        let response = app.oneshot(request).await.expect("request execution");
        assert_eq!(response.status(), StatusCode::OK);

        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].saved_by, expected);
    }
}
