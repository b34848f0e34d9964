//! API integration tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use shotline_api::{create_router, ApiConfig, AppState};
use shotline_continuity::ContinuityStore;
use shotline_models::{ContinuityDocument, SceneId, VideoId};
use shotline_sync::{ContinuityPersistence, DebounceConfig, SyncResult, SyncWorker};

// =============================================================================
// Helpers
// =============================================================================

#[derive(Default)]
struct MemoryPersistence {
    documents: Mutex<Vec<(VideoId, ContinuityDocument)>>,
}

impl MemoryPersistence {
    fn latest(&self, video_id: &VideoId) -> Option<ContinuityDocument> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(id, _)| id == video_id)
            .map(|(_, doc)| doc.clone())
    }

    fn save_count(&self) -> usize {
        self.documents.lock().unwrap().len()
    }
}

#[async_trait]
impl ContinuityPersistence for MemoryPersistence {
    async fn save(&self, video_id: &VideoId, document: &ContinuityDocument) -> SyncResult<()> {
        self.documents
            .lock()
            .unwrap()
            .push((video_id.clone(), document.clone()));
        Ok(())
    }

    async fn load(&self, video_id: &VideoId) -> SyncResult<Option<ContinuityDocument>> {
        Ok(self.latest(video_id))
    }
}

fn create_test_router() -> Router {
    let state = AppState::new(ApiConfig::default(), Arc::new(ContinuityStore::new()));
    create_router(state, None)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn shots_body(video_id: &str, scene_id: &str, count: usize) -> Value {
    let shots: Vec<Value> = (1..=count)
        .map(|i| json!({ "id": format!("s{}", i), "sceneId": scene_id, "position": i }))
        .collect();
    json!({ "videoId": video_id, "shots": shots })
}

/// Shot id runs of the view's groups with the given status.
fn runs(view: &Value, status: &str) -> Vec<Vec<String>> {
    view["groups"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|g| g["status"] == status)
        .map(|g| {
            g["shotIds"]
                .as_array()
                .unwrap()
                .iter()
                .map(|s| s.as_str().unwrap().to_string())
                .collect()
        })
        .collect()
}

fn run(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

/// Register four shots and a single proposed group over all of them.
async fn seed_scene(app: &Router) {
    let (status, _) = send(app, Method::PUT, "/api/scenes/sc1/shots", Some(shots_body("v1", "sc1", 4))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app,
        Method::POST,
        "/api/scenes/sc1/continuity/breakdown",
        Some(json!({ "drafts": [{ "shotIds": ["s1", "s2", "s3", "s4"] }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(runs(&body["view"], "proposed"), vec![run(&["s1", "s2", "s3", "s4"])]);
}

// =============================================================================
// Ambient
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_router();

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = send(&app, Method::GET, "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_route_absent_when_disabled() {
    let app = create_test_router();
    let (status, _) = send(&app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let app = create_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("X-Request-ID", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "req-123");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
}

// =============================================================================
// Continuity
// =============================================================================

#[tokio::test]
async fn test_unknown_scene_is_not_found() {
    let app = create_test_router();

    let (status, body) = send(&app, Method::GET, "/api/scenes/missing/continuity", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "scene_not_found");
}

#[tokio::test]
async fn test_split_then_decline_over_http() {
    let app = create_test_router();
    seed_scene(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/scenes/sc1/connections/approve",
        Some(json!({ "shotA": "s1", "shotB": "s2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], true);
    assert_eq!(runs(&body["view"], "approved"), vec![run(&["s1", "s2"])]);
    assert_eq!(runs(&body["view"], "proposed"), vec![run(&["s2", "s3", "s4"])]);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/scenes/sc1/connections/decline",
        Some(json!({ "shotA": "s3", "shotB": "s4" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(runs(&body["view"], "proposed"), vec![run(&["s2", "s3"])]);

    let (status, view) = send(&app, Method::GET, "/api/scenes/sc1/continuity", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view, body["view"]);
}

#[tokio::test]
async fn test_non_adjacent_connection_is_silently_rejected() {
    let app = create_test_router();
    seed_scene(&app).await;

    let (_, before) = send(&app, Method::GET, "/api/scenes/sc1/continuity", None).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/scenes/sc1/connections/approve",
        Some(json!({ "shotA": "s1", "shotB": "s3" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], false);
    assert_eq!(body["view"], before);
}

#[tokio::test]
async fn test_group_approve_and_unknown_group() {
    let app = create_test_router();
    seed_scene(&app).await;

    let (_, view) = send(&app, Method::GET, "/api/scenes/sc1/continuity", None).await;
    let group_id = view["groups"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/scenes/sc1/groups/{}/approve", group_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(runs(&body["view"], "approved"), vec![run(&["s1", "s2", "s3", "s4"])]);

    let (status, body) = send(&app, Method::POST, "/api/scenes/sc1/groups/nope/decline", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "group_not_found");
}

#[tokio::test]
async fn test_edit_group_validation() {
    let app = create_test_router();
    seed_scene(&app).await;

    let (_, view) = send(&app, Method::GET, "/api/scenes/sc1/continuity", None).await;
    let group_id = view["groups"][0]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/scenes/sc1/groups/{}", group_id);

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "status": "proposed", "shotIds": ["s1"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "status": "proposed", "shotIds": ["s1", "s2"], "description": "walk in" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(runs(&body["view"], "proposed"), vec![run(&["s1", "s2"])]);
    assert_eq!(body["view"]["groups"][0]["description"], "walk in");
}

#[tokio::test]
async fn test_lock_gates_edits() {
    let app = create_test_router();
    seed_scene(&app).await;

    let (status, body) = send(&app, Method::POST, "/api/scenes/sc1/lock", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "no_approved_groups");

    send(
        &app,
        Method::POST,
        "/api/scenes/sc1/connections/approve",
        Some(json!({ "shotA": "s1", "shotB": "s2" })),
    )
    .await;

    let (status, body) = send(&app, Method::POST, "/api/scenes/sc1/lock", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["view"]["locked"], true);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/scenes/sc1/connections/decline",
        Some(json!({ "shotA": "s1", "shotB": "s2" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "locked");

    let (status, body) = send(&app, Method::DELETE, "/api/scenes/sc1/lock", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["view"]["locked"], false);
}

#[tokio::test]
async fn test_migrate_legacy_links() {
    let app = create_test_router();

    let flags = [false, true, true, false];
    let shots: Vec<Value> = flags
        .iter()
        .enumerate()
        .map(|(i, linked)| {
            json!({
                "id": format!("s{}", i + 1),
                "sceneId": "sc1",
                "position": i,
                "isLinkedToPrevious": linked,
            })
        })
        .collect();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/scenes/sc1/continuity/migrate",
        Some(json!({ "videoId": "v1", "shots": shots, "mode": "committed" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        runs(&body["view"], "approved"),
        vec![run(&["s1", "s2"]), run(&["s2", "s3"])]
    );
}

#[tokio::test]
async fn test_shots_from_another_scene_are_rejected() {
    let app = create_test_router();

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/scenes/sc1/shots",
        Some(shots_body("v1", "sc2", 2)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_reload_without_persistence_is_unavailable() {
    let app = create_test_router();

    let (status, body) = send(&app, Method::POST, "/api/videos/v1/continuity/reload", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "persistence_disabled");
}

#[tokio::test]
async fn test_applied_edits_are_saved_and_reloaded() {
    let store = Arc::new(ContinuityStore::new());
    let persistence = Arc::new(MemoryPersistence::default());
    let (handle, worker) = SyncWorker::new(
        store.clone(),
        persistence.clone(),
        DebounceConfig {
            debounce: Duration::from_millis(10),
            reschedule: Duration::from_millis(10),
        },
    )
    .spawn();
    let state = AppState::new(ApiConfig::default(), store.clone())
        .with_persistence(handle, persistence.clone());
    let app = create_router(state, None);

    seed_scene(&app).await;
    send(
        &app,
        Method::POST,
        "/api/scenes/sc1/connections/approve",
        Some(json!({ "shotA": "s1", "shotB": "s2" })),
    )
    .await;
    let (_, saved_view) = send(&app, Method::GET, "/api/scenes/sc1/continuity", None).await;

    // Drop the proposed remainder, then restore it from the saved document
    send(
        &app,
        Method::POST,
        "/api/scenes/sc1/continuity/breakdown",
        Some(json!({ "drafts": [] })),
    )
    .await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    let wiped = persistence.latest(&"v1".into()).unwrap();
    assert_eq!(wiped.continuity_groups[&SceneId::from("sc1")].len(), 1);

    let restored = ContinuityDocument {
        continuity_groups: [(
            SceneId::from("sc1"),
            serde_json::from_value(saved_view["groups"].clone()).unwrap(),
        )]
        .into_iter()
        .collect(),
        locked: false,
    };
    persistence.save(&"v1".into(), &restored).await.unwrap();

    let (status, body) = send(&app, Method::POST, "/api/videos/v1/continuity/reload", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], true);
    assert_eq!(body["scenes"], json!(["sc1"]));

    let (_, view) = send(&app, Method::GET, "/api/scenes/sc1/continuity", None).await;
    assert_eq!(view, saved_view);

    drop(app);
    worker.await.unwrap();
    assert!(persistence.save_count() >= 2);
}
