//! Integration tests for vpr-server API endpoints
//!
//! Tests cover:
//! - Liveness, health and UI routes
//! - Login (multipart and urlencoded), next task, quotas
//! - Upload validation order and progress advancement
//! - A complete session through to the completion message
//! - Admin export endpoints

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`
use vpr_common::catalog::CatalogItem;
use vpr_common::model::LanguageQuotas;
use vpr_common::{Catalog, Language, Quotas, TaskSequencer};
use vpr_server::db::{self, recordings};
use vpr_server::{build_router, AppState, HttpOptions, RecordingStore};

const BOUNDARY: &str = "vpr-test-boundary";

struct TestApp {
    // Held so the database and recordings outlive the test
    _dir: TempDir,
    app: Router,
    state: AppState,
}

fn items(prefix: &str, n: usize) -> Vec<CatalogItem> {
    (0..n)
        .map(|i| CatalogItem {
            item_id: format!("{}{}", prefix, i),
            secret_text: format!("secret {}{}", prefix, i),
            question_for_secret: format!("question {}{}", prefix, i),
        })
        .collect()
}

fn small_quotas() -> Quotas {
    let q = LanguageQuotas {
        nobody: 0,
        onlyme: 0,
        pairs: 2,
        extra_questions: 1,
    };
    Quotas { zh: q, en: q }
}

async fn setup_with(http: HttpOptions) -> TestApp {
    let dir = TempDir::new().unwrap();
    let pool = db::init_database(&dir.path().join("db.sqlite3")).await.unwrap();

    let catalog = Catalog::new()
        .with_items(Language::Zh, items("z", 5))
        .with_items(Language::En, items("e", 5));
    let sequencer = TaskSequencer::new(catalog, small_quotas()).unwrap();
    let store = RecordingStore::new(dir.path().join("recordings")).unwrap();

    let state = AppState::new(pool, sequencer, store);
    let app = build_router(state.clone(), &http);

    TestApp {
        _dir: dir,
        app,
        state,
    }
}

async fn setup() -> TestApp {
    setup_with(HttpOptions::default()).await
}

fn multipart_body(fields: &[(&str, &str)], audio: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = audio {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"{}\"\r\nContent-Type: audio/webm\r\n\r\n",
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn login(app: &Router, username: &str) -> (StatusCode, Value) {
    send(
        app,
        multipart_request("/api/login", multipart_body(&[("username", username)], None)),
    )
    .await
}

async fn next_task(app: &Router, username: &str) -> (StatusCode, Value) {
    send(app, get(&format!("/api/next_task?username={}", username))).await
}

async fn upload(
    app: &Router,
    username: &str,
    language: &str,
    task_type: &str,
    role: &str,
    item_id: &str,
    audio: &[u8],
) -> (StatusCode, Value) {
    let body = multipart_body(
        &[
            ("username", username),
            ("language", language),
            ("task_type", task_type),
            ("role", role),
            ("item_id", item_id),
        ],
        Some(("recording.webm", audio)),
    );
    send(app, multipart_request("/api/upload_recording", body)).await
}

/// Upload whatever task the server currently expects
async fn upload_current(app: &Router, username: &str) -> (StatusCode, Value) {
    let (_, next) = next_task(app, username).await;
    let task = &next["task"];
    upload(
        app,
        username,
        task["language"].as_str().unwrap(),
        task["task_type"].as_str().unwrap(),
        task["role"].as_str().unwrap(),
        task["item_id"].as_str().unwrap(),
        b"fake-webm-bytes",
    )
    .await
}

fn stored_files(test: &TestApp) -> usize {
    std::fs::read_dir(test.state.store.root()).unwrap().count()
}

// =============================================================================
// Liveness / Health / UI
// =============================================================================

#[tokio::test]
async fn test_liveness_and_health() {
    let test = setup().await;

    let (status, body) = send(&test.app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());

    let (status, body) = send(&test.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["module"], "vpr-server");
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_ui_routes_serve_assets() {
    let test = setup().await;

    let response = test.app.clone().oneshot(get("/app")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.contains("text/html"));

    let response = test.app.clone().oneshot(get("/static/app.js")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/javascript");

    let response = test.app.clone().oneshot(get("/static/app.css")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Login / Next task / Quotas
// =============================================================================

#[tokio::test]
async fn test_login_creates_user_with_zero_progress() {
    let test = setup().await;

    let (status, body) = login(&test.app, "  alice  ").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["progress"]["zh_pairs_done"], 0);
    assert_eq!(body["progress"]["en_extra_questions_done"], 0);
    assert_eq!(body["progress"]["zh_nobody_done"], 0);
    assert!(body["progress"]["zh_pending_question"].is_null());

    // Second login returns the same user
    let (status, body) = login(&test.app, "alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn test_login_accepts_urlencoded_form() {
    let test = setup().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=bob"))
        .unwrap();
    let (status, body) = send(&test.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "bob");
}

#[tokio::test]
async fn test_login_rejects_empty_username() {
    let test = setup().await;

    let (status, body) = login(&test.app, "   ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Username cannot be empty");

    let request = Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("other=1"))
        .unwrap();
    let (status, body) = send(&test.app, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"], "Field 'username' is required");
}

#[tokio::test]
async fn test_next_task_requires_known_user() {
    let test = setup().await;

    let (status, _) = send(&test.app, get("/api/next_task")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = next_task(&test.app, "ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "User not found. Please login first.");
}

#[tokio::test]
async fn test_first_task_is_zh_secret() {
    let test = setup().await;
    login(&test.app, "alice").await;

    let (status, body) = next_task(&test.app, "alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"]["language"], "zh");
    assert_eq!(body["task"]["task_type"], "pair");
    assert_eq!(body["task"]["role"], "secret");
    assert_eq!(body["task"]["item_id"], "z0");
    assert_eq!(body["task"]["text"], "secret z0");
    assert!(body.get("message").is_none());

    // Asking again without an upload returns the same task
    let (_, again) = next_task(&test.app, "alice").await;
    assert_eq!(again["task"], body["task"]);
}

#[tokio::test]
async fn test_quotas_endpoint() {
    let test = setup().await;

    let (status, body) = send(&test.app, get("/api/quotas")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["zh_pairs"], 2);
    assert_eq!(body["en_extra_questions"], 1);
    assert_eq!(body["zh_nobody"], 0);
    assert_eq!(body["total"], 6);
}

// =============================================================================
// Upload
// =============================================================================

#[tokio::test]
async fn test_secret_upload_sets_pending_question() {
    let test = setup().await;
    login(&test.app, "alice").await;

    let (status, body) = upload(&test.app, "alice", "zh", "pair", "secret", "z0", b"audio").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "Recording uploaded successfully");
    assert_eq!(body["progress"]["zh_pairs_done"], 0);
    assert_eq!(body["progress"]["zh_pending_question"], "z0");

    let filename = body["filename"].as_str().unwrap();
    assert!(filename.starts_with("user-alice__lang-zh__type-pair__role-secret__item-z0__ts-"));
    assert!(filename.ends_with(".webm"));
    let stored = std::fs::read(body["file_path"].as_str().unwrap()).unwrap();
    assert_eq!(stored, b"audio");

    let (_, next) = next_task(&test.app, "alice").await;
    assert_eq!(next["task"]["role"], "question");
    assert_eq!(next["task"]["item_id"], "z0");
    assert_eq!(next["task"]["text"], "question z0");

    let (status, body) =
        upload(&test.app, "alice", "zh", "pair", "question", "z0", b"audio").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["progress"]["zh_pairs_done"], 1);
    assert!(body["progress"]["zh_pending_question"].is_null());
}

#[tokio::test]
async fn test_upload_missing_field_is_422() {
    let test = setup().await;
    login(&test.app, "alice").await;

    let body = multipart_body(
        &[("username", "alice"), ("language", "zh"), ("task_type", "pair")],
        Some(("recording.webm", b"audio")),
    );
    let (status, _) = send(&test.app, multipart_request("/api/upload_recording", body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let body = multipart_body(
        &[
            ("username", "alice"),
            ("language", "zh"),
            ("task_type", "pair"),
            ("role", "secret"),
            ("item_id", "z0"),
        ],
        None,
    );
    let (status, _) = send(&test.app, multipart_request("/api/upload_recording", body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_upload_validation_order() {
    let test = setup().await;

    // Unknown user wins over a bad language value
    let (status, body) = upload(&test.app, "ghost", "fr", "pair", "secret", "z0", b"a").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "User not found");

    login(&test.app, "alice").await;

    let (status, body) = upload(&test.app, "alice", "fr", "pair", "secret", "z0", b"a").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Language must be 'zh' or 'en'");

    let (status, _) = upload(&test.app, "alice", "zh", "bogus", "secret", "z0", b"a").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = upload(&test.app, "alice", "zh", "pair", "bogus", "z0", b"a").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown item wins over empty audio
    let (status, body) = upload(&test.app, "alice", "zh", "pair", "secret", "nope", b"").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Item nope not found in zh data");

    // Empty audio wins over a task mismatch
    let (status, body) = upload(&test.app, "alice", "zh", "pair", "question", "z3", b"").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Audio file is empty");

    assert_eq!(stored_files(&test), 0);
}

#[tokio::test]
async fn test_mismatched_upload_is_conflict_and_changes_nothing() {
    let test = setup().await;
    login(&test.app, "alice").await;

    let (status, _) = upload(&test.app, "alice", "zh", "pair", "question", "z0", b"a").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = upload(&test.app, "alice", "en", "pair", "secret", "e0", b"a").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, next) = next_task(&test.app, "alice").await;
    assert_eq!(next["task"]["item_id"], "z0");
    assert_eq!(next["task"]["role"], "secret");
    assert!(next["progress"]["zh_pending_question"].is_null());

    assert_eq!(stored_files(&test), 0);
    assert_eq!(recordings::count_for_user(&test.state.db, "alice").await.unwrap(), 0);
}

#[tokio::test]
async fn test_replayed_secret_upload_is_rejected() {
    let test = setup().await;
    login(&test.app, "alice").await;

    let (status, _) = upload(&test.app, "alice", "zh", "pair", "secret", "z0", b"a").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = upload(&test.app, "alice", "zh", "pair", "secret", "z0", b"a").await;
    assert_eq!(status, StatusCode::CONFLICT);

    assert_eq!(recordings::count_for_user(&test.state.db, "alice").await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_uploads_accept_exactly_one() {
    let test = setup().await;

    for round in 0..5 {
        let username = format!("double-click-{}", round);
        login(&test.app, &username).await;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let app = test.app.clone();
                let username = username.clone();
                tokio::spawn(async move {
                    upload(&app, &username, "zh", "pair", "secret", "z0", b"take").await
                })
            })
            .collect();

        let mut statuses = Vec::new();
        for handle in handles {
            statuses.push(handle.await.unwrap().0);
        }
        let accepted = statuses.iter().filter(|s| **s == StatusCode::OK).count();
        let conflicts = statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count();
        assert_eq!((accepted, conflicts), (1, 3), "round {}: {:?}", round, statuses);

        let (_, next) = next_task(&test.app, &username).await;
        assert_eq!(next["progress"]["zh_pending_question"], "z0");
        assert_eq!(next["progress"]["zh_pairs_done"], 0);
        assert_eq!(
            recordings::count_for_user(&test.state.db, &username).await.unwrap(),
            1
        );
    }

    // Every committed row points at its own, intact file
    let rows = recordings::list_recordings(&test.state.db).await.unwrap();
    assert_eq!(rows.len(), 5);
    for row in &rows {
        assert_eq!(std::fs::read(&row.file_path).unwrap(), b"take");
    }
    assert_eq!(stored_files(&test), 5);
}

#[tokio::test]
async fn test_failed_commit_removes_blob_and_keeps_progress() {
    let test = setup().await;
    login(&test.app, "alice").await;

    sqlx::query(
        "CREATE TRIGGER reject_recordings BEFORE INSERT ON recordings \
         BEGIN SELECT RAISE(ABORT, 'recordings table is read-only'); END",
    )
    .execute(&test.state.db)
    .await
    .unwrap();

    let (status, _) = upload(&test.app, "alice", "zh", "pair", "secret", "z0", b"a").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(stored_files(&test), 0);

    let (_, next) = next_task(&test.app, "alice").await;
    assert_eq!(next["task"]["role"], "secret");
    assert!(next["progress"]["zh_pending_question"].is_null());

    // Once the database accepts inserts again the same task goes through
    sqlx::query("DROP TRIGGER reject_recordings")
        .execute(&test.state.db)
        .await
        .unwrap();
    let (status, body) = upload(&test.app, "alice", "zh", "pair", "secret", "z0", b"a").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(std::fs::read(body["file_path"].as_str().unwrap()).unwrap(), b"a");
    assert_eq!(stored_files(&test), 1);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let test = setup_with(HttpOptions {
        max_upload_bytes: 1024,
        ..Default::default()
    })
    .await;
    login(&test.app, "alice").await;

    let big = vec![7u8; 8 * 1024];
    let (status, _) = upload(&test.app, "alice", "zh", "pair", "secret", "z0", &big).await;
    assert!(status.is_client_error());
    assert_eq!(stored_files(&test), 0);
}

// =============================================================================
// Full session
// =============================================================================

#[tokio::test]
async fn test_full_session_reaches_completion() {
    let test = setup().await;
    login(&test.app, "alice").await;

    let mut uploads = 0;
    loop {
        let (status, next) = next_task(&test.app, "alice").await;
        assert_eq!(status, StatusCode::OK);
        if next["task"].is_null() {
            assert_eq!(
                next["message"],
                "All tasks completed! Thank you for your participation."
            );
            let p = &next["progress"];
            assert_eq!(p["zh_pairs_done"], 2);
            assert_eq!(p["zh_extra_questions_done"], 1);
            assert_eq!(p["en_pairs_done"], 2);
            assert_eq!(p["en_extra_questions_done"], 1);
            break;
        }

        let (status, _) = upload_current(&test.app, "alice").await;
        assert_eq!(status, StatusCode::OK);
        uploads += 1;
        assert!(uploads <= 10, "session did not complete");
    }

    // Two recordings per pair plus one per extra question, per language
    assert_eq!(uploads, 10);
    assert_eq!(stored_files(&test), 10);

    // Anything further conflicts
    let (status, _) = upload(&test.app, "alice", "en", "extra_question", "question", "e2", b"a").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// =============================================================================
// Admin
// =============================================================================

#[tokio::test]
async fn test_admin_exports() {
    let test = setup().await;
    login(&test.app, "bob").await;
    login(&test.app, "alice").await;
    upload_current(&test.app, "alice").await;
    upload_current(&test.app, "alice").await;

    let (status, body) = send(&test.app, get("/api/admin/export_metadata")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_recordings"], 2);
    let recordings = body["recordings"].as_array().unwrap();
    assert_eq!(recordings[0]["role"], "secret");
    assert_eq!(recordings[1]["role"], "question");
    assert_eq!(recordings[0]["item_id"], "z0");
    assert_eq!(recordings[0]["username"], "alice");
    assert!(recordings[0]["size_bytes"].as_i64().unwrap() > 0);

    let (status, body) = send(&test.app, get("/api/admin/user_stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_users"], 2);
    let users = body["users"].as_array().unwrap();
    assert_eq!(users[0]["username"], "alice");
    assert_eq!(users[0]["progress"]["zh_pairs_done"], 1);
    assert_eq!(users[1]["username"], "bob");
    assert_eq!(users[1]["progress"]["zh_pairs_done"], 0);
}
