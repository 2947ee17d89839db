#![cfg(feature = "sqlite")]

use std::sync::Arc;

use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;

use keymark::server::database::{Database, LicenseRecord};
use keymark::server::handlers::AppState;
use keymark::server::logging::REQUEST_ID_HEADER;
use keymark::server::routes::build_router;

/// Spin up the HTTP server on an OS-assigned port, returning the base URL
/// and a handle to the backing store for seeding.
async fn spawn_test_server() -> (String, Arc<Database>) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory db connect failed");

    let db = Arc::new(Database::SQLite(pool));
    db.ensure_schema().await.expect("schema create failed");

    let app = build_router(AppState { db: db.clone() });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://127.0.0.1:{}", port), db)
}

async fn seed(db: &Database, key: &str, used: bool) {
    db.insert_license(LicenseRecord {
        license_key: key.to_string(),
        used,
    })
    .await
    .expect("seed failed");
}

#[tokio::test]
async fn license_lifecycle_scenario() {
    let (base, db) = spawn_test_server().await;
    seed(&db, "ABC123", false).await;
    let client = reqwest::Client::new();

    // Fresh key validates.
    let resp = reqwest::get(format!("{base}/validate?license_key=ABC123"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["valid"], json!(true));
    assert_eq!(body["message"], json!("VALID"));

    // Consume it.
    let resp = client
        .post(format!("{base}/mark_used"))
        .json(&json!({"license_key": "ABC123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], json!("success"));
    assert_eq!(body["message"], json!("License key marked as used"));

    // Now it no longer validates.
    let resp = reqwest::get(format!("{base}/validate?license_key=ABC123"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["valid"], json!(false));

    // A key the store never saw is unauthorized.
    let resp = reqwest::get(format!("{base}/validate?license_key=XYZ"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["valid"], json!(false));
    assert_eq!(body["message"], json!("Invalid or expired license key"));
}

#[tokio::test]
async fn validate_requires_license_key() {
    let (base, _db) = spawn_test_server().await;

    // Absent parameter.
    let resp = reqwest::get(format!("{base}/validate")).await.unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["valid"], json!(false));
    assert_eq!(body["message"], json!("License key is required"));

    // Empty parameter behaves the same.
    let resp = reqwest::get(format!("{base}/validate?license_key="))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn mark_used_requires_license_key() {
    let (base, _db) = spawn_test_server().await;
    let client = reqwest::Client::new();

    // Field absent from the body.
    let resp = client
        .post(format!("{base}/mark_used"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], json!("error"));
    assert_eq!(body["message"], json!("License key is required"));

    // Blank value behaves the same.
    let resp = client
        .post(format!("{base}/mark_used"))
        .json(&json!({"license_key": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn mark_used_unknown_key_is_not_found() {
    let (base, _db) = spawn_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/mark_used"))
        .json(&json!({"license_key": "NO-SUCH-KEY"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], json!("error"));
    assert_eq!(body["message"], json!("License key not found"));
}

#[tokio::test]
async fn mark_used_is_idempotent_over_http() {
    let (base, db) = spawn_test_server().await;
    seed(&db, "REPEAT-ME", false).await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let resp = client
            .post(format!("{base}/mark_used"))
            .json(&json!({"license_key": "REPEAT-ME"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "both calls must succeed");
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], json!("success"));
    }
}

#[tokio::test]
async fn already_used_key_fails_validation() {
    let (base, db) = spawn_test_server().await;
    seed(&db, "SPENT", true).await;

    let resp = reqwest::get(format!("{base}/validate?license_key=SPENT"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["valid"], json!(false));
    assert_eq!(body["message"], json!("License invalid - already used"));
}

#[tokio::test]
async fn health_reports_connected_database() {
    let (base, _db) = spawn_test_server().await;

    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["service"], json!("keymark"));
    assert_eq!(body["database"]["connected"], json!(true));
    assert_eq!(body["database"]["db_type"], json!("sqlite"));
}

#[tokio::test]
async fn responses_carry_request_id_header() {
    let (base, _db) = spawn_test_server().await;

    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    let request_id = resp
        .headers()
        .get(REQUEST_ID_HEADER)
        .expect("request id header missing")
        .to_str()
        .unwrap();
    assert!(uuid::Uuid::parse_str(request_id).is_ok());
}
