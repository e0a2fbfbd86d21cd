mod common;

use serde_json::Value;
use std::sync::Arc;

#[tokio::test]
async fn test_health_all_ok() {
    let app = common::TestApp::new(common::test_config());
    let server = app.server();

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["database"]["status"], "ok");
    assert_eq!(body["checks"]["fast_store"]["status"], "ok");
    assert_eq!(body["checks"]["hit_queue"]["status"], "ok");
    assert_eq!(body["checks"]["hit_queue"]["message"], "Queued: 0 / 1000");
}

#[tokio::test]
async fn test_health_reports_fast_store_outage_without_degrading() {
    let app = common::TestApp::with_store(common::test_config(), Arc::new(common::UnavailableStore));
    let server = app.server();

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["fast_store"]["status"], "error");
}
