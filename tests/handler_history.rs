mod common;

use serde_json::{Value, json};

async fn create(server: &axum_test::TestServer, path: &str, url: &str, owner_id: i64) -> String {
    let response = server
        .post(path)
        .json(&json!({ "target_url": url, "owner_id": owner_id }))
        .await;
    assert_eq!(response.status_code(), 201);

    let body: Value = response.json();
    body["code"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_url_history_lists_only_owner_links() {
    let app = common::TestApp::new(common::test_config());
    let server = app.server();

    let first = create(&server, "/shorten", "https://example.com/1", 7).await;
    let second = create(&server, "/shorten", "https://example.com/2", 7).await;
    create(&server, "/shorten", "https://example.com/3", 8).await;
    create(&server, "/qrcode", "https://example.com/4", 7).await;

    let response = server
        .get("/urls/history")
        .add_query_param("owner_id", 7)
        .add_query_param("order", "asc")
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["total"], 2);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 20);

    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["code"], first.as_str());
    assert_eq!(items[1]["code"], second.as_str());
    assert_eq!(items[0]["kind"], "url");
    assert_eq!(items[0]["owner_id"], 7);
}

#[tokio::test]
async fn test_qrcode_history_sorts_by_scans() {
    let mut app = common::TestApp::new(common::test_config());
    let server = app.server();

    let quiet = create(&server, "/qrcode", "https://example.com/a", 3).await;
    let busy = create(&server, "/qrcode", "https://example.com/b", 3).await;

    for _ in 0..4 {
        server.get(&format!("/qrcode/{busy}")).await;
    }
    server.get(&format!("/qrcode/{quiet}")).await;
    app.process_hits().await;
    app.state.resource_service.sync_all_counters().await.unwrap();

    let response = server
        .get("/qrcodes/history")
        .add_query_param("owner_id", 3)
        .add_query_param("sort", "scans")
        .add_query_param("limit", 1)
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["total"], 2);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["code"], busy.as_str());
    assert_eq!(items[0]["hits"], 4);

    let next = server
        .get("/qrcodes/history")
        .add_query_param("owner_id", 3)
        .add_query_param("sort", "scans")
        .add_query_param("limit", 1)
        .add_query_param("page", 2)
        .await;
    let body: Value = next.json();
    assert_eq!(body["items"][0]["code"], quiet.as_str());
}

#[tokio::test]
async fn test_history_rejects_bad_parameters() {
    let app = common::TestApp::new(common::test_config());
    let server = app.server();

    let missing_owner = server.get("/barcodes/history").await;
    assert_eq!(missing_owner.status_code(), 400);

    let too_many = server
        .get("/barcodes/history")
        .add_query_param("owner_id", 1)
        .add_query_param("limit", 101)
        .await;
    assert_eq!(too_many.status_code(), 400);

    let wrong_label = server
        .get("/barcodes/history")
        .add_query_param("owner_id", 1)
        .add_query_param("sort", "clicks")
        .await;
    assert_eq!(wrong_label.status_code(), 400);

    let bad_order = server
        .get("/urls/history")
        .add_query_param("owner_id", 1)
        .add_query_param("order", "sideways")
        .await;
    assert_eq!(bad_order.status_code(), 400);
}

#[tokio::test]
async fn test_empty_history() {
    let app = common::TestApp::new(common::test_config());
    let server = app.server();

    let response = server
        .get("/barcodes/history")
        .add_query_param("owner_id", 99)
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["total"], 0);
    assert!(body["items"].as_array().unwrap().is_empty());
}
