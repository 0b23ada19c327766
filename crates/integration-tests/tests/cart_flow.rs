//! Cart endpoints for signed-out visitors and signed-in users.

use axum::http::StatusCode;
use serde_json::{Value, json};

use shopfront_core::{ItemId, UserUid};
use shopfront_integration_tests::TestApp;
use shopfront_storefront::db::{DocumentStore, paths};

fn lines(body: &Value) -> Vec<(String, u64)> {
    body["lines"]
        .as_array()
        .map(|lines| {
            lines
                .iter()
                .map(|line| {
                    (
                        line["itemId"].as_str().unwrap_or_default().to_string(),
                        line["quantity"].as_u64().unwrap_or_default(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_health_endpoints() {
    let mut app = TestApp::new();

    let live = app.get("/health").await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body, json!("ok"));

    let ready = app.get("/health/ready").await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_signed_out_cart_lives_in_session() {
    let mut app = TestApp::new();

    let empty = app.get("/cart").await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.body["signedIn"], json!(false));
    assert!(lines(&empty.body).is_empty());

    app.post("/cart/add", json!({ "itemId": "A", "quantity": 2 }))
        .await;
    let added = app.post("/cart/add", json!({ "itemId": "A" })).await;
    assert_eq!(added.status, StatusCode::OK);
    assert_eq!(lines(&added.body), vec![("A".to_string(), 3)]);

    app.post("/cart/add", json!({ "itemId": "B", "quantity": 1 }))
        .await;
    let count = app.get("/cart/count").await;
    assert_eq!(count.body["count"], json!(4));

    // Nothing reaches the document store while signed out
    assert!(app.documents.is_empty());
}

#[tokio::test]
async fn test_signed_out_update_remove_and_clear() {
    let mut app = TestApp::new();
    app.post("/cart/add", json!({ "itemId": "A", "quantity": 2 }))
        .await;
    app.post("/cart/add", json!({ "itemId": "B", "quantity": 1 }))
        .await;

    let updated = app
        .post("/cart/update", json!({ "itemId": "A", "quantity": 5 }))
        .await;
    assert_eq!(
        lines(&updated.body),
        vec![("A".to_string(), 5), ("B".to_string(), 1)]
    );

    // Quantity changes for items not in the cart are ignored
    let ignored = app
        .post("/cart/update", json!({ "itemId": "Z", "quantity": 9 }))
        .await;
    assert_eq!(ignored.status, StatusCode::OK);
    assert_eq!(ignored.body["totalQuantity"], json!(6));

    let removed = app.post("/cart/remove", json!({ "itemId": "A" })).await;
    assert_eq!(lines(&removed.body), vec![("B".to_string(), 1)]);

    let cleared = app.send(axum::http::Method::POST, "/cart/clear", None).await;
    assert_eq!(cleared.status, StatusCode::OK);
    assert!(lines(&cleared.body).is_empty());
}

#[tokio::test]
async fn test_cart_rejects_bad_item_ids() {
    let mut app = TestApp::new();

    let response = app
        .post("/cart/add", json!({ "itemId": "a/b", "quantity": 1 }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_signed_in_cart_writes_remote_documents() {
    let mut app = TestApp::new();
    let signed_in = app.sign_in("u1").await;
    assert_eq!(signed_in.status, StatusCode::OK);

    app.post("/cart/add", json!({ "itemId": "A", "quantity": 2 }))
        .await;
    let added = app.post("/cart/add", json!({ "itemId": "A" })).await;
    assert_eq!(added.body["signedIn"], json!(true));
    assert_eq!(lines(&added.body), vec![("A".to_string(), 3)]);

    let path = paths::cart_line(&UserUid::new("u1"), &ItemId::new("A")).expect("valid path");
    let stored = app.documents.get(&path).await.ok().flatten();
    assert_eq!(
        stored.map(|doc| doc.data["quantity"].clone()),
        Some(json!(3))
    );

    app.post("/cart/remove", json!({ "itemId": "A" })).await;
    let after = app.get("/cart").await;
    assert!(lines(&after.body).is_empty());
}

#[tokio::test]
async fn test_signed_in_clear_removes_every_line() {
    let mut app = TestApp::new();
    app.sign_in("u1").await;
    for item in ["A", "B", "C"] {
        app.post("/cart/add", json!({ "itemId": item })).await;
    }

    let cleared = app.send(axum::http::Method::POST, "/cart/clear", None).await;

    assert_eq!(cleared.status, StatusCode::OK);
    assert!(lines(&cleared.body).is_empty());
    assert_eq!(app.get("/cart/count").await.body["count"], json!(0));
}
