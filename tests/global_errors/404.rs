//! tests/global_errors/404.rs
//! Ensures that a route the build does not know returns `{code: 404}`.

#[path = "../mod.rs"]
mod common;

use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn returns_404_for_nonexistent_route() {
    let base_url: String = common::spawn_app().await;

    let resp: reqwest::Response = reqwest::Client::new()
        .get(format!("{}/does-not-exist", base_url))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()["content-type"], "application/json");

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["code"], 404);
    assert_eq!(json["message"], "Not Found");
}

#[tokio::test]
async fn production_build_renders_404_for_unknown_pages() {
    let app: common::TestApp = common::spawn_app_with(&[], true).await;

    let resp: reqwest::Response = reqwest::get(format!("{}/nowhere", app.address)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json, serde_json::json!({ "code": 404, "message": "Not Found" }));
}
