//! tests/global_errors/4xx.rs
//! Ensures that HTTP errors raised by the build keep their status and message.

#[path = "../mod.rs"]
mod common;

use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn relays_status_and_message_of_http_errors() {
    let base_url: String = common::spawn_app().await;

    let resp: reqwest::Response = reqwest::get(format!("{}/teapot", base_url)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json, serde_json::json!({ "code": 418, "message": "Short and stout" }));
}

#[tokio::test]
async fn unsupported_methods_on_pages_are_405() {
    let app: common::TestApp = common::spawn_app_with(&[], true).await;

    let resp: reqwest::Response = reqwest::Client::new()
        .delete(format!("{}/", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["code"], 405);
}
