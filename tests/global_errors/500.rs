//! tests/global_errors/500.rs
//! Ensures that unrecognized failures map to a generic 500 that leaks nothing.

#[path = "../mod.rs"]
mod common;

use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn returns_500_on_internal_error() {
    let app: common::TestApp = common::spawn_app_with(&[], false).await;

    let resp: reqwest::Response = reqwest::get(format!("{}/boom", app.address)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: String = resp.text().await.unwrap();
    assert!(!body.contains("hunter2"));
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json, serde_json::json!({ "code": 500, "message": "Internal server error" }));

    // The details still reach the log
    let logged: bool = app
        .logs
        .lines()
        .iter()
        .any(|line| line["fields"]["message"] == "request failed" && line.to_string().contains("hunter2"));
    assert!(logged);
}

#[tokio::test]
async fn returns_500_when_rendering_panics() {
    let base_url: String = common::spawn_app().await;
    let client: reqwest::Client = reqwest::Client::new();

    let resp: reqwest::Response = client.get(format!("{}/panic", base_url)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["message"], "Internal server error");

    // The server keeps serving
    let resp: reqwest::Response = client.get(format!("{}/", base_url)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn non_error_statuses_on_errors_become_500() {
    let base_url: String = common::spawn_app().await;

    let resp: reqwest::Response = reqwest::get(format!("{}/redirect-error", base_url)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["message"], "Internal server error");
}
