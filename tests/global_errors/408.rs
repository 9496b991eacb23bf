//! tests/global_errors/408.rs
//! Ensures that requests taking longer than the configured timeout get a 408.

#[path = "../mod.rs"]
mod common;

use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn returns_408_when_request_times_out() {
    // `/slow` answers after 1.5s, the server gives up after 1s
    let app: common::TestApp = common::spawn_app_with(&[("DEFAULT_TIMEOUT_SECONDS", "1")], false).await;

    let resp_result: Result<Result<reqwest::Response, reqwest::Error>, tokio::time::error::Elapsed> = timeout(
        Duration::from_secs(5),
        reqwest::Client::new().get(format!("{}/slow", app.address)).send(),
    )
    .await;

    assert!(resp_result.is_ok(), "Client timed out waiting for server.");
    let resp: reqwest::Response = resp_result.unwrap().expect("Request failed unexpectedly.");

    assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["code"], 408);
    assert_eq!(json["message"], "Request Timeout");
}
