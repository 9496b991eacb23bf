//! tests/global_errors/413.rs
//! Ensures that a body over the limit (2MB by default) triggers a 413.

#[path = "../mod.rs"]
mod common;

use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn returns_413_when_payload_exceeds_global_limit() {
    let base_url: String = common::spawn_app().await;

    let oversized_payload: Vec<u8> = vec![b'X'; 2_097_152 + 100];

    let resp: reqwest::Response = reqwest::Client::new()
        .post(format!("{}/echo", base_url))
        .header("content-type", "application/json")
        .body(oversized_payload)
        .send()
        .await
        .expect("Failed to send large request.");

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["code"], 413);
    assert_eq!(json["message"], "Payload Too Large");
}

#[tokio::test]
async fn bodies_under_the_limit_reach_the_build() {
    let base_url: String = common::spawn_app().await;
    let client: reqwest::Client = reqwest::Client::new();

    let json_resp: Value = client
        .post(format!("{}/echo", base_url))
        .json(&serde_json::json!({ "name": "Ada" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json_resp, serde_json::json!({ "name": "Ada" }));

    let form_resp: Value = client
        .post(format!("{}/echo", base_url))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=Ada&lang=rust")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(form_resp, serde_json::json!({ "name": "Ada", "lang": "rust" }));
}

#[tokio::test]
async fn malformed_json_is_a_400() {
    let base_url: String = common::spawn_app().await;

    let resp: reqwest::Response = reqwest::Client::new()
        .post(format!("{}/echo", base_url))
        .header("content-type", "application/json")
        .body("{\"name\":")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["code"], 400);
}
