//! Integration tests for the geopost server

mod common;

use common::spawn_app;

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app();

    let response = app
        .client
        .get(&format!("{}/health_check", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length());
}

#[tokio::test]
async fn health_check_bypasses_interceptors() {
    let app = spawn_app();

    let response = app
        .client
        .get(&format!("{}/health_check", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.headers().get("x-request-id").is_none());
}

#[tokio::test]
async fn rpc_responses_carry_request_id() {
    let app = spawn_app();

    let response = app
        .call(
            "auth.AuthService/LoginUser",
            serde_json::json!({ "email": "nobody@example.com", "password": "pw" }),
        )
        .await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Missing X-Request-ID")
        .to_str()
        .unwrap();
    assert!(uuid::Uuid::parse_str(request_id).is_ok());
}
