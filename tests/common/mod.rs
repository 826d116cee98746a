#![allow(dead_code)]

//! Shared setup for the integration tests: a real server on a random port,
//! backed by the in-memory repository.

use std::net::TcpListener;
use std::sync::Arc;

use chrono::Duration;
use geopost::auth::{AuthService, CredentialHasher, TokenConfigHandle, TokenEngine, TokenSettings};
use geopost::posts::PostsService;
use geopost::repository::InMemoryRepository;
use geopost::startup::run;
use geopost::validators::EmailValidator;
use serde_json::{json, Value};

pub const TEST_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub address: String,
    pub token_config: TokenConfigHandle,
    pub client: reqwest::Client,
}

pub fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let repository = Arc::new(InMemoryRepository::new());
    let token_config = TokenConfigHandle::new(TokenSettings {
        issuer: "geopost-test".to_string(),
        access_ttl: Duration::hours(2),
        refresh_ttl: Duration::days(7),
    });
    let auth = Arc::new(AuthService::new(
        repository.clone(),
        TokenEngine::new(token_config.clone()),
        CredentialHasher::with_cost(4),
        EmailValidator::syntax_only(),
        TEST_SECRET,
    ));
    let posts = Arc::new(PostsService::new(repository));

    let server = run(listener, auth, posts).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        token_config,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub async fn call(&self, method: &str, body: Value) -> reqwest::Response {
        self.client
            .post(&format!("{}/{}", self.address, method))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn call_authorized(&self, method: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(&format!("{}/{}", self.address, method))
            .header("Authorization", format!("Bearer {}", token))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Register a user and return (access token, refresh token)
    pub async fn register(&self, email: &str, password: &str) -> (String, String) {
        let response = self
            .call(
                "auth.AuthService/RegistrateUser",
                json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(200, response.status().as_u16());

        let access_token = bearer_token(&response);
        let body: Value = response.json().await.expect("Failed to parse response");
        let refresh_token = body["refresh_token"].as_str().unwrap().to_string();
        (access_token, refresh_token)
    }
}

/// The access token from the `Authorization: Bearer <token>` response header
pub fn bearer_token(response: &reqwest::Response) -> String {
    let value = response
        .headers()
        .get("authorization")
        .expect("Missing Authorization header")
        .to_str()
        .unwrap();
    value
        .strip_prefix("Bearer ")
        .expect("Not a bearer token")
        .to_string()
}
