mod common;

use common::{spawn_app, TestApp};
use serde_json::{json, Value};

async fn create_post(app: &TestApp, token: &str, key: &str, latitude: f64, longitude: f64) -> String {
    let response = app
        .call_authorized(
            "posts.PostsService/CreatePost",
            token,
            json!({
                "title": "Sunset",
                "content": "Seen from the pier",
                "idempotency_key": key,
                "latitude": latitude,
                "longitude": longitude
            }),
        )
        .await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    body["message"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn create_then_get_post() {
    let app = spawn_app();
    let (token, _) = app.register("user@example.com", "pw123").await;

    let post_id = create_post(&app, &token, "k1", 59.93, 30.31).await;

    let response = app
        .call_authorized("posts.PostsService/GetPostById", &token, json!({ "post_id": post_id }))
        .await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["post"]["post_id"], post_id.as_str());
    assert_eq!(body["post"]["title"], "Sunset");
    assert_eq!(body["post"]["latitude"], 59.93);
}

#[tokio::test]
async fn repeated_idempotency_key_is_rejected() {
    let app = spawn_app();
    let (token, _) = app.register("user@example.com", "pw123").await;
    create_post(&app, &token, "k1", 0.0, 0.0).await;

    let response = app
        .call_authorized(
            "posts.PostsService/CreatePost",
            &token,
            json!({
                "title": "again",
                "content": "again",
                "idempotency_key": "k1",
                "latitude": 0.0,
                "longitude": 0.0
            }),
        )
        .await;

    assert_eq!(409, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "error: idempotency key already exists");
}

#[tokio::test]
async fn posts_are_visible_only_to_their_owner() {
    let app = spawn_app();
    let (alice, _) = app.register("alice@example.com", "pw").await;
    let (bob, _) = app.register("bob@example.com", "pw").await;
    let post_id = create_post(&app, &alice, "k1", 0.0, 0.0).await;

    let response = app
        .call_authorized("posts.PostsService/GetPostById", &bob, json!({ "post_id": post_id }))
        .await;
    assert_eq!(404, response.status().as_u16());

    let response = app
        .call_authorized("posts.PostsService/GetUserPosts", &bob, json!({ "count": 0 }))
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["posts"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn invalid_post_id_is_invalid_argument() {
    let app = spawn_app();
    let (token, _) = app.register("user@example.com", "pw123").await;

    let response = app
        .call_authorized("posts.PostsService/GetPostById", &token, json!({ "post_id": "42" }))
        .await;

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "error: invalid post id");
}

#[tokio::test]
async fn location_search_returns_nearest_first() {
    let app = spawn_app();
    let (alice, _) = app.register("alice@example.com", "pw").await;
    let (bob, _) = app.register("bob@example.com", "pw").await;

    let far = create_post(&app, &alice, "far", 0.0, 0.005).await;
    let near = create_post(&app, &bob, "near", 0.0, 0.001).await;
    create_post(&app, &bob, "away", 45.0, 45.0).await;

    let response = app
        .call_authorized(
            "posts.PostsService/GetPostsByLocation",
            &alice,
            json!({ "latitude": 0.0, "longitude": 0.0, "radius": 1000.0, "count": 0 }),
        )
        .await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    let ids: Vec<&str> = body["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["post_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![near.as_str(), far.as_str()]);
}

#[tokio::test]
async fn update_respects_no_change_sentinel() {
    let app = spawn_app();
    let (token, _) = app.register("user@example.com", "pw123").await;
    let post_id = create_post(&app, &token, "k1", 0.0, 0.0).await;

    let response = app
        .call_authorized(
            "posts.PostsService/UpdatePostById",
            &token,
            json!({ "post_id": post_id, "title": "Sunrise", "content": "no_change" }),
        )
        .await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["post"]["title"], "Sunrise");
    assert_eq!(body["post"]["content"], "Seen from the pier");
}

#[tokio::test]
async fn delete_then_delete_again() {
    let app = spawn_app();
    let (token, _) = app.register("user@example.com", "pw123").await;
    let post_id = create_post(&app, &token, "k1", 0.0, 0.0).await;

    let response = app
        .call_authorized("posts.PostsService/DeletePostById", &token, json!({ "post_id": post_id }))
        .await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], post_id.as_str());

    let response = app
        .call_authorized("posts.PostsService/DeletePostById", &token, json!({ "post_id": post_id }))
        .await;
    assert_eq!(404, response.status().as_u16());
}
