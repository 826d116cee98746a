//! Persistent records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account.
///
/// `refresh_token_hash` is the digest of the single live refresh token;
/// overwriting it revokes whatever token was issued before.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub refresh_token_hash: String,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// A geotagged post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub idempotency_key: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a post that are not generated by the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub idempotency_key: String,
    pub latitude: f64,
    pub longitude: f64,
}
