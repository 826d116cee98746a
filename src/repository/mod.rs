/// Repository contracts
///
/// Services talk to storage only through these traits. `PgRepository` is the
/// production store; `InMemoryRepository` backs tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::{NewPost, Post, User};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PgRepository;

/// Durable user records and refresh-token state
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert a user together with its first refresh token.
    ///
    /// # Errors
    /// `Conflict` if the email is already registered
    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        refresh_token_hash: &str,
        refresh_token_expires_at: DateTime<Utc>,
    ) -> Result<User, RepositoryError>;

    async fn get_user_by_email(&self, email: &str) -> Result<User, RepositoryError>;

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<User, RepositoryError>;

    /// Overwrite the stored refresh token in a single atomic write.
    async fn update_refresh_token(
        &self,
        user_id: Uuid,
        refresh_token_hash: &str,
        refresh_token_expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

/// Geotagged posts
#[async_trait]
pub trait PostsRepository: Send + Sync {
    /// # Errors
    /// `Conflict` if the owner already used the idempotency key
    async fn create_post(&self, post: NewPost) -> Result<Post, RepositoryError>;

    /// Newest first; `None` means no limit
    async fn get_posts_by_user_id(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Post>, RepositoryError>;

    /// Posts within `radius_meters`, nearest first
    async fn get_posts_by_location(
        &self,
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
        limit: Option<i64>,
    ) -> Result<Vec<Post>, RepositoryError>;

    /// Only finds posts owned by `user_id`
    async fn get_post_by_id(&self, post_id: Uuid, user_id: Uuid) -> Result<Post, RepositoryError>;

    /// Persist title and content of an existing post and bump `updated_at`
    async fn update_post(&self, post: &Post) -> Result<Post, RepositoryError>;

    async fn delete_post(&self, post_id: Uuid, user_id: Uuid) -> Result<(), RepositoryError>;
}
