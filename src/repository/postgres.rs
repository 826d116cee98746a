use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{PostsRepository, SessionRepository};
use crate::error::RepositoryError;
use crate::models::{NewPost, Post, User};

const USER_COLUMNS: &str =
    "user_id, email, password_hash, refresh_token_hash, refresh_token_expires_at";
const POST_COLUMNS: &str = "post_id, user_id, title, content, idempotency_key, latitude, longitude, created_at, updated_at";

/// Postgres-backed repository on a shared connection pool
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations from `./migrations`
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SessionRepository for PgRepository {
    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        refresh_token_hash: &str,
        refresh_token_expires_at: DateTime<Utc>,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, refresh_token_hash, refresh_token_expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(email)
        .bind(password_hash)
        .bind(refresh_token_hash)
        .bind(refresh_token_expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)?
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE user_id = $1", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)?
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_refresh_token(
        &self,
        user_id: Uuid,
        refresh_token_hash: &str,
        refresh_token_expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token_hash = $1, refresh_token_expires_at = $2
            WHERE user_id = $3
            "#,
        )
        .bind(refresh_token_hash)
        .bind(refresh_token_expires_at)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl PostsRepository for PgRepository {
    async fn create_post(&self, post: NewPost) -> Result<Post, RepositoryError> {
        sqlx::query_as::<_, Post>(&format!(
            r#"
            INSERT INTO posts (user_id, title, content, idempotency_key, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(post.user_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.idempotency_key)
        .bind(post.latitude)
        .bind(post.longitude)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)
    }

    async fn get_posts_by_user_id(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Post>, RepositoryError> {
        // LIMIT NULL is LIMIT ALL
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {} FROM posts WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
            POST_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)
    }

    async fn get_posts_by_location(
        &self,
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
        limit: Option<i64>,
    ) -> Result<Vec<Post>, RepositoryError> {
        sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {}
            FROM posts
            WHERE haversine_distance($1, $2, latitude, longitude) <= $3
            ORDER BY haversine_distance($1, $2, latitude, longitude)
            LIMIT $4
            "#,
            POST_COLUMNS
        ))
        .bind(latitude)
        .bind(longitude)
        .bind(radius_meters)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)
    }

    async fn get_post_by_id(&self, post_id: Uuid, user_id: Uuid) -> Result<Post, RepositoryError> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {} FROM posts WHERE post_id = $1 AND user_id = $2",
            POST_COLUMNS
        ))
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?
        .ok_or(RepositoryError::NotFound)
    }

    async fn update_post(&self, post: &Post) -> Result<Post, RepositoryError> {
        sqlx::query_as::<_, Post>(&format!(
            r#"
            UPDATE posts
            SET title = $1, content = $2, updated_at = now()
            WHERE post_id = $3 AND user_id = $4
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.post_id)
        .bind(post.user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?
        .ok_or(RepositoryError::NotFound)
    }

    async fn delete_post(&self, post_id: Uuid, user_id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM posts WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
