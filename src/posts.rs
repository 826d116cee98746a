//! Geotagged posts
//!
//! Every operation is scoped to the authenticated owner; the owner id never
//! comes from the request body.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{AppError, RepositoryError};
use crate::geo::{is_valid_latitude, is_valid_longitude};
use crate::models::{NewPost, Post};
use crate::repository::PostsRepository;

/// Field value meaning "leave this field as it is" in partial updates
pub const NO_CHANGE: &str = "no_change";

/// Input for `PostsService::create_post`
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub idempotency_key: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Partial update; `None` and `NO_CHANGE` both keep the stored value
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
}

fn changed(value: Option<String>) -> Option<String> {
    value.filter(|v| v != NO_CHANGE)
}

fn parse_post_id(post_id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(post_id.trim()).map_err(|_| AppError::InvalidPostId)
}

/// `count <= 0` means no limit
fn limit_from_count(count: i64) -> Option<i64> {
    (count > 0).then_some(count)
}

fn not_found_or_internal(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::PostNotFound,
        other => AppError::internal(other.to_string()),
    }
}

pub struct PostsService {
    posts: Arc<dyn PostsRepository>,
}

impl PostsService {
    pub fn new(posts: Arc<dyn PostsRepository>) -> Self {
        Self { posts }
    }

    /// # Errors
    /// - `MalformedRequest`: coordinates out of range
    /// - `IdempotencyKeyAlreadyExists`: the owner already used this key
    pub async fn create_post(&self, owner: Uuid, draft: PostDraft) -> Result<Post, AppError> {
        if !is_valid_latitude(draft.latitude) || !is_valid_longitude(draft.longitude) {
            return Err(AppError::MalformedRequest(
                "coordinates out of range".to_string(),
            ));
        }

        let post = self
            .posts
            .create_post(NewPost {
                user_id: owner,
                title: draft.title,
                content: draft.content,
                idempotency_key: draft.idempotency_key,
                latitude: draft.latitude,
                longitude: draft.longitude,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AppError::IdempotencyKeyAlreadyExists,
                other => AppError::internal(other.to_string()),
            })?;

        tracing::info!(post_id = %post.post_id, user_id = %owner, "Post created");
        Ok(post)
    }

    pub async fn get_post_by_id(&self, owner: Uuid, post_id: &str) -> Result<Post, AppError> {
        let post_id = parse_post_id(post_id)?;
        self.posts
            .get_post_by_id(post_id, owner)
            .await
            .map_err(not_found_or_internal)
    }

    /// The owner's posts, newest first
    pub async fn get_user_posts(&self, owner: Uuid, count: i64) -> Result<Vec<Post>, AppError> {
        self.posts
            .get_posts_by_user_id(owner, limit_from_count(count))
            .await
            .map_err(|e| AppError::internal(e.to_string()))
    }

    /// Posts of any owner within `radius` metres, nearest first
    pub async fn get_posts_by_location(
        &self,
        latitude: f64,
        longitude: f64,
        radius: f64,
        count: i64,
    ) -> Result<Vec<Post>, AppError> {
        if !is_valid_latitude(latitude) || !is_valid_longitude(longitude) {
            return Err(AppError::MalformedRequest(
                "coordinates out of range".to_string(),
            ));
        }
        if !radius.is_finite() || radius < 0.0 {
            return Err(AppError::MalformedRequest(
                "radius must be a non-negative number of metres".to_string(),
            ));
        }

        self.posts
            .get_posts_by_location(latitude, longitude, radius, limit_from_count(count))
            .await
            .map_err(|e| AppError::internal(e.to_string()))
    }

    pub async fn update_post(
        &self,
        owner: Uuid,
        post_id: &str,
        changes: PostChanges,
    ) -> Result<Post, AppError> {
        let post_id = parse_post_id(post_id)?;
        let mut post = self
            .posts
            .get_post_by_id(post_id, owner)
            .await
            .map_err(not_found_or_internal)?;

        if let Some(title) = changed(changes.title) {
            post.title = title;
        }
        if let Some(content) = changed(changes.content) {
            post.content = content;
        }

        let post = self
            .posts
            .update_post(&post)
            .await
            .map_err(not_found_or_internal)?;

        tracing::info!(post_id = %post.post_id, user_id = %owner, "Post updated");
        Ok(post)
    }

    /// Returns the id of the deleted post
    pub async fn delete_post(&self, owner: Uuid, post_id: &str) -> Result<Uuid, AppError> {
        let post_id = parse_post_id(post_id)?;
        self.posts
            .delete_post(post_id, owner)
            .await
            .map_err(not_found_or_internal)?;

        tracing::info!(post_id = %post_id, user_id = %owner, "Post deleted");
        Ok(post_id)
    }
}
