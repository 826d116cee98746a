use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{PostsRepository, SessionRepository};
use crate::error::RepositoryError;
use crate::geo::haversine_distance;
use crate::models::{NewPost, Post, User};

/// Process-local repository with the same contracts as `PgRepository`.
///
/// Every write happens under one mutex, which gives the same per-row atomicity
/// the Postgres implementation gets from single statements.
#[derive(Default)]
pub struct InMemoryRepository {
    users: Mutex<HashMap<Uuid, User>>,
    posts: Mutex<HashMap<Uuid, Post>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn apply_limit(mut posts: Vec<Post>, limit: Option<i64>) -> Vec<Post> {
    if let Some(limit) = limit {
        posts.truncate(usize::try_from(limit).unwrap_or(0));
    }
    posts
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        refresh_token_hash: &str,
        refresh_token_expires_at: DateTime<Utc>,
    ) -> Result<User, RepositoryError> {
        let mut users = lock(&self.users);
        if users.values().any(|u| u.email == email) {
            return Err(RepositoryError::Conflict("users_email_key".to_string()));
        }

        let user = User {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            refresh_token_hash: refresh_token_hash.to_string(),
            refresh_token_expires_at,
        };
        users.insert(user.user_id, user.clone());
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, RepositoryError> {
        lock(&self.users)
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<User, RepositoryError> {
        lock(&self.users)
            .get(&user_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_refresh_token(
        &self,
        user_id: Uuid,
        refresh_token_hash: &str,
        refresh_token_expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut users = lock(&self.users);
        let user = users.get_mut(&user_id).ok_or(RepositoryError::NotFound)?;
        user.refresh_token_hash = refresh_token_hash.to_string();
        user.refresh_token_expires_at = refresh_token_expires_at;
        Ok(())
    }
}

#[async_trait]
impl PostsRepository for InMemoryRepository {
    async fn create_post(&self, post: NewPost) -> Result<Post, RepositoryError> {
        let mut posts = lock(&self.posts);
        if posts
            .values()
            .any(|p| p.user_id == post.user_id && p.idempotency_key == post.idempotency_key)
        {
            return Err(RepositoryError::Conflict(
                "posts_user_id_idempotency_key_key".to_string(),
            ));
        }

        let now = Utc::now();
        let post = Post {
            post_id: Uuid::new_v4(),
            user_id: post.user_id,
            title: post.title,
            content: post.content,
            idempotency_key: post.idempotency_key,
            latitude: post.latitude,
            longitude: post.longitude,
            created_at: now,
            updated_at: now,
        };
        posts.insert(post.post_id, post.clone());
        Ok(post)
    }

    async fn get_posts_by_user_id(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Post>, RepositoryError> {
        let mut found: Vec<Post> = lock(&self.posts)
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(apply_limit(found, limit))
    }

    async fn get_posts_by_location(
        &self,
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
        limit: Option<i64>,
    ) -> Result<Vec<Post>, RepositoryError> {
        let mut found: Vec<(f64, Post)> = lock(&self.posts)
            .values()
            .map(|p| (haversine_distance(latitude, longitude, p.latitude, p.longitude), p))
            .filter(|(distance, _)| *distance <= radius_meters)
            .map(|(distance, p)| (distance, p.clone()))
            .collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(apply_limit(found.into_iter().map(|(_, p)| p).collect(), limit))
    }

    async fn get_post_by_id(&self, post_id: Uuid, user_id: Uuid) -> Result<Post, RepositoryError> {
        lock(&self.posts)
            .get(&post_id)
            .filter(|p| p.user_id == user_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_post(&self, post: &Post) -> Result<Post, RepositoryError> {
        let mut posts = lock(&self.posts);
        let stored = posts
            .get_mut(&post.post_id)
            .filter(|p| p.user_id == post.user_id)
            .ok_or(RepositoryError::NotFound)?;
        stored.title = post.title.clone();
        stored.content = post.content.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_post(&self, post_id: Uuid, user_id: Uuid) -> Result<(), RepositoryError> {
        let mut posts = lock(&self.posts);
        match posts.get(&post_id) {
            Some(p) if p.user_id == user_id => {
                posts.remove(&post_id);
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }
}
