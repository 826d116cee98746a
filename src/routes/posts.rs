/// posts.PostsService
///
/// All methods sit behind the auth interceptor and act on behalf of the
/// `AuthenticatedIdentity` it attached.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::AuthenticatedIdentity;
use crate::error::AppError;
use crate::models::Post;
use crate::posts::{PostChanges, PostDraft, PostsService};
use crate::routes::auth::MessageResponse;

#[derive(Debug, Deserialize, Serialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub idempotency_key: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PostIdRequest {
    pub post_id: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UserPostsRequest {
    #[serde(default)]
    pub count: i64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LocationRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// metres
    pub radius: f64,
    #[serde(default)]
    pub count: i64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdatePostRequest {
    pub post_id: String,
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PostResponse {
    pub post: Post,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PostsResponse {
    pub posts: Vec<Post>,
}

/// POST /posts.PostsService/CreatePost
pub async fn create_post(
    identity: AuthenticatedIdentity,
    body: web::Json<CreatePostRequest>,
    posts: web::Data<PostsService>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let post = posts
        .create_post(
            identity.user_id(),
            PostDraft {
                title: body.title,
                content: body.content,
                idempotency_key: body.idempotency_key,
                latitude: body.latitude,
                longitude: body.longitude,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: post.post_id.to_string(),
    }))
}

/// POST /posts.PostsService/GetPostById
pub async fn get_post_by_id(
    identity: AuthenticatedIdentity,
    body: web::Json<PostIdRequest>,
    posts: web::Data<PostsService>,
) -> Result<HttpResponse, AppError> {
    let post = posts.get_post_by_id(identity.user_id(), &body.post_id).await?;
    Ok(HttpResponse::Ok().json(PostResponse { post }))
}

/// POST /posts.PostsService/GetUserPosts
pub async fn get_user_posts(
    identity: AuthenticatedIdentity,
    body: web::Json<UserPostsRequest>,
    posts: web::Data<PostsService>,
) -> Result<HttpResponse, AppError> {
    let posts = posts.get_user_posts(identity.user_id(), body.count).await?;
    Ok(HttpResponse::Ok().json(PostsResponse { posts }))
}

/// POST /posts.PostsService/GetPostsByLocation
pub async fn get_posts_by_location(
    _identity: AuthenticatedIdentity,
    body: web::Json<LocationRequest>,
    posts: web::Data<PostsService>,
) -> Result<HttpResponse, AppError> {
    let posts = posts
        .get_posts_by_location(body.latitude, body.longitude, body.radius, body.count)
        .await?;
    Ok(HttpResponse::Ok().json(PostsResponse { posts }))
}

/// POST /posts.PostsService/UpdatePostById
///
/// Absent fields and the literal `"no_change"` keep the stored value.
pub async fn update_post_by_id(
    identity: AuthenticatedIdentity,
    body: web::Json<UpdatePostRequest>,
    posts: web::Data<PostsService>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let post = posts
        .update_post(
            identity.user_id(),
            &body.post_id,
            PostChanges {
                title: body.title,
                content: body.content,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(PostResponse { post }))
}

/// POST /posts.PostsService/DeletePostById
pub async fn delete_post_by_id(
    identity: AuthenticatedIdentity,
    body: web::Json<PostIdRequest>,
    posts: web::Data<PostsService>,
) -> Result<HttpResponse, AppError> {
    let post_id = posts.delete_post(identity.user_id(), &body.post_id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: post_id.to_string(),
    }))
}
