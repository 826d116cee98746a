/// auth.AuthService
///
/// The credential-issuing RPC methods. Each successful call returns the new
/// access token in the `Authorization` response header.

use actix_web::{http::header::AUTHORIZATION, web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::AuthService;
use crate::error::AppError;

#[derive(Debug, Deserialize, Serialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Body of RegistrateUser and LoginUser; `message` is the user id
#[derive(Debug, Deserialize, Serialize)]
pub struct SessionResponse {
    pub message: String,
    pub refresh_token: String,
}

/// Body of RefreshUserToken; `message` is the user id
#[derive(Debug, Deserialize, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn bearer(access_token: &str) -> (actix_web::http::header::HeaderName, String) {
    (AUTHORIZATION, format!("Bearer {}", access_token))
}

/// POST /auth.AuthService/RegistrateUser
///
/// # Errors
/// - 400: invalid email or empty password
/// - 409: email already registered
pub async fn registrate_user(
    body: web::Json<CredentialsRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let tokens = auth.register(&body.email, &body.password).await?;

    Ok(HttpResponse::Ok()
        .insert_header(bearer(&tokens.access_token))
        .json(SessionResponse {
            message: tokens.user_id.to_string(),
            refresh_token: tokens.refresh_token,
        }))
}

/// POST /auth.AuthService/LoginUser
///
/// Rotates the stored refresh token; earlier refresh tokens stop working.
///
/// # Errors
/// - 400: unknown or malformed email, wrong password
pub async fn login_user(
    body: web::Json<CredentialsRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let tokens = auth.login(&body.email, &body.password).await?;

    Ok(HttpResponse::Ok()
        .insert_header(bearer(&tokens.access_token))
        .json(SessionResponse {
            message: tokens.user_id.to_string(),
            refresh_token: tokens.refresh_token,
        }))
}

/// POST /auth.AuthService/RefreshUserToken
///
/// # Errors
/// - 403: invalid, expired or superseded refresh token
pub async fn refresh_user_token(
    body: web::Json<RefreshRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let refreshed = auth.refresh_token(&body.refresh_token).await?;

    Ok(HttpResponse::Ok()
        .insert_header(bearer(&refreshed.access_token))
        .json(MessageResponse {
            message: refreshed.user_id.to_string(),
        }))
}
