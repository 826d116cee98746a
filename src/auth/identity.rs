use std::future::{ready, Ready};

use actix_web::{dev::Payload, Error, FromRequest, HttpMessage, HttpRequest};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::User;

/// The user resolved from a valid access token.
///
/// Inserted into the request extensions by the auth interceptor and lives
/// exactly as long as the request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedIdentity(User);

impl AuthenticatedIdentity {
    pub fn new(user: User) -> Self {
        Self(user)
    }

    pub fn user(&self) -> &User {
        &self.0
    }

    pub fn user_id(&self) -> Uuid {
        self.0.user_id
    }
}

/// Handlers that take an `AuthenticatedIdentity` fail with `PermissionDenied`
/// when the interceptor did not attach one.
impl FromRequest for AuthenticatedIdentity {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedIdentity>() {
            Some(identity) => ready(Ok(identity.clone())),
            None => {
                tracing::warn!(path = %req.path(), "No authenticated identity in request context");
                ready(Err(AppError::PermissionDenied.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use chrono::Utc;

    fn identity() -> AuthenticatedIdentity {
        AuthenticatedIdentity::new(User {
            user_id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            password_hash: "hash".to_string(),
            refresh_token_hash: "digest".to_string(),
            refresh_token_expires_at: Utc::now(),
        })
    }

    #[actix_web::test]
    async fn test_extracts_identity_from_extensions() {
        let expected = identity();
        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(expected.clone());

        let extracted = AuthenticatedIdentity::extract(&req).await.unwrap();
        assert_eq!(extracted, expected);
    }

    #[actix_web::test]
    async fn test_missing_identity_is_permission_denied() {
        let req = TestRequest::default().to_http_request();

        let err = AuthenticatedIdentity::extract(&req).await.unwrap_err();
        let app_error = err.as_error::<AppError>().unwrap();
        assert!(matches!(app_error, AppError::PermissionDenied));
    }
}
