/// Session operations
///
/// Registration, login, access-token refresh and access-token authorization.
/// Each operation is a stateless call against the session repository; the
/// only state machine is the stored refresh token of each user, which is
/// overwritten on every login.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::identity::AuthenticatedIdentity;
use crate::auth::jwt::TokenEngine;
use crate::auth::password::CredentialHasher;
use crate::auth::refresh_token::{hash_token, matches_stored};
use crate::error::{AppError, RepositoryError};
use crate::repository::SessionRepository;
use crate::validators::EmailValidator;

/// Tokens handed out by registration and login
#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of exchanging a refresh token
#[derive(Debug, Clone)]
pub struct RefreshedAccess {
    pub user_id: Uuid,
    pub access_token: String,
}

pub struct AuthService {
    sessions: Arc<dyn SessionRepository>,
    tokens: TokenEngine,
    hasher: CredentialHasher,
    emails: EmailValidator,
    secret: String,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("tokens", &self.tokens)
            .field("hasher", &self.hasher)
            .field("emails", &self.emails)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

fn storage_failure(err: RepositoryError) -> AppError {
    AppError::internal(err.to_string())
}

impl AuthService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        tokens: TokenEngine,
        hasher: CredentialHasher,
        emails: EmailValidator,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            tokens,
            hasher,
            emails,
            secret: secret.into(),
        }
    }

    /// Create an account and open its first session.
    ///
    /// # Errors
    /// - `InvalidEmail`: malformed address or a domain that does not resolve
    /// - `InvalidPassword`: empty password
    /// - `UserAlreadyExists`: the email is taken
    pub async fn register(&self, email: &str, password: &str) -> Result<AuthTokens, AppError> {
        let email = self
            .emails
            .validate(email)
            .await
            .ok_or(AppError::InvalidEmail)?;
        if password.is_empty() {
            return Err(AppError::InvalidPassword);
        }

        let password_hash = self.hasher.hash(password)?;
        let (refresh_token, expires_at) = self.tokens.issue_refresh_token(&email, &self.secret)?;

        let user = self
            .sessions
            .create_user(&email, &password_hash, &hash_token(&refresh_token), expires_at)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    tracing::info!("Registration rejected: email already registered");
                    AppError::UserAlreadyExists
                }
                other => storage_failure(other),
            })?;

        let access_token = self
            .tokens
            .issue_access_token(&user.user_id.to_string(), &self.secret)?;

        tracing::info!(user_id = %user.user_id, "User registered");

        Ok(AuthTokens {
            user_id: user.user_id,
            access_token,
            refresh_token,
        })
    }

    /// Authenticate with email and password, rotating the refresh token.
    ///
    /// Unknown and malformed emails both fail with `InvalidEmail` so callers
    /// cannot probe which accounts exist.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthTokens, AppError> {
        let email = self.emails.parse(email).ok_or(AppError::InvalidEmail)?;

        let user = match self.sessions.get_user_by_email(&email).await {
            Ok(user) => user,
            Err(RepositoryError::NotFound) => return Err(AppError::InvalidEmail),
            Err(e) => return Err(storage_failure(e)),
        };

        if !self.hasher.verify(&user.password_hash, password)? {
            tracing::info!(user_id = %user.user_id, "Login rejected: wrong password");
            return Err(AppError::InvalidPassword);
        }

        let (refresh_token, expires_at) =
            self.tokens.issue_refresh_token(&user.email, &self.secret)?;
        self.sessions
            .update_refresh_token(user.user_id, &hash_token(&refresh_token), expires_at)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AppError::InvalidEmail,
                other => storage_failure(other),
            })?;

        let access_token = self
            .tokens
            .issue_access_token(&user.user_id.to_string(), &self.secret)?;

        tracing::info!(user_id = %user.user_id, "User logged in, refresh token rotated");

        Ok(AuthTokens {
            user_id: user.user_id,
            access_token,
            refresh_token,
        })
    }

    /// Exchange the current refresh token for a new access token.
    ///
    /// The refresh token itself is not rotated here. A token that is no
    /// longer the stored one has been superseded by a later login and fails
    /// with `InvalidToken`.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshedAccess, AppError> {
        let claims = self.tokens.validate(refresh_token, &self.secret)?;

        let user = match self.sessions.get_user_by_email(&claims.sub).await {
            Ok(user) => user,
            Err(RepositoryError::NotFound) => return Err(AppError::InvalidToken),
            Err(e) => return Err(storage_failure(e)),
        };

        if !matches_stored(refresh_token, &user.refresh_token_hash) {
            tracing::warn!(user_id = %user.user_id, "Superseded refresh token presented");
            return Err(AppError::InvalidToken);
        }
        if user.refresh_token_expires_at <= Utc::now() {
            return Err(AppError::ExpiredToken);
        }

        let access_token = self
            .tokens
            .issue_access_token(&user.user_id.to_string(), &self.secret)?;

        tracing::info!(user_id = %user.user_id, "Access token refreshed");

        Ok(RefreshedAccess {
            user_id: user.user_id,
            access_token,
        })
    }

    /// Resolve an access token to the user it was issued for.
    ///
    /// A token whose user no longer exists is reported as `InvalidToken`,
    /// the same as any other unusable token. Storage failures stay internal.
    pub async fn authorize(&self, access_token: &str) -> Result<AuthenticatedIdentity, AppError> {
        let claims = self.tokens.validate(access_token, &self.secret)?;
        let user_id = claims.user_id()?;

        match self.sessions.get_user_by_id(user_id).await {
            Ok(user) => Ok(AuthenticatedIdentity::new(user)),
            Err(RepositoryError::NotFound) => Err(AppError::InvalidToken),
            Err(e) => Err(storage_failure(e)),
        }
    }
}
