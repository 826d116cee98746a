/// JWT Claims structure
///
/// The signed payload of both access and refresh tokens. Claims are built at
/// signing time and dropped after validation; they are never persisted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Issuer
    pub iss: String,
    /// Subject: user ID for access tokens, email for refresh tokens
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token ID, keeps two tokens minted in the same second distinct
    pub jti: String,
}

impl Claims {
    /// Create claims for `subject` valid for `ttl` from `now`
    pub fn new(issuer: &str, subject: &str, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            iss: issuer.to_string(),
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Absolute expiry as a timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// True once the wall clock has reached `exp`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// Extract the user ID from an access token subject
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let now = Utc::now();
        let claims = Claims::new("test", "subject", now, Duration::seconds(3600));

        assert_eq!(claims.iss, "test");
        assert_eq!(claims.sub, "subject");
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp, now.timestamp() + 3600);
        assert!(!claims.is_expired_at(now));
        assert!(claims.is_expired_at(now + Duration::seconds(3600)));
    }

    #[test]
    fn test_token_ids_are_unique() {
        let now = Utc::now();
        let a = Claims::new("test", "subject", now, Duration::seconds(60));
        let b = Claims::new("test", "subject", now, Duration::seconds(60));

        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_user_id_extraction() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new("test", &user_id.to_string(), Utc::now(), Duration::seconds(60));

        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn test_invalid_user_id() {
        let claims = Claims::new("test", "user@example.com", Utc::now(), Duration::seconds(60));

        assert!(matches!(claims.user_id(), Err(AppError::InvalidToken)));
    }
}
