/// JWT Token Issuance and Validation
///
/// Access and refresh tokens are HS512-signed JWTs. Issuer and lifetimes come
/// from a `TokenConfigHandle` that can be swapped at runtime; the signing
/// secret is supplied by the caller on every operation.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::error::AppError;

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS512;
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Hot-reloadable token settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSettings {
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// Shared, atomically swappable token settings.
///
/// Writers replace the whole `Arc`; readers clone it out and never observe a
/// partially updated value. The lock only guards the pointer swap.
#[derive(Debug, Clone, Default)]
pub struct TokenConfigHandle {
    current: Arc<RwLock<Option<Arc<TokenSettings>>>>,
}

impl TokenConfigHandle {
    pub fn new(settings: TokenSettings) -> Self {
        let handle = Self::empty();
        handle.store(settings);
        handle
    }

    /// A handle with nothing loaded yet
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(&self) -> Option<Arc<TokenSettings>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn store(&self, settings: TokenSettings) {
        let next = Arc::new(settings);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(next);
    }
}

/// Signs and verifies tokens against the current settings
#[derive(Debug, Clone)]
pub struct TokenEngine {
    config: TokenConfigHandle,
}

impl TokenEngine {
    pub fn new(config: TokenConfigHandle) -> Self {
        Self { config }
    }

    /// The handle the configuration watcher swaps settings into
    pub fn config(&self) -> &TokenConfigHandle {
        &self.config
    }

    fn settings(&self) -> Result<Arc<TokenSettings>, AppError> {
        self.config
            .load()
            .ok_or_else(|| AppError::internal("token settings are not loaded"))
    }

    /// Issue an access token whose subject is the user ID
    ///
    /// # Errors
    /// `InternalFailure` if no settings are loaded or signing fails
    pub fn issue_access_token(&self, subject_id: &str, secret: &str) -> Result<String, AppError> {
        let settings = self.settings()?;
        let claims = Claims::new(&settings.issuer, subject_id, Utc::now(), settings.access_ttl);
        sign(&claims, secret)
    }

    /// Issue a refresh token, returning it with its absolute expiry so the
    /// caller can persist both together.
    pub fn issue_refresh_token(
        &self,
        subject: &str,
        secret: &str,
    ) -> Result<(String, DateTime<Utc>), AppError> {
        let settings = self.settings()?;
        let claims = Claims::new(&settings.issuer, subject, Utc::now(), settings.refresh_ttl);
        let token = sign(&claims, secret)?;
        Ok((token, claims.expires_at()))
    }

    /// Validate a token and return its claims
    ///
    /// The declared algorithm is checked to be HMAC before the secret is used,
    /// and expiry is re-checked against the wall clock after the library's own
    /// validation.
    ///
    /// # Errors
    /// - `InvalidToken`: malformed, non-HMAC, bad signature, unparseable claims
    /// - `ExpiredToken`: signature valid but `exp` has passed
    pub fn validate(&self, token: &str, secret: &str) -> Result<Claims, AppError> {
        let header = decode_header(token).map_err(|_| AppError::InvalidToken)?;
        if !HMAC_ALGORITHMS.contains(&header.alg) {
            tracing::warn!(alg = ?header.alg, "Rejected token with non-HMAC algorithm");
            return Err(AppError::InvalidToken);
        }

        let mut validation = Validation::new(header.alg);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => {
                    tracing::debug!("JWT validation error: {}", e);
                    AppError::InvalidToken
                }
            })?;

        if claims.is_expired_at(Utc::now()) {
            return Err(AppError::ExpiredToken);
        }

        Ok(claims)
    }
}

fn sign(claims: &Claims, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::new(SIGNING_ALGORITHM),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("Token generation failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    fn test_settings() -> TokenSettings {
        TokenSettings {
            issuer: "test".to_string(),
            access_ttl: Duration::seconds(3600),
            refresh_ttl: Duration::seconds(604800),
        }
    }

    fn engine() -> TokenEngine {
        TokenEngine::new(TokenConfigHandle::new(test_settings()))
    }

    fn encode_with(claims: &Claims, alg: Algorithm, secret: &str) -> String {
        encode(&Header::new(alg), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn test_issue_and_validate_access_token() {
        let engine = engine();
        let token = engine.issue_access_token("user-1", SECRET).expect("Failed to issue token");
        let claims = engine.validate(&token, SECRET).expect("Failed to validate token");

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.iss, "test");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_access_tokens_are_signed_with_hs512() {
        let token = engine().issue_access_token("user-1", SECRET).unwrap();
        let header = decode_header(&token).unwrap();

        assert_eq!(header.alg, Algorithm::HS512);
    }

    #[test]
    fn test_refresh_token_returns_expiry() {
        let engine = engine();
        let before = Utc::now();
        let (token, expiry) = engine.issue_refresh_token("user@example.com", SECRET).unwrap();

        let claims = engine.validate(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "user@example.com");
        assert_eq!(claims.exp, expiry.timestamp());
        assert!(expiry >= before + Duration::seconds(604800) - Duration::seconds(1));
    }

    #[test]
    fn test_issue_without_settings_is_internal_failure() {
        let engine = TokenEngine::new(TokenConfigHandle::empty());

        assert!(matches!(
            engine.issue_access_token("user-1", SECRET),
            Err(AppError::InternalFailure(_))
        ));
        assert!(matches!(
            engine.issue_refresh_token("user@example.com", SECRET),
            Err(AppError::InternalFailure(_))
        ));
    }

    #[test]
    fn test_expired_token_with_valid_signature() {
        let now = Utc::now();
        let claims = Claims::new("test", "user-1", now - Duration::hours(2), Duration::hours(1));
        let token = encode_with(&claims, Algorithm::HS512, SECRET);

        assert!(matches!(engine().validate(&token, SECRET), Err(AppError::ExpiredToken)));
    }

    #[test]
    fn test_wrong_secret() {
        let engine = engine();
        let token = engine.issue_access_token("user-1", SECRET).unwrap();

        assert!(matches!(
            engine.validate(&token, "another-secret"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_malformed_token() {
        assert!(matches!(
            engine().validate("invalid.token.here", SECRET),
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(engine().validate("", SECRET), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_tampered_signature() {
        let engine = engine();
        let token = engine.issue_access_token("user-1", SECRET).unwrap();

        // Flip one character of the signature segment
        let (head, signature) = token.rsplit_once('.').unwrap();
        let mut bytes = signature.as_bytes().to_vec();
        bytes[0] = if bytes[0] == b'A' { b'B' } else { b'A' };
        let tampered = format!("{}.{}", head, String::from_utf8(bytes).unwrap());

        assert!(matches!(engine.validate(&tampered, SECRET), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_rejects_none_algorithm() {
        // {"alg":"none","typ":"JWT"}
        let header = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";
        let token = engine().issue_access_token("user-1", SECRET).unwrap();
        let payload = token.split('.').nth(1).unwrap();
        let forged = format!("{}.{}.", header, payload);

        assert!(matches!(engine().validate(&forged, SECRET), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_accepts_other_hmac_variants() {
        let claims = Claims::new("test", "user-1", Utc::now(), Duration::seconds(60));
        let token = encode_with(&claims, Algorithm::HS256, SECRET);

        assert_eq!(engine().validate(&token, SECRET).unwrap().sub, "user-1");
    }

    #[test]
    fn test_reload_changes_new_tokens_only() {
        let engine = engine();
        let before = engine.issue_access_token("user-1", SECRET).unwrap();

        engine.config().store(TokenSettings {
            issuer: "reloaded".to_string(),
            access_ttl: Duration::seconds(60),
            refresh_ttl: Duration::seconds(120),
        });
        let after = engine.issue_access_token("user-1", SECRET).unwrap();

        assert_eq!(engine.validate(&before, SECRET).unwrap().iss, "test");
        let claims = engine.validate(&after, SECRET).unwrap();
        assert_eq!(claims.iss, "reloaded");
        assert_eq!(claims.exp - claims.iat, 60);
    }
}
