/// Authentication module
///
/// Handles JWT issuance/validation, password hashing, refresh token
/// digests, and the session operations built on top of them.

mod claims;
mod identity;
mod jwt;
mod password;
mod refresh_token;
mod service;

pub use claims::Claims;
pub use identity::AuthenticatedIdentity;
pub use jwt::{TokenConfigHandle, TokenEngine, TokenSettings};
pub use password::CredentialHasher;
pub use refresh_token::{hash_token, matches_stored};
pub use service::{AuthService, AuthTokens, RefreshedAccess};
