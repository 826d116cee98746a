/// Refresh Token Storage Digest
///
/// Refresh tokens are stored server-side only as SHA-256 digests. Exactly one
/// digest is kept per user; writing a new one revokes the previous token.

use sha2::{Digest, Sha256};

/// Hash a refresh token using SHA-256
///
/// Never store plaintext tokens in the database.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Does `presented` match the digest currently stored for the user?
pub fn matches_stored(presented: &str, stored_digest: &str) -> bool {
    let presented = hash_token(presented);
    // Compare every byte so the time taken does not depend on the prefix
    presented.len() == stored_digest.len()
        && presented
            .bytes()
            .zip(stored_digest.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
