/// Password Hashing and Verification
///
/// One-way salted bcrypt digests. The cost factor is fixed at bcrypt's
/// default in production; tests construct a cheaper hasher.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::AppError;

#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    cost: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl CredentialHasher {
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a password using bcrypt
    ///
    /// # Errors
    /// `HashingFailure` if the salt RNG or bcrypt itself fails
    pub fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        hash(plaintext, self.cost)
            .map_err(|e| AppError::HashingFailure(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against its digest
    ///
    /// Returns `Ok(false)` on mismatch.
    ///
    /// # Errors
    /// `HashingFailure` only if `digest` is not a valid bcrypt hash
    pub fn verify(&self, digest: &str, plaintext: &str) -> Result<bool, AppError> {
        verify(plaintext, digest)
            .map_err(|e| AppError::HashingFailure(format!("Password verification failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        // bcrypt's minimum cost
        CredentialHasher::with_cost(4)
    }

    #[test]
    fn test_default_cost() {
        assert_eq!(CredentialHasher::default().cost, DEFAULT_COST);
    }

    #[test]
    fn test_hash_password() {
        let password = "pw123";
        let digest = hasher().hash(password).expect("Failed to hash password");

        assert_ne!(password, digest);
        assert!(digest.starts_with("$2"));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hasher().hash("pw123").unwrap();
        let b = hasher().hash("pw123").unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_password() {
        let digest = hasher().hash("pw123").unwrap();

        assert!(hasher().verify(&digest, "pw123").expect("Failed to verify password"));
    }

    #[test]
    fn test_verify_wrong_password() {
        let digest = hasher().hash("pw123").unwrap();

        assert!(!hasher().verify(&digest, "pw124").expect("Failed to verify password"));
    }

    #[test]
    fn test_malformed_digest() {
        assert!(matches!(
            hasher().verify("not-a-bcrypt-hash", "pw123"),
            Err(AppError::HashingFailure(_))
        ));
    }
}
