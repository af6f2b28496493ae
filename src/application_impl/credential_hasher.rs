use crate::application_port::{AuthError, CredentialHasher};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use tracing::warn;

/// Argon2id for new hashes. Verification also accepts bcrypt hashes
/// (`$2a$`, `$2b$`, `$2y$`) left behind by earlier deployments.
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl Argon2PasswordHasher {
    pub fn new() -> Result<Self, AuthError> {
        Self::with_argon2(Argon2::default())
    }

    /// Custom cost parameters (memory in KiB, iterations, lanes).
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, AuthError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| AuthError::Internal(format!("invalid argon2 params: {e}")))?;
        Self::with_argon2(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    fn with_argon2(argon2: Argon2<'static>) -> Result<Self, AuthError> {
        let dummy_secret = SaltString::generate(&mut OsRng);
        let dummy_hash = Self::hash_with(&argon2, dummy_secret.as_str())?;
        Ok(Self { argon2, dummy_hash })
    }

    fn hash_with(argon2: &Argon2<'static>, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    fn is_bcrypt(password_hash: &str) -> bool {
        ["$2a$", "$2b$", "$2y$"]
            .iter()
            .any(|prefix| password_hash.starts_with(prefix))
    }

    fn verify_argon2(&self, password: &str, password_hash: &str) -> bool {
        let parsed = match PasswordHash::new(password_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "stored password hash is not a valid PHC string");
                return false;
            }
        };

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => true,
            Err(argon2::password_hash::Error::Password) => false,
            Err(e) => {
                warn!(error = %e, "stored password hash could not be verified");
                false
            }
        }
    }

    fn verify_bcrypt(password: &str, password_hash: &str) -> bool {
        match bcrypt::verify(password, password_hash) {
            Ok(matched) => matched,
            Err(e) => {
                warn!(error = %e, "stored bcrypt hash could not be verified");
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        Self::hash_with(&self.argon2, password)
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        if Self::is_bcrypt(password_hash) {
            Ok(Self::verify_bcrypt(password, password_hash))
        } else {
            Ok(self.verify_argon2(password, password_hash))
        }
    }

    async fn verify_dummy(&self, password: &str) {
        let _ = self.verify_argon2(password, &self.dummy_hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> Argon2PasswordHasher {
        Argon2PasswordHasher::with_params(1024, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn argon2_hash_verifies_only_the_original_password() {
        let hasher = hasher();
        let hash = hasher.hash_password("correct horse").await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify_password("correct horse", &hash).await.unwrap());
        assert!(!hasher.verify_password("battery staple", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn hashes_are_salted() {
        let hasher = hasher();
        let a = hasher.hash_password("same").await.unwrap();
        let b = hasher.hash_password("same").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn legacy_bcrypt_hashes_are_accepted() {
        let hasher = hasher();
        let hash = bcrypt::hash("legacy-password", 4).unwrap();

        assert!(hasher.verify_password("legacy-password", &hash).await.unwrap());
        assert!(!hasher.verify_password("other", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_is_a_mismatch_not_an_error() {
        let hasher = hasher();
        assert!(!hasher.verify_password("x", "not-a-hash").await.unwrap());
        assert!(!hasher.verify_password("x", "$2b$garbage").await.unwrap());
        assert!(!hasher.verify_password("x", "").await.unwrap());
    }
}
