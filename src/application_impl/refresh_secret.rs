use crate::application_port::{AuthError, SecretGenerator};
use crate::domain_model::{SessionId, TokenHash};
use hmac::{Hmac, KeyInit, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Session ids are UUIDv4, refresh secrets are alphanumeric strings drawn from
/// the operating system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSecretGenerator;

impl SecretGenerator for OsSecretGenerator {
    fn session_id(&self) -> SessionId {
        SessionId::new_random()
    }

    fn refresh_secret(&self, len: usize) -> String {
        OsRng
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }
}

/// HMAC-SHA256 over opaque token secrets. Only the hex digest is persisted.
#[derive(Clone)]
pub struct RefreshTokenHasher {
    key: Vec<u8>,
}

impl RefreshTokenHasher {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    pub fn hash(&self, secret: &str) -> Result<TokenHash, AuthError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key)
            .map_err(|e| AuthError::Internal(format!("refresh token key: {e}")))?;
        mac.update(secret.as_bytes());
        let out = mac.finalize().into_bytes();
        Ok(TokenHash(hex::encode(out)))
    }
}

/// Cache key for an access token's revocation marker. The raw token never
/// leaves the process; its SHA-256 digest stands in for it.
pub fn revocation_key(prefix: &str, access_token: &str) -> String {
    let digest = Sha256::digest(access_token.as_bytes());
    format!("{}{}", prefix, hex::encode(digest))
}
