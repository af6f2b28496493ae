use crate::application_port::*;
use std::time::Duration;

/// Key/expiry store. Values are presence flags; only the key and TTL matter.
#[async_trait::async_trait]
pub trait RevocationCache: Send + Sync {
    async fn set_with_ttl(&self, key: &str, ttl: Duration) -> Result<(), AuthError>;

    /// Atomic set-if-absent. Returns `false` when the key was already present.
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, AuthError>;

    async fn exists(&self, key: &str) -> Result<bool, AuthError>;

    async fn delete(&self, key: &str) -> Result<(), AuthError>;

    /// Returns `false` when the key does not exist.
    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> Result<bool, AuthError>;
}
