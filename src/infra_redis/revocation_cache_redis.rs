use crate::application_port::*;
use crate::domain_port::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

/// Revocation markers as plain Redis keys with an `EX` expiry.
pub struct RedisRevocationCache {
    conn: ConnectionManager,
}

impl RedisRevocationCache {
    pub fn new(conn: ConnectionManager) -> Self {
        RedisRevocationCache { conn }
    }

    fn ttl_secs(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }
}

fn cache_err(e: redis::RedisError) -> AuthError {
    AuthError::CacheUnavailable(e.to_string())
}

#[async_trait::async_trait]
impl RevocationCache for RedisRevocationCache {
    async fn set_with_ttl(&self, key: &str, ttl: Duration) -> Result<(), AuthError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(key, 1, Self::ttl_secs(ttl))
            .await
            .map_err(cache_err)?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, AuthError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(Self::ttl_secs(ttl))
            .query_async(&mut conn)
            .await
            .map_err(cache_err)?;
        Ok(reply.is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, AuthError> {
        let mut conn = self.conn.clone();
        let found: bool = conn.exists(key).await.map_err(cache_err)?;
        Ok(found)
    }

    async fn delete(&self, key: &str) -> Result<(), AuthError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await.map_err(cache_err)?;
        Ok(())
    }

    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> Result<bool, AuthError> {
        let mut conn = self.conn.clone();
        let updated: bool = conn
            .expire(key, Self::ttl_secs(ttl) as i64)
            .await
            .map_err(cache_err)?;
        Ok(updated)
    }
}
