use crate::application_port::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::time::Duration;

/// Expiring keys held in process. Expiry is judged against the injected
/// clock, so tests can move time forward.
pub struct MemoryRevocationCache {
    entries: DashMap<String, DateTime<Utc>>,
    clock: Arc<dyn Clock>,
}

impl MemoryRevocationCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemoryRevocationCache {
            entries: DashMap::new(),
            clock,
        }
    }

    fn expiry(&self, ttl: Duration) -> Result<DateTime<Utc>, AuthError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AuthError::Internal(format!("revocation ttl: {e}")))?;
        Ok(self.clock.now() + ttl)
    }

    /// Remaining lifetime of a key, `None` when absent or expired.
    pub fn ttl_of(&self, key: &str) -> Option<chrono::Duration> {
        let now = self.clock.now();
        self.entries
            .get(key)
            .map(|exp| *exp - now)
            .filter(|left| *left > chrono::Duration::zero())
    }
}

#[async_trait::async_trait]
impl RevocationCache for MemoryRevocationCache {
    async fn set_with_ttl(&self, key: &str, ttl: Duration) -> Result<(), AuthError> {
        let expire_at = self.expiry(ttl)?;
        self.entries.insert(key.to_string(), expire_at);
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, AuthError> {
        let now = self.clock.now();
        let expire_at = self.expiry(ttl)?;
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() > now {
                    return Ok(false);
                }
                entry.insert(expire_at);
                Ok(true)
            }
            Entry::Vacant(slot) => {
                slot.insert(expire_at);
                Ok(true)
            }
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, AuthError> {
        let now = self.clock.now();
        let live = self.entries.get(key).map(|exp| *exp > now);
        match live {
            Some(true) => Ok(true),
            Some(false) => {
                self.entries.remove_if(key, |_, exp| *exp <= now);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), AuthError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> Result<bool, AuthError> {
        let now = self.clock.now();
        let expire_at = self.expiry(ttl)?;
        match self.entries.get_mut(key) {
            Some(mut exp) if *exp > now => {
                *exp = expire_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::ManualClock;

    #[tokio::test]
    async fn keys_expire_with_the_clock() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = MemoryRevocationCache::new(clock.clone());

        assert!(cache.set_if_absent("k", Duration::from_secs(10)).await.unwrap());
        assert!(!cache.set_if_absent("k", Duration::from_secs(10)).await.unwrap());
        assert!(cache.exists("k").await.unwrap());

        clock.advance(chrono::Duration::seconds(10));
        assert!(!cache.exists("k").await.unwrap());
        assert!(cache.set_if_absent("k", Duration::from_secs(5)).await.unwrap());
    }

    #[tokio::test]
    async fn refresh_ttl_only_extends_live_keys() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = MemoryRevocationCache::new(clock.clone());

        assert!(!cache.refresh_ttl("missing", Duration::from_secs(5)).await.unwrap());

        cache.set_with_ttl("k", Duration::from_secs(5)).await.unwrap();
        clock.advance(chrono::Duration::seconds(4));
        assert!(cache.refresh_ttl("k", Duration::from_secs(5)).await.unwrap());
        clock.advance(chrono::Duration::seconds(4));
        assert!(cache.exists("k").await.unwrap());

        cache.delete("k").await.unwrap();
        assert!(!cache.exists("k").await.unwrap());
    }
}
