use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::net::IpAddr;

#[derive(Default)]
pub struct MemoryFailedLoginRepo {
    attempts: DashMap<UserId, Vec<FailedLoginRecord>>,
}

impl MemoryFailedLoginRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts_of(&self, user_id: UserId) -> Vec<FailedLoginRecord> {
        self.attempts
            .get(&user_id)
            .map(|a| a.value().clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl FailedLoginRepo for MemoryFailedLoginRepo {
    async fn record(
        &self,
        user_id: UserId,
        client_ip: Option<IpAddr>,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        self.attempts
            .entry(user_id)
            .or_default()
            .push(FailedLoginRecord {
                user_id,
                client_ip,
                created_at: at,
            });
        Ok(())
    }

    async fn count_since(&self, user_id: UserId, since: DateTime<Utc>) -> Result<u64, AuthError> {
        let count = self
            .attempts
            .get(&user_id)
            .map(|a| a.iter().filter(|r| r.created_at >= since).count())
            .unwrap_or(0);
        Ok(count as u64)
    }
}
