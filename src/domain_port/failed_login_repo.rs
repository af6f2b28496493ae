use crate::application_port::*;
use crate::domain_model::*;
use chrono::{DateTime, Utc};
use std::net::IpAddr;

#[async_trait::async_trait]
pub trait FailedLoginRepo: Send + Sync {
    async fn record(
        &self,
        user_id: UserId,
        client_ip: Option<IpAddr>,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// Failed attempts recorded at or after `since`.
    async fn count_since(&self, user_id: UserId, since: DateTime<Utc>) -> Result<u64, AuthError>;
}
