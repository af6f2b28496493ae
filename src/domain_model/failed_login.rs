use super::UserId;
use chrono::{DateTime, Utc};
use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct FailedLoginRecord {
    pub user_id: UserId,
    pub client_ip: Option<IpAddr>,
    pub created_at: DateTime<Utc>,
}
