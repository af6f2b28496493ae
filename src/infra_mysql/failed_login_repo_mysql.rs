use super::util::store_err;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;
use std::net::IpAddr;

pub struct MySqlFailedLoginRepo {
    pool: MySqlPool,
}

impl MySqlFailedLoginRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlFailedLoginRepo { pool }
    }
}

#[async_trait::async_trait]
impl FailedLoginRepo for MySqlFailedLoginRepo {
    async fn record(
        &self,
        user_id: UserId,
        client_ip: Option<IpAddr>,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        sqlx::query(
            r#"
INSERT INTO failed_login (user_id, ip_address, created_at)
VALUES (?, ?, ?)
"#,
        )
        .bind(user_id.0.as_bytes() as &[u8])
        .bind(client_ip.map(|ip| ip.to_string()))
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn count_since(&self, user_id: UserId, since: DateTime<Utc>) -> Result<u64, AuthError> {
        let count: i64 = sqlx::query_scalar(
            r#"
SELECT COUNT(*)
FROM failed_login
WHERE user_id = ? AND created_at >= ?
"#,
        )
        .bind(user_id.0.as_bytes() as &[u8])
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(count.max(0) as u64)
    }
}
