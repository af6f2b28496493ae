use super::util::{store_err, user_id_from_bytes};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }

    fn row_to_record(row: MySqlRow) -> Result<UserRecord, AuthError> {
        let user_id_bytes: Vec<u8> = row.try_get("user_id").map_err(store_err)?;
        let status: String = row.try_get("status").map_err(store_err)?;
        let status = status
            .parse::<UserStatus>()
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let deleted_at: Option<DateTime<Utc>> = row.try_get("deleted_at").map_err(store_err)?;

        Ok(UserRecord {
            user_id: user_id_from_bytes(&user_id_bytes)?,
            email: row.try_get("email").map_err(store_err)?,
            password_hash: row.try_get("password_hash").map_err(store_err)?,
            status,
            deleted_at,
            created_at: row.try_get("created_at").map_err(store_err)?,
        })
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        let row = sqlx::query(
            r#"
SELECT user_id, email, password_hash, status, deleted_at, created_at
FROM app_user
WHERE email = ? AND deleted_at IS NULL
"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(Self::row_to_record).transpose()
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError> {
        let row = sqlx::query(
            r#"
SELECT user_id, email, password_hash, status, deleted_at, created_at
FROM app_user
WHERE user_id = ?
"#,
        )
        .bind(user_id.0.as_bytes() as &[u8])
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(Self::row_to_record).transpose()
    }
}
