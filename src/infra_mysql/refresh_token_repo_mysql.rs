use super::util::{downcast, is_dup_key, store_err, user_id_from_bytes, uuid_from_bytes};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlExecutor, MySqlPool, Row};

/// Opaque token records in `auth_token`. Rows are never deleted here;
/// invalidation stamps `expire_at` with the current time.
pub struct MySqlRefreshTokenRepo {
    pool: MySqlPool,
}

impl MySqlRefreshTokenRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlRefreshTokenRepo { pool }
    }

    fn row_to_record(row: MySqlRow) -> Result<RefreshTokenRecord, AuthError> {
        let user_id_bytes: Vec<u8> = row.try_get("user_id").map_err(store_err)?;
        let session_id_bytes: Option<Vec<u8>> = row.try_get("session_id").map_err(store_err)?;
        let token_type: String = row.try_get("token_type").map_err(store_err)?;
        let token_hash: String = row.try_get("token_hash").map_err(store_err)?;

        Ok(RefreshTokenRecord {
            id: row.try_get("id").map_err(store_err)?,
            user_id: user_id_from_bytes(&user_id_bytes)?,
            session_id: session_id_bytes
                .as_deref()
                .map(uuid_from_bytes)
                .transpose()?
                .map(SessionId),
            token_type: token_type
                .parse::<TokenType>()
                .map_err(|e| AuthError::Internal(e.to_string()))?,
            token_hash: TokenHash(token_hash),
            expire_at: row.try_get("expire_at").map_err(store_err)?,
            created_at: row.try_get("created_at").map_err(store_err)?,
        })
    }

    async fn insert<'e>(
        exec: impl MySqlExecutor<'e>,
        token: NewRefreshToken,
    ) -> Result<RefreshTokenRecord, AuthError> {
        let result = sqlx::query(
            r#"
INSERT INTO auth_token (user_id, session_id, token_type, token_hash, expire_at, created_at)
VALUES (?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(token.user_id.0.as_bytes() as &[u8])
        .bind(token.session_id.0.as_bytes() as &[u8])
        .bind(token.token_type.as_str())
        .bind(token.token_hash.as_str())
        .bind(token.expire_at)
        .bind(token.created_at)
        .execute(exec)
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                AuthError::Internal("refresh token hash collision".into())
            } else {
                store_err(e)
            }
        })?;

        Ok(RefreshTokenRecord {
            id: result.last_insert_id() as i64,
            user_id: token.user_id,
            session_id: Some(token.session_id),
            token_type: token.token_type,
            token_hash: token.token_hash,
            expire_at: Some(token.expire_at),
            created_at: token.created_at,
        })
    }

    async fn expire_session<'e>(
        exec: impl MySqlExecutor<'e>,
        session_id: SessionId,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> Result<u64, AuthError> {
        // `expire_at > now` makes a second invalidation at the same instant touch nothing
        let result = sqlx::query(
            r#"
UPDATE auth_token
SET expire_at = ?
WHERE session_id = ? AND token_type = ? AND expire_at > ?
"#,
        )
        .bind(now)
        .bind(session_id.0.as_bytes() as &[u8])
        .bind(token_type.as_str())
        .bind(now)
        .execute(exec)
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl RefreshTokenRepo for MySqlRefreshTokenRepo {
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, AuthError> {
        Self::insert(&self.pool, token).await
    }

    async fn create_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        token: NewRefreshToken,
    ) -> Result<RefreshTokenRecord, AuthError> {
        let tx = downcast(tx)?;
        Self::insert(tx.conn(), token).await
    }

    async fn find_by_hash(
        &self,
        token_hash: &TokenHash,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        let row = sqlx::query(
            r#"
SELECT id, user_id, session_id, token_type, token_hash, expire_at, created_at
FROM auth_token
WHERE token_hash = ?
"#,
        )
        .bind(token_hash.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(Self::row_to_record).transpose()
    }

    async fn find_active_by_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        let row = sqlx::query(
            r#"
SELECT id, user_id, session_id, token_type, token_hash, expire_at, created_at
FROM auth_token
WHERE user_id = ? AND session_id = ? AND token_type = ? AND expire_at > ?
ORDER BY id DESC
LIMIT 1
"#,
        )
        .bind(user_id.0.as_bytes() as &[u8])
        .bind(session_id.0.as_bytes() as &[u8])
        .bind(token_type.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(Self::row_to_record).transpose()
    }

    async fn invalidate_by_session(
        &self,
        session_id: SessionId,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> Result<u64, AuthError> {
        Self::expire_session(&self.pool, session_id, token_type, now).await
    }

    async fn invalidate_by_session_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        session_id: SessionId,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> Result<u64, AuthError> {
        let tx = downcast(tx)?;
        Self::expire_session(tx.conn(), session_id, token_type, now).await
    }

    async fn invalidate_by_user(
        &self,
        user_id: UserId,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> Result<u64, AuthError> {
        let result = sqlx::query(
            r#"
UPDATE auth_token
SET expire_at = ?
WHERE user_id = ? AND token_type = ? AND expire_at > ?
"#,
        )
        .bind(now)
        .bind(user_id.0.as_bytes() as &[u8])
        .bind(token_type.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected())
    }
}
