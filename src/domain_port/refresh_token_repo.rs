use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::repo_tx::StorageTx;
use chrono::{DateTime, Utc};

/// Persistence for opaque token records, keyed by the keyed hash of the secret.
///
/// Invalidation never deletes rows: it sets `expire_at` to `now` on every record
/// that is still live at `now` and reports how many it touched.
#[async_trait::async_trait]
pub trait RefreshTokenRepo: Send + Sync {
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, AuthError>;

    async fn create_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        token: NewRefreshToken,
    ) -> Result<RefreshTokenRecord, AuthError>;

    async fn find_by_hash(
        &self,
        token_hash: &TokenHash,
    ) -> Result<Option<RefreshTokenRecord>, AuthError>;

    async fn find_active_by_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>, AuthError>;

    async fn invalidate_by_session(
        &self,
        session_id: SessionId,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> Result<u64, AuthError>;

    async fn invalidate_by_session_in_tx(
        &self,
        tx: &mut dyn StorageTx,
        session_id: SessionId,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> Result<u64, AuthError>;

    async fn invalidate_by_user(
        &self,
        user_id: UserId,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> Result<u64, AuthError>;
}
