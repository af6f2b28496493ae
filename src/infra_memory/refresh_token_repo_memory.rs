use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Default)]
pub struct MemoryRefreshTokenRepo {
    records: DashMap<TokenHash, RefreshTokenRecord>,
    next_id: AtomicI64,
}

impl MemoryRefreshTokenRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record as-is, for fixtures that the engine would never write.
    pub fn insert_record(&self, record: RefreshTokenRecord) {
        self.records.insert(record.token_hash.clone(), record);
    }

    pub fn records(&self) -> Vec<RefreshTokenRecord> {
        let mut all: Vec<_> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by_key(|r| r.id);
        all
    }

    pub fn live_in_session(&self, session_id: SessionId, now: DateTime<Utc>) -> usize {
        self.records
            .iter()
            .filter(|r| r.session_id == Some(session_id) && r.is_live_at(now))
            .count()
    }

    fn expire_where(&self, now: DateTime<Utc>, matches: impl Fn(&RefreshTokenRecord) -> bool) -> u64 {
        let mut touched = 0;
        for mut record in self.records.iter_mut() {
            if matches(&record) && record.is_live_at(now) {
                record.expire_at = Some(now);
                touched += 1;
            }
        }
        touched
    }
}

#[async_trait::async_trait]
impl RefreshTokenRepo for MemoryRefreshTokenRepo {
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, AuthError> {
        match self.records.entry(token.token_hash.clone()) {
            Entry::Occupied(_) => Err(AuthError::Internal("refresh token hash collision".into())),
            Entry::Vacant(slot) => {
                let record = RefreshTokenRecord {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
                    user_id: token.user_id,
                    session_id: Some(token.session_id),
                    token_type: token.token_type,
                    token_hash: token.token_hash,
                    expire_at: Some(token.expire_at),
                    created_at: token.created_at,
                };
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn create_in_tx(
        &self,
        _tx: &mut dyn StorageTx,
        token: NewRefreshToken,
    ) -> Result<RefreshTokenRecord, AuthError> {
        self.create(token).await
    }

    async fn find_by_hash(
        &self,
        token_hash: &TokenHash,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        Ok(self.records.get(token_hash).map(|r| r.value().clone()))
    }

    async fn find_active_by_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        Ok(self
            .records
            .iter()
            .filter(|r| {
                r.user_id == user_id
                    && r.session_id == Some(session_id)
                    && r.token_type == token_type
                    && r.is_live_at(now)
            })
            .max_by_key(|r| r.id)
            .map(|r| r.value().clone()))
    }

    async fn invalidate_by_session(
        &self,
        session_id: SessionId,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> Result<u64, AuthError> {
        Ok(self.expire_where(now, |r| {
            r.session_id == Some(session_id) && r.token_type == token_type
        }))
    }

    async fn invalidate_by_session_in_tx(
        &self,
        _tx: &mut dyn StorageTx,
        session_id: SessionId,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> Result<u64, AuthError> {
        self.invalidate_by_session(session_id, token_type, now).await
    }

    async fn invalidate_by_user(
        &self,
        user_id: UserId,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> Result<u64, AuthError> {
        Ok(self.expire_where(now, |r| r.user_id == user_id && r.token_type == token_type))
    }
}
