use super::refresh_secret::{OsSecretGenerator, RefreshTokenHasher, revocation_key};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a refresh exchange retires the old session and stores the new one.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RotationMode {
    /// Invalidate and insert inside one store transaction.
    Transactional,
    /// Two independent statements. A concurrent logout may observe the state
    /// between them.
    Sequential,
}

#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub window: Duration,
}

/// Shortest refresh secret accepted from configuration: about 256 bits over
/// the 62-symbol alphabet.
pub const MIN_REFRESH_SECRET_LEN: usize = 43;

/// Engine policy. The access token lifetime is not part of it: it belongs to
/// the token codec and is read back from each token's `exp` claim.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub refresh_ttl: Duration,
    pub refresh_secret_len: usize,
    pub revocation_prefix: String,
    pub rotation: RotationMode,
    /// `None` keeps the failed-attempt counter informational only.
    pub lockout: Option<LockoutPolicy>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            refresh_ttl: Duration::minutes(24 * 60),
            refresh_secret_len: MIN_REFRESH_SECRET_LEN,
            revocation_prefix: "revoked:".to_string(),
            rotation: RotationMode::Transactional,
            lockout: Some(LockoutPolicy {
                max_attempts: 5,
                window: Duration::minutes(15),
            }),
        }
    }
}

/// Storage collaborators of the engine.
#[derive(Clone)]
pub struct AuthStores {
    pub user_repo: Arc<dyn UserRepo>,
    pub refresh_token_repo: Arc<dyn RefreshTokenRepo>,
    pub failed_login_repo: Arc<dyn FailedLoginRepo>,
    pub revocation_cache: Arc<dyn RevocationCache>,
    pub tx_manager: Arc<dyn TxManager>,
}

/// The session lifecycle engine: login, refresh rotation, logout and access
/// token verification. It alone owns the one-live-refresh-token-per-session
/// and revoked-tokens-never-verify rules; the stores only persist.
pub struct RealAuthService {
    stores: AuthStores,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    token_hasher: RefreshTokenHasher,
    secret_generator: Arc<dyn SecretGenerator>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl RealAuthService {
    pub fn new(
        stores: AuthStores,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        token_hasher: RefreshTokenHasher,
        config: SessionConfig,
    ) -> Self {
        Self {
            stores,
            credential_hasher,
            token_codec,
            token_hasher,
            secret_generator: Arc::new(OsSecretGenerator),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_secret_generator(mut self, secret_generator: Arc<dyn SecretGenerator>) -> Self {
        self.secret_generator = secret_generator;
        self
    }

    /// The marker must outlive the token it revokes, so it lasts exactly as
    /// long as the token's own `exp` allows.
    fn revocation_ttl(claims: &AccessClaims, now: DateTime<Utc>) -> std::time::Duration {
        std::time::Duration::from_secs(claims.remaining_secs_at(now).max(1))
    }

    async fn check_lockout(
        &self,
        user: &UserRecord,
        now: DateTime<Utc>,
        ctx: &RequestContext,
    ) -> Result<(), AuthError> {
        let Some(policy) = self.config.lockout else {
            return Ok(());
        };

        let failures = ctx
            .guard(
                "failed_login.count_since",
                self.stores
                    .failed_login_repo
                    .count_since(user.user_id, now - policy.window),
            )
            .await?;

        if failures >= u64::from(policy.max_attempts) {
            warn!(user_id = %user.user_id, failures, "login refused: too many failed attempts");
            return Err(AuthError::TooManyAttempts {
                max: policy.max_attempts,
            });
        }
        Ok(())
    }

    async fn load_active_user(
        &self,
        user_id: UserId,
        ctx: &RequestContext,
    ) -> Result<UserRecord, AuthError> {
        let user = ctx
            .guard("user.find_by_id", self.stores.user_repo.find_by_id(user_id))
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !user.is_active() {
            debug!(user_id = %user.user_id, status = %user.status, "user is not active");
            return Err(AuthError::UserInactive);
        }
        Ok(user)
    }

    /// Issue a new access/refresh pair under a brand-new session id. When
    /// `previous` is given the old session is retired in the same step; if it
    /// was already retired by a concurrent request the exchange fails.
    async fn issue_session(
        &self,
        user: &UserRecord,
        previous: Option<SessionId>,
        now: DateTime<Utc>,
        ctx: &RequestContext,
    ) -> Result<AuthTokens, AuthError> {
        let session_id = self.secret_generator.session_id();

        let (access_token, claims) = self
            .token_codec
            .issue_access_token(user.user_id, &user.email, session_id, now)
            .await?;
        let access_exp = claims
            .expires_at()
            .ok_or_else(|| AuthError::Internal("access token expiry out of range".into()))?;

        let refresh_secret = self
            .secret_generator
            .refresh_secret(self.config.refresh_secret_len);
        let refresh_exp = now + self.config.refresh_ttl;
        let new_token = NewRefreshToken {
            user_id: user.user_id,
            session_id,
            token_type: TokenType::Refresh,
            token_hash: self.token_hasher.hash(&refresh_secret)?,
            expire_at: refresh_exp,
            created_at: now,
        };

        match self.config.rotation {
            RotationMode::Transactional => {
                self.store_rotation_in_tx(previous, new_token, now, ctx)
                    .await?
            }
            RotationMode::Sequential => self.store_rotation(previous, new_token, now, ctx).await?,
        }

        Ok(AuthTokens {
            access_token,
            refresh_token: RefreshToken(refresh_secret),
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
            session_id,
        })
    }

    async fn store_rotation(
        &self,
        previous: Option<SessionId>,
        new_token: NewRefreshToken,
        now: DateTime<Utc>,
        ctx: &RequestContext,
    ) -> Result<(), AuthError> {
        let repo = &self.stores.refresh_token_repo;

        if let Some(previous) = previous {
            let retired = ctx
                .guard(
                    "refresh_token.invalidate_by_session",
                    repo.invalidate_by_session(previous, TokenType::Refresh, now),
                )
                .await?;
            if retired == 0 {
                debug!(session_id = %previous, "session already retired by a concurrent request");
                return Err(AuthError::TokenExpired);
            }
        }

        // a fresh session id has nothing live; kept so the invariant holds even on reuse
        ctx.guard(
            "refresh_token.invalidate_by_session",
            repo.invalidate_by_session(new_token.session_id, TokenType::Refresh, now),
        )
        .await?;

        ctx.guard("refresh_token.create", repo.create(new_token))
            .await?;
        Ok(())
    }

    async fn store_rotation_in_tx(
        &self,
        previous: Option<SessionId>,
        new_token: NewRefreshToken,
        now: DateTime<Utc>,
        ctx: &RequestContext,
    ) -> Result<(), AuthError> {
        let mut tx = ctx
            .guard("tx.begin", async {
                self.stores
                    .tx_manager
                    .begin()
                    .await
                    .map_err(|e| AuthError::StoreUnavailable(e.to_string()))
            })
            .await?;

        match self
            .rotate_within(&mut *tx, previous, new_token, now, ctx)
            .await
        {
            Ok(()) => {
                ctx.guard("tx.commit", async move {
                    tx.commit()
                        .await
                        .map_err(|e| AuthError::StoreUnavailable(e.to_string()))
                })
                .await
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "rotation rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn rotate_within(
        &self,
        tx: &mut dyn StorageTx,
        previous: Option<SessionId>,
        new_token: NewRefreshToken,
        now: DateTime<Utc>,
        ctx: &RequestContext,
    ) -> Result<(), AuthError> {
        let repo = &self.stores.refresh_token_repo;

        if let Some(previous) = previous {
            let retired = ctx
                .guard(
                    "refresh_token.invalidate_by_session",
                    repo.invalidate_by_session_in_tx(&mut *tx, previous, TokenType::Refresh, now),
                )
                .await?;
            if retired == 0 {
                debug!(session_id = %previous, "session already retired by a concurrent request");
                return Err(AuthError::TokenExpired);
            }
        }

        ctx.guard(
            "refresh_token.invalidate_by_session",
            repo.invalidate_by_session_in_tx(
                &mut *tx,
                new_token.session_id,
                TokenType::Refresh,
                now,
            ),
        )
        .await?;

        ctx.guard(
            "refresh_token.create",
            repo.create_in_tx(&mut *tx, new_token),
        )
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn login(
        &self,
        request: LoginInput,
        ctx: &RequestContext,
    ) -> Result<LoginResult, AuthError> {
        let LoginInput { email, password } = request;

        let user = ctx
            .guard("user.find_by_email", self.stores.user_repo.find_by_email(&email))
            .await?;
        let Some(user) = user else {
            // same work as a real check so absent users are not cheaper to probe
            self.credential_hasher.verify_dummy(&password).await;
            debug!("login rejected: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let now = self.clock.now();
        self.check_lockout(&user, now, ctx).await?;

        let ok = self
            .credential_hasher
            .verify_password(&password, &user.password_hash)
            .await?;
        if !ok {
            ctx.guard(
                "failed_login.record",
                self.stores
                    .failed_login_repo
                    .record(user.user_id, ctx.client_ip(), now),
            )
            .await?;
            info!(user_id = %user.user_id, client_ip = ?ctx.client_ip(), "login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active() {
            info!(user_id = %user.user_id, status = %user.status, "login rejected: user inactive");
            return Err(AuthError::UserInactive);
        }

        let tokens = self.issue_session(&user, None, now, ctx).await?;
        info!(user_id = %user.user_id, session_id = %tokens.session_id, "login succeeded");

        Ok(LoginResult {
            user_id: user.user_id,
            tokens,
        })
    }

    async fn refresh_token(
        &self,
        refresh_token: &str,
        ctx: &RequestContext,
    ) -> Result<AuthTokens, AuthError> {
        let token_hash = self.token_hasher.hash(refresh_token)?;

        let record = ctx
            .guard(
                "refresh_token.find_by_hash",
                self.stores.refresh_token_repo.find_by_hash(&token_hash),
            )
            .await?
            .ok_or(AuthError::TokenNotFound)?;

        if record.token_type != TokenType::Refresh {
            debug!(token_type = %record.token_type, "refresh rejected: wrong token type");
            return Err(AuthError::WrongTokenType);
        }

        let now = self.clock.now();
        if !record.is_live_at(now) {
            debug!(user_id = %record.user_id, "refresh rejected: token expired");
            return Err(AuthError::TokenExpired);
        }

        let Some(previous) = record.session_id else {
            // rotation is session-scoped; a record without a session cannot be retired safely
            warn!(record_id = record.id, "refresh record carries no session id");
            return Err(AuthError::TokenNotFound);
        };

        let user = self.load_active_user(record.user_id, ctx).await?;
        let tokens = self.issue_session(&user, Some(previous), now, ctx).await?;
        info!(
            user_id = %user.user_id,
            previous_session_id = %previous,
            session_id = %tokens.session_id,
            "refresh token rotated"
        );

        Ok(tokens)
    }

    async fn logout(&self, access_token: &str, ctx: &RequestContext) -> Result<(), AuthError> {
        let claims = self
            .token_codec
            .parse_access_token(access_token)
            .await
            .map_err(|e| {
                debug!(error = %e, "logout with unreadable access token");
                AuthError::from(e)
            })?;

        let key = revocation_key(&self.config.revocation_prefix, access_token);
        let already_revoked = ctx
            .guard("revocation.exists", self.stores.revocation_cache.exists(&key))
            .await?;
        if already_revoked {
            debug!(session_id = %claims.sid, "access token already revoked");
            return Ok(());
        }

        let now = self.clock.now();

        // retire the refresh side first so a failure below leaves nothing that can mint new tokens
        let retired = ctx
            .guard(
                "refresh_token.invalidate_by_session",
                self.stores
                    .refresh_token_repo
                    .invalidate_by_session(claims.sid, TokenType::Refresh, now),
            )
            .await?;

        if !claims.is_expired_at(now) {
            let ttl = Self::revocation_ttl(&claims, now);
            ctx.guard(
                "revocation.set_if_absent",
                self.stores.revocation_cache.set_if_absent(&key, ttl),
            )
            .await?;
        }

        info!(
            user_id = %claims.user_id,
            session_id = %claims.sid,
            retired,
            "session logged out"
        );
        Ok(())
    }

    async fn verify_token(
        &self,
        access_token: &str,
        ctx: &RequestContext,
    ) -> Result<UserIdentity, AuthError> {
        let claims = self.token_codec.parse_access_token(access_token).await?;

        let now = self.clock.now();
        if claims.is_expired_at(now) {
            return Err(AuthError::TokenExpired);
        }
        if claims.is_premature_at(now) {
            return Err(AuthError::TokenNotYetValid);
        }

        let key = revocation_key(&self.config.revocation_prefix, access_token);
        let revoked = ctx
            .guard("revocation.exists", self.stores.revocation_cache.exists(&key))
            .await?;
        if revoked {
            debug!(session_id = %claims.sid, "access token revoked");
            return Err(AuthError::TokenRevoked);
        }

        let user = self.load_active_user(claims.user_id, ctx).await?;

        Ok(UserIdentity {
            user_id: user.user_id,
            email: user.email,
            session_id: claims.sid,
        })
    }

    async fn logout_all(&self, user_id: UserId, ctx: &RequestContext) -> Result<u64, AuthError> {
        let now = self.clock.now();
        let retired = ctx
            .guard(
                "refresh_token.invalidate_by_user",
                self.stores
                    .refresh_token_repo
                    .invalidate_by_user(user_id, TokenType::Refresh, now),
            )
            .await?;
        info!(user_id = %user_id, retired, "all sessions logged out");
        Ok(retired)
    }
}
