#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use sessiongate::application_impl::*;
use sessiongate::application_port::*;
use sessiongate::domain_model::*;
use sessiongate::domain_port::Clock;
use sessiongate::infra_memory::*;
use std::sync::Arc;

pub const JWT_SECRET: &[u8] = b"integration-jwt-secret";
pub const HASH_KEY: &[u8] = b"integration-hash-key";
pub const ISSUER: &str = "sessiongate-test";

pub const ALICE: &str = "alice@example.com";
pub const ALICE_PW: &str = "alice-password";

/// The real engine over in-memory stores and a hand-driven clock.
pub struct Harness {
    pub service: Arc<RealAuthService>,
    pub clock: Arc<ManualClock>,
    pub users: Arc<MemoryUserRepo>,
    pub tokens: Arc<MemoryRefreshTokenRepo>,
    pub failed_logins: Arc<MemoryFailedLoginRepo>,
    pub cache: Arc<MemoryRevocationCache>,
    pub hasher: Arc<Argon2PasswordHasher>,
    pub config: SessionConfig,
}

pub fn start_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub fn jwt_config(secret: &[u8]) -> JwtConfig {
    jwt_config_with_ttl(secret, Duration::minutes(15))
}

pub fn jwt_config_with_ttl(secret: &[u8], access_ttl: Duration) -> JwtConfig {
    JwtConfig {
        issuer: ISSUER.to_string(),
        access_ttl,
        signing_key: secret.to_vec(),
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self::with_access_ttl(config, Duration::minutes(15))
    }

    pub fn with_access_ttl(config: SessionConfig, access_ttl: Duration) -> Self {
        let clock = Arc::new(ManualClock::new(start_time()));
        let users = Arc::new(MemoryUserRepo::new());
        let tokens = Arc::new(MemoryRefreshTokenRepo::new());
        let failed_logins = Arc::new(MemoryFailedLoginRepo::new());
        let cache = Arc::new(MemoryRevocationCache::new(clock.clone()));
        let hasher = Arc::new(Argon2PasswordHasher::with_params(1024, 1, 1).unwrap());

        let stores = AuthStores {
            user_repo: users.clone(),
            refresh_token_repo: tokens.clone(),
            failed_login_repo: failed_logins.clone(),
            revocation_cache: cache.clone(),
            tx_manager: Arc::new(MemoryTxManager),
        };
        let service = RealAuthService::new(
            stores,
            hasher.clone(),
            Arc::new(JwtHs256Codec::new(jwt_config_with_ttl(JWT_SECRET, access_ttl))),
            RefreshTokenHasher::new(HASH_KEY),
            config.clone(),
        )
        .with_clock(clock.clone());

        Harness {
            service: Arc::new(service),
            clock,
            users,
            tokens,
            failed_logins,
            cache,
            hasher,
            config,
        }
    }

    pub async fn add_user(&self, email: &str, password: &str, status: UserStatus) -> UserId {
        let user_id = UserId(uuid::Uuid::new_v4());
        self.users.insert(UserRecord {
            user_id,
            email: email.to_string(),
            password_hash: self.hasher.hash_password(password).await.unwrap(),
            status,
            deleted_at: None,
            created_at: self.clock.now(),
        });
        user_id
    }

    pub async fn alice(&self) -> UserId {
        self.add_user(ALICE, ALICE_PW, UserStatus::Active).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AuthError> {
        self.service
            .login(
                LoginInput {
                    email: email.to_string(),
                    password: password.to_string(),
                },
                &RequestContext::background(),
            )
            .await
    }

    pub fn hash_of(&self, secret: &str) -> TokenHash {
        RefreshTokenHasher::new(HASH_KEY).hash(secret).unwrap()
    }
}
