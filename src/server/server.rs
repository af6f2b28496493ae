use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::{self, Settings};
use anyhow::{Context, anyhow};
use chrono::{Duration, Utc};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    request_timeout: std::time::Duration,
    cancel: CancellationToken,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub fn new(auth_service: Arc<dyn AuthService>, request_timeout: std::time::Duration) -> Self {
        Server {
            auth_service,
            request_timeout,
            cancel: CancellationToken::new(),
            pool: None,
        }
    }

    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let auth = &settings.auth;
        validate_auth(auth)?;

        let credential_hasher = Arc::new(Argon2PasswordHasher::new()?);
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: auth.issuer.clone(),
            access_ttl: Duration::minutes(auth.access_ttl_mins),
            signing_key: auth.jwt_secret.clone().into_bytes(),
        }));
        let token_hasher = RefreshTokenHasher::new(auth.refresh_hash_key.clone().into_bytes());
        let session_config = session_config(auth);

        let (stores, pool) = match auth.backend.as_str() {
            "memory" => (memory_stores(settings, credential_hasher.as_ref()).await?, None),
            "real" => {
                let (stores, pool) = real_stores(settings).await?;
                (stores, Some(pool))
            }
            other => return Err(anyhow!("Unknown auth backend: {}", other)),
        };

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            stores,
            credential_hasher,
            token_codec,
            token_hasher,
            session_config,
        ));

        info!(backend = %auth.backend, "server started");

        Ok(Self {
            auth_service,
            request_timeout: std::time::Duration::from_millis(settings.http.request_timeout_ms),
            cancel: CancellationToken::new(),
            pool,
        })
    }

    /// A fresh context for one request. Cancelled when the server shuts down.
    pub fn request_context(&self) -> RequestContext {
        RequestContext::new(self.cancel.child_token()).with_timeout(self.request_timeout)
    }

    /// Cancels every context handed out by `request_context`, in flight or not.
    pub fn cancel_requests(&self) {
        self.cancel.cancel();
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel_requests();

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

/// Longest lifetime accepted for any token, in minutes (366 days).
const MAX_TTL_MINS: i64 = 366 * 24 * 60;

fn validate_auth(auth: &settings::Auth) -> anyhow::Result<()> {
    if auth.jwt_secret.is_empty() || auth.refresh_hash_key.is_empty() {
        return Err(anyhow!("auth.jwt_secret and auth.refresh_hash_key must be set"));
    }
    if auth.refresh_secret_len < MIN_REFRESH_SECRET_LEN {
        return Err(anyhow!(
            "auth.refresh_secret_len must be at least {}, got {}",
            MIN_REFRESH_SECRET_LEN,
            auth.refresh_secret_len
        ));
    }
    for (name, mins) in [
        ("auth.access_ttl_mins", auth.access_ttl_mins),
        ("auth.refresh_ttl_mins", auth.refresh_ttl_mins),
    ] {
        if !(1..=MAX_TTL_MINS).contains(&mins) {
            return Err(anyhow!("{} must be within 1..={}, got {}", name, MAX_TTL_MINS, mins));
        }
    }
    if auth.lockout.enabled {
        if auth.lockout.max_failed_attempts == 0 {
            return Err(anyhow!("auth.lockout.max_failed_attempts must be positive"));
        }
        if !(1..=MAX_TTL_MINS).contains(&auth.lockout.window_mins) {
            return Err(anyhow!(
                "auth.lockout.window_mins must be within 1..={}, got {}",
                MAX_TTL_MINS,
                auth.lockout.window_mins
            ));
        }
    }
    Ok(())
}

fn session_config(auth: &settings::Auth) -> SessionConfig {
    SessionConfig {
        refresh_ttl: Duration::minutes(auth.refresh_ttl_mins),
        refresh_secret_len: auth.refresh_secret_len,
        revocation_prefix: auth.revocation_prefix.clone(),
        rotation: match auth.rotation {
            settings::Rotation::Transactional => RotationMode::Transactional,
            settings::Rotation::Sequential => RotationMode::Sequential,
        },
        lockout: auth.lockout.enabled.then(|| LockoutPolicy {
            max_attempts: auth.lockout.max_failed_attempts,
            window: Duration::minutes(auth.lockout.window_mins),
        }),
    }
}

async fn real_stores(settings: &Settings) -> anyhow::Result<(AuthStores, Pool<MySql>)> {
    let mysql = settings
        .mysql
        .as_ref()
        .ok_or_else(|| anyhow!("the real backend needs a [mysql] section"))?;
    let redis = settings
        .redis
        .as_ref()
        .ok_or_else(|| anyhow!("the real backend needs a [redis] section"))?;

    let redis_client = redis::Client::open(redis.dsn.as_str())?;
    let redis_manager = redis_client
        .get_connection_manager()
        .await
        .context("connect to redis")?;

    let pool = MySqlPoolOptions::new()
        .max_connections(mysql.max_connections)
        .connect(&mysql.dsn)
        .await
        .context("connect to mysql")?;

    let stores = AuthStores {
        user_repo: Arc::new(MySqlUserRepo::new(pool.clone())),
        refresh_token_repo: Arc::new(MySqlRefreshTokenRepo::new(pool.clone())),
        failed_login_repo: Arc::new(MySqlFailedLoginRepo::new(pool.clone())),
        revocation_cache: Arc::new(RedisRevocationCache::new(redis_manager)),
        tx_manager: Arc::new(MySqlTxManager::new(pool.clone())),
    };
    Ok((stores, pool))
}

async fn memory_stores(
    settings: &Settings,
    credential_hasher: &dyn CredentialHasher,
) -> anyhow::Result<AuthStores> {
    let user_repo = MemoryUserRepo::new();
    for seed in &settings.memory.seed_users {
        let status: UserStatus = seed.status.parse()?;
        let password_hash = credential_hasher.hash_password(&seed.password).await?;
        user_repo.insert(UserRecord {
            user_id: UserId(uuid::Uuid::new_v4()),
            email: seed.email.clone(),
            password_hash,
            status,
            deleted_at: None,
            created_at: Utc::now(),
        });
        debug!(email = %seed.email, %status, "seeded user");
    }

    Ok(AuthStores {
        user_repo: Arc::new(user_repo),
        refresh_token_repo: Arc::new(MemoryRefreshTokenRepo::new()),
        failed_login_repo: Arc::new(MemoryFailedLoginRepo::new()),
        revocation_cache: Arc::new(MemoryRevocationCache::new(Arc::new(SystemClock))),
        tx_manager: Arc::new(MemoryTxManager),
    })
}
