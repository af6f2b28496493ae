use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub http: Http,
    pub log: Log,
    #[serde(default)]
    pub mysql: Option<MySql>,
    #[serde(default)]
    pub redis: Option<Redis>,
    #[serde(default)]
    pub memory: Memory,
}

#[derive(Deserialize)]
pub struct Auth {
    pub backend: String, // "memory" or "real"
    pub issuer: String,
    pub jwt_secret: String,
    pub refresh_hash_key: String,
    #[serde(default = "default_access_ttl_mins")]
    pub access_ttl_mins: i64,
    #[serde(default = "default_refresh_ttl_mins")]
    pub refresh_ttl_mins: i64,
    #[serde(default = "default_refresh_secret_len")]
    pub refresh_secret_len: usize,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default = "default_revocation_prefix")]
    pub revocation_prefix: String,
    #[serde(default)]
    pub lockout: Lockout,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("backend", &self.backend)
            .field("issuer", &self.issuer)
            .field("jwt_secret", &"<redacted>")
            .field("refresh_hash_key", &"<redacted>")
            .field("access_ttl_mins", &self.access_ttl_mins)
            .field("refresh_ttl_mins", &self.refresh_ttl_mins)
            .field("refresh_secret_len", &self.refresh_secret_len)
            .field("rotation", &self.rotation)
            .field("revocation_prefix", &self.revocation_prefix)
            .field("lockout", &self.lockout)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    Transactional,
    Sequential,
}

#[derive(Debug, Deserialize)]
pub struct Lockout {
    pub enabled: bool,
    pub max_failed_attempts: u32,
    pub window_mins: i64,
}

impl Default for Lockout {
    fn default() -> Self {
        Lockout {
            enabled: true,
            max_failed_attempts: 5,
            window_mins: 15,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Deserialize)]
pub struct MySql {
    pub dsn: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl fmt::Debug for MySql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySql")
            .field("dsn", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Deserialize)]
pub struct Redis {
    pub dsn: String,
}

impl fmt::Debug for Redis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Redis").field("dsn", &"<redacted>").finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Memory {
    #[serde(default)]
    pub seed_users: Vec<SeedUser>,
}

#[derive(Deserialize)]
pub struct SeedUser {
    pub email: String,
    pub password: String,
    #[serde(default = "default_seed_status")]
    pub status: String,
}

impl fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedUser")
            .field("email", &self.email)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

fn default_access_ttl_mins() -> i64 {
    15
}

fn default_refresh_ttl_mins() -> i64 {
    24 * 60
}

fn default_refresh_secret_len() -> usize {
    43
}

fn default_revocation_prefix() -> String {
    "revoked:".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_max_connections() -> u32 {
    10
}

fn default_seed_status() -> String {
    "active".to_string()
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Environment variables override the file, e.g. `SESSIONGATE__AUTH__JWT_SECRET`.
pub const ENV_PREFIX: &str = "SESSIONGATE";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
