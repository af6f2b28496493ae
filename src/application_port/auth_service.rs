use super::RequestContext;
use crate::domain_model::{SessionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("token expired")]
    TokenExpired,
    #[error("token not yet valid")]
    TokenNotYetValid,
    #[error("token revoked")]
    TokenRevoked,
    #[error("token not found")]
    TokenNotFound,
    #[error("wrong token type")]
    WrongTokenType,
    #[error("token invalid")]
    InvalidToken,
    #[error("user not found")]
    UserNotFound,
    #[error("user inactive")]
    UserInactive,
    #[error("exceeded maximum login attempts of {max} times")]
    TooManyAttempts { max: u32 },
    #[error("store error: {0}")]
    StoreUnavailable(String),
    #[error("cache error: {0}")]
    CacheUnavailable(String),
    #[error("request cancelled")]
    Cancelled,
    #[error("request deadline exceeded")]
    DeadlineExceeded,
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Domain failures are answered with a generic "unauthorized"; everything
    /// else is an infrastructure failure scoped to the request.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::TokenExpired
                | AuthError::TokenNotYetValid
                | AuthError::TokenRevoked
                | AuthError::TokenNotFound
                | AuthError::WrongTokenType
                | AuthError::InvalidToken
                | AuthError::UserNotFound
                | AuthError::UserInactive
                | AuthError::TooManyAttempts { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("malformed token")]
    Malformed,
    #[error("bad token signature")]
    BadSignature,
    #[error("token signed with a different algorithm")]
    WrongAlgorithm,
}

impl From<CodecError> for AuthError {
    fn from(_: CodecError) -> Self {
        AuthError::InvalidToken
    }
}

#[derive(Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginInput")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user_id: UserId,
    pub tokens: AuthTokens,
}

#[derive(Clone, Serialize)]
#[serde(transparent)]
pub struct AccessToken(pub String);

#[derive(Clone, Serialize)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshToken(..)")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub session_id: SessionId,
}

/// Identity attached to a request after its access token has been verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    pub user_id: UserId,
    pub email: String,
    pub session_id: SessionId,
}

/// Claims carried by every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user_id: UserId,
    pub email: String,
    pub sid: SessionId,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub iss: String,
}

impl AccessClaims {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    pub fn is_premature_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() < self.nbf
    }

    /// Seconds left before `exp`, zero once expired.
    pub fn remaining_secs_at(&self, now: DateTime<Utc>) -> u64 {
        let remaining = self.exp - now.timestamp();
        if remaining > 0 { remaining as u64 } else { 0 }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    /// Sign a fresh access token for the given subject, valid from `now`.
    async fn issue_access_token(
        &self,
        user_id: UserId,
        email: &str,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> Result<(AccessToken, AccessClaims), AuthError>;

    /// Check signature, algorithm and issuer. Time windows are left to the caller.
    async fn parse_access_token(&self, token: &str) -> Result<AccessClaims, CodecError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    /// `Ok(false)` on mismatch and on unreadable hashes alike.
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
    /// Spend the cost of a real verification when there is no hash to check.
    async fn verify_dummy(&self, password: &str);
}

pub trait SecretGenerator: Send + Sync {
    fn session_id(&self) -> SessionId;
    fn refresh_secret(&self, len: usize) -> String;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn login(
        &self,
        request: LoginInput,
        ctx: &RequestContext,
    ) -> Result<LoginResult, AuthError>;
    async fn refresh_token(
        &self,
        refresh_token: &str,
        ctx: &RequestContext,
    ) -> Result<AuthTokens, AuthError>;
    async fn logout(&self, access_token: &str, ctx: &RequestContext) -> Result<(), AuthError>;
    async fn verify_token(
        &self,
        access_token: &str,
        ctx: &RequestContext,
    ) -> Result<UserIdentity, AuthError>;
    /// Expire every refresh token the user holds. Returns how many were live.
    async fn logout_all(&self, user_id: UserId, ctx: &RequestContext) -> Result<u64, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn claims(nbf: i64, exp: i64) -> AccessClaims {
        AccessClaims {
            user_id: UserId(uuid::Uuid::nil()),
            email: "a@b.c".to_string(),
            sid: SessionId(uuid::Uuid::nil()),
            iat: nbf,
            nbf,
            exp,
            iss: "test".to_string(),
        }
    }

    #[test]
    fn expiry_is_inclusive_of_exp_second() {
        let c = claims(100, 200);
        let at = |s| Utc.timestamp_opt(s, 0).unwrap();
        assert!(!c.is_expired_at(at(199)));
        assert!(c.is_expired_at(at(200)));
        assert!(c.is_premature_at(at(99)));
        assert!(!c.is_premature_at(at(100)));
        assert_eq!(c.remaining_secs_at(at(150)), 50);
        assert_eq!(c.remaining_secs_at(at(250)), 0);
    }

    #[test]
    fn domain_errors_are_separated_from_infrastructure() {
        assert!(AuthError::TooManyAttempts { max: 5 }.is_domain());
        assert!(AuthError::TokenRevoked.is_domain());
        assert!(!AuthError::StoreUnavailable("down".into()).is_domain());
        assert!(!AuthError::Cancelled.is_domain());
    }

    #[test]
    fn codec_errors_collapse_to_invalid_token() {
        for e in [
            CodecError::Malformed,
            CodecError::BadSignature,
            CodecError::WrongAlgorithm,
        ] {
            assert!(matches!(AuthError::from(e), AuthError::InvalidToken));
        }
    }

    #[test]
    fn login_input_debug_omits_password() {
        let input = LoginInput {
            email: "a@b.c".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{input:?}").contains("hunter2"));
    }
}
