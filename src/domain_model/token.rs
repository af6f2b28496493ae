use super::{SessionId, UserId};
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum TokenType {
    Refresh,
    PasswordReset,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Refresh => "refresh",
            TokenType::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown token type: {0}")]
pub struct UnknownTokenType(pub String);

impl std::str::FromStr for TokenType {
    type Err = UnknownTokenType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "refresh" => Ok(TokenType::Refresh),
            "password_reset" => Ok(TokenType::PasswordReset),
            other => Err(UnknownTokenType(other.to_string())),
        }
    }
}

/// Hex-encoded keyed hash of an opaque token secret. This is the only form in
/// which a refresh secret is ever stored.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct TokenHash(pub String);

impl TokenHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub token_type: TokenType,
    pub token_hash: TokenHash,
    pub expire_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub user_id: UserId,
    pub session_id: Option<SessionId>,
    pub token_type: TokenType,
    pub token_hash: TokenHash,
    /// `None` means the record has not been expired yet.
    pub expire_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    /// A record is live only while its expiry is set and strictly in the future.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expire_at, Some(expire_at) if expire_at > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(expire_at: Option<DateTime<Utc>>) -> RefreshTokenRecord {
        RefreshTokenRecord {
            id: 1,
            user_id: UserId(uuid::Uuid::new_v4()),
            session_id: Some(SessionId::new_random()),
            token_type: TokenType::Refresh,
            token_hash: TokenHash("ab".repeat(32)),
            expire_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn unset_or_past_expiry_is_not_live() {
        let now = Utc::now();
        assert!(!record(None).is_live_at(now));
        assert!(!record(Some(now)).is_live_at(now));
        assert!(!record(Some(now - Duration::seconds(1))).is_live_at(now));
        assert!(record(Some(now + Duration::seconds(1))).is_live_at(now));
    }

    #[test]
    fn token_type_parses_stored_values() {
        assert_eq!("refresh".parse::<TokenType>().unwrap(), TokenType::Refresh);
        assert_eq!(
            "password_reset".parse::<TokenType>().unwrap(),
            TokenType::PasswordReset
        );
        assert!("access".parse::<TokenType>().is_err());
    }
}
