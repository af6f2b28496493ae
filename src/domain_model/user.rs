use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct UserId(pub uuid::Uuid);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(UserId)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Suspended => "suspended",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown user status: {0}")]
pub struct UnknownUserStatus(pub String);

impl std::str::FromStr for UserStatus {
    type Err = UnknownUserStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            "suspended" => Ok(UserStatus::Suspended),
            other => Err(UnknownUserStatus(other.to_string())),
        }
    }
}

/// A user as seen by the authentication core. Owned by the user directory;
/// this crate never writes it.
#[derive(Clone)]
pub struct UserRecord {
    pub user_id: UserId,
    pub email: String,
    pub password_hash: String,
    pub status: UserStatus,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none() && self.status == UserStatus::Active
    }
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("status", &self.status)
            .field("deleted_at", &self.deleted_at)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(status: UserStatus, deleted_at: Option<DateTime<Utc>>) -> UserRecord {
        UserRecord {
            user_id: UserId(uuid::Uuid::new_v4()),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            status,
            deleted_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn only_active_undeleted_users_are_active() {
        assert!(user(UserStatus::Active, None).is_active());
        assert!(!user(UserStatus::Inactive, None).is_active());
        assert!(!user(UserStatus::Suspended, None).is_active());
        assert!(!user(UserStatus::Active, Some(Utc::now())).is_active());
    }

    #[test]
    fn debug_output_hides_password_hash() {
        let rendered = format!("{:?}", user(UserStatus::Active, None));
        assert!(!rendered.contains("argon2id"));
        assert!(rendered.contains("alice@example.com"));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [UserStatus::Active, UserStatus::Inactive, UserStatus::Suspended] {
            assert_eq!(status.as_str().parse::<UserStatus>().unwrap(), status);
        }
        assert!("deleted".parse::<UserStatus>().is_err());
    }
}
