use crate::application_port::*;
use crate::domain_model::*;

/// Read-only view of the user directory.
#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Only non-deleted users are returned.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError>;

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError>;
}
