use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryUserRepo {
    users: DashMap<UserId, UserRecord>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user.
    pub fn insert(&self, user: UserRecord) {
        self.users.insert(user.user_id, user);
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.email == email && u.deleted_at.is_none())
            .map(|u| u.value().clone()))
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.users.get(&user_id).map(|u| u.value().clone()))
    }
}
