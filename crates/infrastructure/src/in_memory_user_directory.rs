//! In-memory account directory for tests and single-process development.

use async_trait::async_trait;
use chrono::Utc;
use keyshare_application::{UserDirectory, UserRecord};
use keyshare_core::{AppError, AppResult, UserId};
use keyshare_domain::EmailAddress;
use tokio::sync::RwLock;

/// In-memory account directory.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<Vec<UserRecord>>,
}

impl InMemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|user| user.id == user_id)
            .cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> AppResult<Option<UserRecord>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|user| user.email == email.as_str())
            .cloned())
    }

    async fn create_user(&self, email: &EmailAddress) -> AppResult<UserRecord> {
        let mut users = self.users.write().await;

        if users.iter().any(|user| user.email == email.as_str()) {
            return Err(AppError::Conflict(
                "an account with this email already exists".to_owned(),
            ));
        }

        let record = UserRecord {
            id: UserId::new(),
            email: email.as_str().to_owned(),
            created_at: Utc::now(),
        };
        users.push(record.clone());
        Ok(record)
    }
}
