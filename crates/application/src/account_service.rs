//! Account lookup and self-session start after a passkey ceremony.

use std::sync::Arc;

use keyshare_core::{AppError, AppResult, UserId};
use keyshare_domain::EmailAddress;
use tracing::info;

use crate::{
    Clock, DelegatedSessionIssuer, IssuedSession, LoginAuditRepository, LoginContext,
    NewLoginAudit, UserDirectory, UserRecord,
};

/// Account record and whether this call created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredAccount {
    /// Account record.
    pub account: UserRecord,
    /// Whether the account was created by this call.
    pub created: bool,
}

/// Application service for accounts and their own sessions.
#[derive(Clone)]
pub struct AccountService {
    user_directory: Arc<dyn UserDirectory>,
    login_audit: Arc<dyn LoginAuditRepository>,
    session_issuer: DelegatedSessionIssuer,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    /// Creates a new account service.
    #[must_use]
    pub fn new(
        user_directory: Arc<dyn UserDirectory>,
        login_audit: Arc<dyn LoginAuditRepository>,
        session_issuer: DelegatedSessionIssuer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            user_directory,
            login_audit,
            session_issuer,
            clock,
        }
    }

    /// Finds the account for an email, creating it when absent.
    pub async fn ensure_account(&self, email: &str) -> AppResult<EnsuredAccount> {
        let email = EmailAddress::new(email)?;

        if let Some(account) = self.user_directory.find_by_email(&email).await? {
            return Ok(EnsuredAccount {
                account,
                created: false,
            });
        }

        let account = self.user_directory.create_user(&email).await?;
        info!(user_id = %account.id, "account created");

        Ok(EnsuredAccount {
            account,
            created: true,
        })
    }

    /// Finds an existing account by email.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let email = EmailAddress::new(email)?;
        self.user_directory.find_by_email(&email).await
    }

    /// Loads an account by identifier.
    pub async fn find_account(&self, user_id: UserId) -> AppResult<UserRecord> {
        self.user_directory
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("account not found".to_owned()))
    }

    /// Issues a self session after a successful passkey ceremony and
    /// records the login.
    pub async fn start_session(
        &self,
        user_id: UserId,
        context: LoginContext,
    ) -> AppResult<IssuedSession> {
        let session = self.session_issuer.issue(user_id, user_id, None).await?;

        self.login_audit
            .record_login(
                NewLoginAudit::for_claims(&session.claims, context),
                self.clock.now(),
            )
            .await?;

        Ok(session)
    }
}
