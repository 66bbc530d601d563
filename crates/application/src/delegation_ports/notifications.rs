use async_trait::async_trait;
use keyshare_core::AppResult;

/// Port for sending emails. Infrastructure provides SMTP or console implementations.
#[async_trait]
pub trait EmailService: Send + Sync {
    /// Sends a plain-text email.
    async fn send_email(&self, to: &str, subject: &str, text_body: &str) -> AppResult<()>;
}
