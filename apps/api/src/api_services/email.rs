use std::sync::Arc;

use keyshare_application::EmailService;
use keyshare_core::AppResult;
use keyshare_infrastructure::{ConsoleEmailService, SmtpEmailConfig, SmtpEmailService};
use tracing::info;

use crate::api_config::{EmailProviderConfig, SmtpRuntimeConfig};

/// Picks the channel that delivers share invitations.
pub(super) fn build_email_service(
    provider: &EmailProviderConfig,
) -> AppResult<Arc<dyn EmailService>> {
    match provider {
        EmailProviderConfig::Console => {
            info!("share invitations are written to the log");
            Ok(Arc::new(ConsoleEmailService::new()))
        }
        EmailProviderConfig::Smtp(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "share invitations are sent over smtp");
            Ok(Arc::new(SmtpEmailService::new(smtp_email_config(smtp))?))
        }
    }
}

fn smtp_email_config(smtp: &SmtpRuntimeConfig) -> SmtpEmailConfig {
    SmtpEmailConfig {
        host: smtp.host.clone(),
        port: smtp.port,
        username: smtp.username.clone(),
        password: smtp.password.clone(),
        from_address: smtp.from_address.clone(),
    }
}
