use keyshare_core::SessionClaims;
use keyshare_domain::{AccessGrant, EmailAddress, ExpiryPolicy};
use tracing::{info, warn};

use super::token_crypto::generate_token;
use super::*;
use crate::UserRecord;

/// Request to share an account.
#[derive(Debug, Clone)]
pub struct BeginShareInput {
    /// Expiry policy for the resulting relation.
    pub policy: ExpiryPolicy,
    /// Optional address that receives the redemption link.
    pub recipient_email: Option<String>,
}

/// A freshly created grant with its one-time token.
#[derive(Debug, Clone)]
pub struct ShareInvitation {
    /// Stored grant.
    pub grant: AccessGrant,
    /// Plaintext token; it is not kept anywhere after this is returned.
    pub token: String,
    /// Frontend link embedding the grant id and token.
    pub redemption_url: String,
}

impl GrantLifecycleService {
    /// Creates a grant on the caller's account.
    ///
    /// Only the primary holder may share an account. The plaintext token is
    /// returned once; only its salted hash is stored.
    pub async fn begin_share(
        &self,
        claims: &SessionClaims,
        input: BeginShareInput,
    ) -> AppResult<ShareInvitation> {
        let owner_id = claims.require_primary_holder()?;
        let owner = self
            .user_directory
            .find_user(owner_id)
            .await?
            .ok_or_else(|| AppError::NotFound("account not found".to_owned()))?;

        let recipient = input
            .recipient_email
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(EmailAddress::new)
            .transpose()?;

        let token = generate_token()?;
        let token_hash = self.secret_hasher.hash_secret(&token)?;
        let grant = AccessGrant::issue(
            owner_id,
            token_hash,
            self.grant_ttl_seconds,
            input.policy,
            self.clock.now(),
        )?;

        self.grant_store.create_grant(&grant).await?;

        let redemption_url = format!(
            "{}/share/{}?token={}",
            self.frontend_url.trim_end_matches('/'),
            grant.id(),
            token
        );

        info!(
            grant_id = %grant.id(),
            owner_id = %owner_id,
            ttl_seconds = grant.ttl_seconds(),
            expire_by_time = grant.policy().expire_by_time(),
            expire_by_logins = grant.policy().expire_by_logins(),
            "access grant created"
        );

        self.send_share_emails(&owner, recipient.as_ref(), &grant, &redemption_url)
            .await;

        Ok(ShareInvitation {
            grant,
            token,
            redemption_url,
        })
    }

    async fn send_share_emails(
        &self,
        owner: &UserRecord,
        recipient: Option<&EmailAddress>,
        grant: &AccessGrant,
        redemption_url: &str,
    ) {
        let expires_at = grant.expires_at().to_rfc3339();

        let owner_body = format!(
            "You started sharing access to your Keyshare account.\n\n\
             The invitation can be redeemed until {expires_at}.\n\n\
             If this was not you, deactivate your shared access immediately."
        );
        if let Err(error) = self
            .email_service
            .send_email(&owner.email, "You shared your Keyshare account", &owner_body)
            .await
        {
            warn!(grant_id = %grant.id(), error = %error, "failed to notify grant owner");
        }

        let Some(recipient) = recipient else {
            return;
        };

        let recipient_body = format!(
            "{} invited you to access their Keyshare account.\n\n\
             Open the link below to accept the invitation:\n{redemption_url}\n\n\
             This link expires at {expires_at}.",
            owner.email
        );
        if let Err(error) = self
            .email_service
            .send_email(
                recipient.as_str(),
                "You were invited to a shared Keyshare account",
                &recipient_body,
            )
            .await
        {
            warn!(grant_id = %grant.id(), error = %error, "failed to send grant invitation");
        }
    }
}
