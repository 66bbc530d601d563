use std::sync::Arc;

use keyshare_core::{AppError, AppResult};
use url::Url;
use webauthn_rs::{Webauthn, WebauthnBuilder};

const RELYING_PARTY_NAME: &str = "Keyshare";

/// Builds the relying party used by passkey ceremonies and grant approval.
///
/// The origin must sit on the relying party id or one of its subdomains.
pub(super) fn build_webauthn(rp_id: &str, rp_origin: &str) -> AppResult<Arc<Webauthn>> {
    let origin = Url::parse(rp_origin)
        .map_err(|error| AppError::Validation(format!("invalid WEBAUTHN_RP_ORIGIN: {error}")))?;

    let webauthn = WebauthnBuilder::new(rp_id, &origin)
        .map_err(|error| {
            AppError::Validation(format!(
                "WEBAUTHN_RP_ID '{rp_id}' does not match origin '{origin}': {error}"
            ))
        })?
        .rp_name(RELYING_PARTY_NAME)
        .build()
        .map_err(|error| AppError::Internal(format!("failed to initialize WebAuthn: {error}")))?;

    Ok(Arc::new(webauthn))
}

#[cfg(test)]
mod tests {
    use keyshare_core::AppError;

    use super::build_webauthn;

    #[test]
    fn origin_on_the_relying_party_domain_is_accepted() {
        assert!(build_webauthn("localhost", "http://localhost:3000").is_ok());
        assert!(build_webauthn("example.com", "https://app.example.com").is_ok());
    }

    #[test]
    fn foreign_or_malformed_origins_are_rejected() {
        assert!(matches!(
            build_webauthn("example.com", "https://evil.test"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            build_webauthn("example.com", "not a url"),
            Err(AppError::Validation(_))
        ));
    }
}
