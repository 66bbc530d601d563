use keyshare_core::{AppError, AppResult};

/// Generates a cryptographically random grant token as lowercase hex.
pub(super) fn generate_token() -> AppResult<String> {
    use std::fmt::Write;

    let mut bytes = [0u8; 32];
    getrandom::fill(&mut bytes)
        .map_err(|error| AppError::Internal(format!("failed to generate grant token: {error}")))?;

    Ok(bytes
        .iter()
        .fold(String::with_capacity(64), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        }))
}
