use serde::Serialize;
use ts_rs::TS;

/// Error body returned by every failing route.
///
/// `code` is stable across releases; `message` is for people.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "error-response.ts")]
pub struct ErrorResponse {
    code: String,
    message: String,
}

impl ErrorResponse {
    pub(super) fn new(code: &str, message: String) -> Self {
        Self {
            code: code.to_owned(),
            message,
        }
    }
}
