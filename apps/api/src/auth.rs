//! Passkey authentication and session transport.

mod passkey;
mod request_context;
mod session;
mod session_cookie;

pub use passkey::{
    load_passkeys, webauthn_login_finish_handler, webauthn_login_start_handler,
    webauthn_registration_finish_handler, webauthn_registration_start_handler,
};
pub use request_context::extract_request_context;
pub use session::{issued_session_response, logout_handler, me_handler};
pub use session_cookie::{
    SESSION_COOKIE_NAME, bearer_token, cleared_session_cookie, session_cookie, session_token,
};

const SESSION_WEBAUTHN_REG_STATE_KEY: &str = "webauthn_reg_state";
const SESSION_WEBAUTHN_AUTH_STATE_KEY: &str = "webauthn_auth_state";
