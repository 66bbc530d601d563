use axum::Router;
use axum::routing::post;

use crate::auth;
use crate::state::AppState;

pub(super) fn build_passkey_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/auth/webauthn/register/start",
            post(auth::webauthn_registration_start_handler),
        )
        .route(
            "/auth/webauthn/register/finish",
            post(auth::webauthn_registration_finish_handler),
        )
        .route(
            "/auth/webauthn/login/start",
            post(auth::webauthn_login_start_handler),
        )
        .route(
            "/auth/webauthn/login/finish",
            post(auth::webauthn_login_finish_handler),
        )
        .route("/auth/logout", post(auth::logout_handler))
}
