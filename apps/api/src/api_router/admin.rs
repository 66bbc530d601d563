use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};

use crate::state::AppState;
use crate::{handlers, middleware};

// Token-authenticated; kept outside the browser origin checks.
pub(super) fn build_admin_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/admin/users/{user_id}/grants/deactivate",
            post(handlers::admin::deactivate_user_grants_handler),
        )
        .route(
            "/admin/users/{user_id}/grants",
            get(handlers::admin::list_user_relations_handler),
        )
        .route(
            "/admin/users/{user_id}/logins",
            get(handlers::admin::list_user_logins_handler),
        )
        .route_layer(from_fn_with_state(app_state, middleware::require_admin_token))
}
