use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use keyshare_core::AppError;
use tower_http::trace::TraceLayer;
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::PostgresStore;

use crate::state::AppState;
use crate::{auth, handlers, middleware};

mod admin;
mod cors;
mod public_auth;

#[cfg(test)]
mod tests;

pub fn build_router(
    app_state: AppState,
    frontend_url: &str,
    session_layer: SessionManagerLayer<PostgresStore>,
) -> Result<Router, AppError> {
    let cors_layer = cors::build_cors_layer(frontend_url)?;

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route(
            "/access/share/initialize",
            post(handlers::access::initialize_share_handler),
        )
        .route(
            "/access/share/begin-create-account-with-grant",
            post(handlers::access::begin_create_account_with_grant_handler),
        )
        .route(
            "/access/share/finish-create-account-with-grant",
            post(handlers::access::finish_create_account_with_grant_handler),
        )
        .route(
            "/access/relations/guest",
            get(handlers::relations::list_guest_relations_handler),
        )
        .route(
            "/access/relations/parent",
            get(handlers::relations::list_parent_relations_handler),
        )
        .route(
            "/access/relations/overview",
            get(handlers::relations::relation_overview_handler),
        )
        .route(
            "/access/relations/assume",
            post(handlers::relations::assume_relation_handler),
        )
        .route(
            "/access/relations/release",
            post(handlers::relations::release_relation_handler),
        )
        .route(
            "/access/relations/{relation_id}",
            delete(handlers::relations::revoke_relation_handler),
        )
        .route(
            "/posts",
            get(handlers::posts::list_posts_handler).post(handlers::posts::create_post_handler),
        )
        .route(
            "/posts/{post_id}",
            put(handlers::posts::update_post_handler).delete(handlers::posts::remove_post_handler),
        )
        .route(
            "/ws/{grant_id}",
            get(handlers::pairing::pairing_socket_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_session,
        ));

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route(
            "/access/share/{grant_id}",
            get(handlers::access::redemption_check_handler),
        )
        .merge(public_auth::build_passkey_routes())
        .merge(protected_routes)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_same_origin_for_mutations,
        ))
        .merge(admin::build_admin_routes(app_state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .layer(session_layer)
        .with_state(app_state))
}
