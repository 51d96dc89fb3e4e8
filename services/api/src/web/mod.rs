pub mod auth;
pub mod middleware;
pub mod redraft;
pub mod rest;
pub mod state;

// Re-export the pieces the binary needs to build the web server router.
pub use middleware::require_admin;
pub use rest::ApiDoc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use state::AppState;
use std::sync::Arc;
use utoipa::ToSchema;

/// The standard JSON error body returned by the API.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// Assembles the application's routes around the shared state.
///
/// The client list and the redraft endpoint are public (the redraft form
/// needs both without a login); client mutations are admin-only.
pub fn api_router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/verify", get(auth::verify_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/clients", get(rest::list_clients_handler))
        .route("/clients/{id}", get(rest::get_client_handler))
        .route("/redraft", post(redraft::redraft_handler));

    let protected_routes = Router::new()
        .route("/clients", post(rest::create_client_handler))
        .route(
            "/clients/{id}",
            put(rest::update_client_handler).delete(rest::delete_client_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_admin,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
