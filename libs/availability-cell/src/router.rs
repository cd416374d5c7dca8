// libs/availability-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn availability_routes(state: Arc<AppConfig>) -> Router {
    // All availability operations require authentication; role checks
    // (client vs user) happen per handler.
    let protected_routes = Router::new()
        .route("/", post(handlers::create_slot).get(handlers::list_my_slots))
        .route("/weekly", post(handlers::create_weekly_availability))
        .route("/clients", get(handlers::list_clients_with_availability))
        .route("/clients/{client_id}", get(handlers::get_client_availability))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
