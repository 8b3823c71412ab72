use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_utils::extractor::admin_auth_middleware;
use shared_utils::AppState;

use crate::handlers;

pub fn patient_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/favorites", get(handlers::get_favorites).post(handlers::toggle_favorite));

    let admin_routes = Router::new()
        .route("/admin/patients", get(handlers::admin_list_patients))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
