use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_utils::extractor::admin_auth_middleware;
use shared_utils::AppState;

use crate::handlers;

pub fn doctor_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/specialties", get(handlers::list_specialties))
        .route("/doctors", get(handlers::list_doctors))
        .route("/doctors/search", get(handlers::search_doctors))
        .route("/doctors/{doctor_id}", get(handlers::get_doctor))
        .route("/doctors/{doctor_id}/availability", get(handlers::get_weekly_availability))
        .route("/doctors/{doctor_id}/reviews", get(handlers::get_doctor_reviews))
        .route("/available-slots", get(handlers::get_available_slots))
        .route("/reviews", post(handlers::submit_review));

    let admin_routes = Router::new()
        .route("/admin/doctors", get(handlers::admin_list_doctors).post(handlers::admin_create_doctor))
        .route(
            "/admin/doctors/{doctor_id}",
            put(handlers::admin_update_doctor).delete(handlers::admin_delete_doctor),
        )
        .route("/admin/doctors/{doctor_id}/availability/{day}", put(handlers::admin_set_availability))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
