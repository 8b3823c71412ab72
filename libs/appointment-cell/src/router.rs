// libs/appointment-cell/src/router.rs
use axum::{
    Router,
    routing::{delete, get, post},
    middleware,
};

use shared_utils::extractor::admin_auth_middleware;
use shared_utils::AppState;

use crate::handlers;

pub fn appointment_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/appointments", get(handlers::list_appointments).post(handlers::create_appointment))
        .route("/appointments/upcoming", get(handlers::upcoming_appointments))
        .route("/appointments/{appointment_id}", get(handlers::get_appointment))
        .route("/appointments/{appointment_id}/reschedule", post(handlers::reschedule_appointment))
        .route("/appointments/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/appointments/{appointment_id}/complete", post(handlers::complete_appointment));

    let admin_routes = Router::new()
        .route("/admin/stats", get(handlers::admin_stats))
        .route("/admin/appointments", get(handlers::admin_list_appointments))
        .route("/admin/appointments/{appointment_id}", delete(handlers::admin_delete_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
