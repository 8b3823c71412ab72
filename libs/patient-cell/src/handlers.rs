use axum::{
    extract::{Query, State},
    Json,
};

use doctor_cell::DoctorSummary;
use shared_models::error::AppError;
use shared_utils::time;
use shared_utils::validation::{optional, parse_uuid, required};
use shared_utils::AppState;

use crate::models::{AdminPatientResponse, EmailQuery, FavoriteToggle, ToggleFavoriteRequest};
use crate::services::{FavoritesService, PatientService};

fn favorites_service(state: &AppState) -> FavoritesService {
    FavoritesService::new(state.store.clone(), state.locks.clone())
}

pub async fn get_favorites(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Vec<DoctorSummary>>, AppError> {
    let Some(email) = optional(query.email) else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(favorites_service(&state).list_favorites(&email).await?))
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    Json(request): Json<ToggleFavoriteRequest>,
) -> Result<Json<FavoriteToggle>, AppError> {
    let email = required("email", request.email.as_deref())?;
    let doctor_id = parse_uuid("doctor_id", required("doctor_id", request.doctor_id.as_deref())?)?;

    let toggle = favorites_service(&state)
        .toggle_favorite(email, doctor_id, time::now())
        .await?;
    Ok(Json(toggle))
}

pub async fn admin_list_patients(
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminPatientResponse>>, AppError> {
    let service = PatientService::new(state.store.clone());
    Ok(Json(service.admin_list_patients().await?))
}
