use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::scheduling::Specialty;
use shared_utils::time::{self, parse_date};
use shared_utils::validation::{optional, parse_uuid, required};
use shared_utils::AppState;

use crate::models::{
    AdminDoctorResponse, AvailableSlot, CreateDoctorRequest, DoctorResponse, DoctorSummary,
    ReviewResponse, SetAvailabilityRequest, SubmitReviewRequest, UpdateDoctorRequest,
    WeeklyScheduleResponse,
};
use crate::services::{AvailabilityService, DoctorService, NewReview, ReviewService};

#[derive(Debug, Deserialize)]
pub struct DoctorListQuery {
    pub specialty_id: Option<String>,
    pub patient_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AvailableSlotsQuery {
    pub doctor_id: Option<String>,
    pub date: Option<String>,
    /// Ignored; every consultation type shares the same slots.
    pub appointment_type: Option<String>,
}

fn doctor_service(state: &AppState) -> DoctorService {
    DoctorService::new(state.store.clone(), state.locks.clone())
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

pub async fn list_specialties(
    State(state): State<AppState>,
) -> Result<Json<Vec<Specialty>>, AppError> {
    Ok(Json(doctor_service(&state).list_specialties().await?))
}

pub async fn list_doctors(
    State(state): State<AppState>,
    Query(query): Query<DoctorListQuery>,
) -> Result<Json<Vec<DoctorResponse>>, AppError> {
    let specialty_id = match optional(query.specialty_id) {
        Some(raw) => Some(parse_uuid("specialty_id", &raw)?),
        None => None,
    };
    let patient_email = optional(query.patient_email);

    let doctors = doctor_service(&state)
        .list_doctors(specialty_id, patient_email.as_deref())
        .await?;
    Ok(Json(doctors))
}

pub async fn search_doctors(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<DoctorSummary>>, AppError> {
    let q = query.q.unwrap_or_default();
    Ok(Json(doctor_service(&state).search_doctors(&q).await?))
}

pub async fn get_doctor(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<DoctorResponse>, AppError> {
    Ok(Json(doctor_service(&state).get_doctor(doctor_id).await?))
}

pub async fn get_weekly_availability(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<WeeklyScheduleResponse>, AppError> {
    let service = AvailabilityService::new(state.store.clone());
    Ok(Json(service.get_weekly_schedule(doctor_id).await?))
}

pub async fn get_doctor_reviews(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Vec<ReviewResponse>>, AppError> {
    let service = ReviewService::new(state.store.clone(), state.locks.clone());
    Ok(Json(service.list_reviews(doctor_id).await?))
}

pub async fn get_available_slots(
    State(state): State<AppState>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Vec<AvailableSlot>>, AppError> {
    let doctor_id = parse_uuid("doctor_id", required("doctor_id", query.doctor_id.as_deref())?)?;
    let date = parse_date("date", required("date", query.date.as_deref())?)?;

    let service = AvailabilityService::new(state.store.clone());
    let schedule = service.get_available_slots(doctor_id, date, time::now()).await?;
    Ok(Json(schedule.slots()))
}

pub async fn submit_review(
    State(state): State<AppState>,
    Json(request): Json<SubmitReviewRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let review = NewReview {
        appointment_id: parse_uuid("appointmentId", required("appointmentId", request.appointment_id.as_deref())?)?,
        doctor_id: parse_uuid("doctorId", required("doctorId", request.doctor_id.as_deref())?)?,
        patient_id: parse_uuid("patientId", required("patientId", request.patient_id.as_deref())?)?,
        rating: request.rating
            .ok_or_else(|| AppError::ValidationError("rating is required".to_string()))?,
        comment: optional(request.comment),
    };

    let service = ReviewService::new(state.store.clone(), state.locks.clone());
    let stored = service.submit_review(review, time::now()).await?;

    Ok((StatusCode::CREATED, Json(json!({
        "id": stored.id,
        "message": "Review submitted successfully"
    }))))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

pub async fn admin_list_doctors(
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminDoctorResponse>>, AppError> {
    Ok(Json(doctor_service(&state).admin_list_doctors().await?))
}

pub async fn admin_create_doctor(
    State(state): State<AppState>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let doctor = doctor_service(&state).create_doctor(request).await?;

    Ok((StatusCode::CREATED, Json(json!({
        "id": doctor.id,
        "message": "Doctor added successfully",
        "full_name": doctor.full_name()
    }))))
}

pub async fn admin_update_doctor(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor = doctor_service(&state).update_doctor(doctor_id, request).await?;

    Ok(Json(json!({
        "message": "Doctor updated successfully",
        "doctor": {
            "id": doctor.id,
            "full_name": doctor.full_name,
            "email": doctor.email,
            "specialty": doctor.specialty
        }
    })))
}

pub async fn admin_delete_doctor(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let name = doctor_service(&state).delete_doctor(doctor_id).await?;
    Ok(Json(json!({ "message": format!("Doctor {} deleted successfully", name) })))
}

pub async fn admin_set_availability(
    State(state): State<AppState>,
    Path((doctor_id, day)): Path<(Uuid, i32)>,
    Json(request): Json<SetAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(state.store.clone());
    let entry = service.set_availability(doctor_id, day, request).await?;

    Ok(Json(json!({
        "message": "Availability updated",
        "day": entry.day_name(),
        "start": entry.start_time.format("%H:%M").to_string(),
        "end": entry.end_time.format("%H:%M").to_string(),
        "available": entry.is_available
    })))
}
