use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::scheduling::{AppointmentStatus, ConsultationType, NewPatient};
use shared_utils::time::{self, parse_instant};
use shared_utils::validation::{optional, parse_uuid, required};
use shared_utils::AppState;

use crate::models::{
    AdminAppointmentPage, AdminAppointmentsQuery, AdminStats, AppointmentDetails, BookingConfirmation,
    CreateAppointmentRequest, EmailQuery, NewBooking, PatientAppointment, RescheduleConfirmation,
    RescheduleRequest, UpcomingAppointment,
};
use crate::services::booking::{AppointmentBookingService, DEFAULT_PAGE_SIZE};

fn booking_service(state: &AppState) -> AppointmentBookingService {
    AppointmentBookingService::new(state.store.clone(), state.locks.clone())
}

fn validate_booking(request: CreateAppointmentRequest) -> Result<NewBooking, AppError> {
    let doctor_id = parse_uuid("doctorId", required("doctorId", request.doctor_id.as_deref())?)?;
    let first_name = required("firstName", request.first_name.as_deref())?.to_string();
    let last_name = required("lastName", request.last_name.as_deref())?.to_string();
    let email = required("email", request.email.as_deref())?.to_string();
    let start = parse_instant("dateTime", required("dateTime", request.date_time.as_deref())?)?;

    let appointment_type = match optional(request.appointment_type) {
        Some(raw) => raw.parse::<ConsultationType>().map_err(AppError::ValidationError)?,
        None => ConsultationType::InPerson,
    };

    Ok(NewBooking {
        doctor_id,
        patient: NewPatient {
            first_name,
            last_name,
            email,
            phone: optional(request.phone),
        },
        start,
        appointment_type,
        reason: optional(request.reason),
    })
}

// ==============================================================================
// PATIENT-FACING HANDLERS
// ==============================================================================

pub async fn list_appointments(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Vec<PatientAppointment>>, AppError> {
    let email = required("email", query.email.as_deref())?;
    Ok(Json(booking_service(&state).list_for_patient(email, time::now()).await?))
}

pub async fn upcoming_appointments(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Vec<UpcomingAppointment>>, AppError> {
    let email = required("email", query.email.as_deref())?;
    Ok(Json(booking_service(&state).upcoming_for_patient(email, time::now()).await?))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<AppointmentDetails>, AppError> {
    Ok(Json(booking_service(&state).get_appointment(appointment_id).await?))
}

pub async fn create_appointment(
    State(state): State<AppState>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<BookingConfirmation>), AppError> {
    let booking = validate_booking(request)?;
    let confirmation = booking_service(&state)
        .create_appointment(booking, time::now())
        .await?;
    Ok((StatusCode::CREATED, Json(confirmation)))
}

pub async fn reschedule_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<RescheduleConfirmation>, AppError> {
    let new_start = parse_instant("newDateTime", request.new_date_time.as_deref().unwrap_or_default())?;
    Ok(Json(booking_service(&state).reschedule_appointment(appointment_id, new_start).await?))
}

pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    booking_service(&state).cancel_appointment(appointment_id).await?;
    Ok(Json(json!({ "message": "Appointment cancelled" })))
}

pub async fn complete_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    booking_service(&state).complete_appointment(appointment_id).await?;
    Ok(Json(json!({ "message": "Appointment marked as completed" })))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

pub async fn admin_stats(
    State(state): State<AppState>,
) -> Result<Json<AdminStats>, AppError> {
    Ok(Json(booking_service(&state).admin_stats().await?))
}

pub async fn admin_list_appointments(
    State(state): State<AppState>,
    Query(query): Query<AdminAppointmentsQuery>,
) -> Result<Json<AdminAppointmentPage>, AppError> {
    let status = match optional(query.status) {
        Some(raw) if raw != "all" => Some(raw.parse::<AppointmentStatus>().map_err(AppError::ValidationError)?),
        _ => None,
    };
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PAGE_SIZE);

    Ok(Json(booking_service(&state).admin_list_appointments(status, page, per_page).await?))
}

pub async fn admin_delete_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    booking_service(&state).delete_appointment(appointment_id).await?;
    Ok(Json(json!({ "message": "Appointment deleted successfully" })))
}
