// libs/appointment-cell/src/models.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use patient_cell::PatientError;
use shared_database::StoreError;
use shared_models::error::AppError;
use shared_models::scheduling::{AppointmentStatus, ConsultationType, NewPatient};
use shared_utils::time::display_time;

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub doctor_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub date_time: Option<String>,
    pub phone: Option<String>,
    pub reason: Option<String>,
    pub appointment_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest {
    pub new_date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminAppointmentsQuery {
    pub status: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// A validated booking request.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub doctor_id: Uuid,
    pub patient: NewPatient,
    pub start: NaiveDateTime,
    pub appointment_type: ConsultationType,
    pub reason: Option<String>,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct BookingConfirmation {
    pub id: Uuid,
    pub message: String,
    pub doctor_name: String,
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RescheduleConfirmation {
    pub message: String,
    pub new_date: String,
    pub reschedule_count: i32,
}

/// Read-only flags derived from status, time and review presence.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct AppointmentFlags {
    pub can_review: bool,
    pub can_reschedule: bool,
    pub can_cancel: bool,
    pub is_upcoming: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientAppointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub specialty: String,
    pub date: String,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub appointment_type: ConsultationType,
    pub reschedule_count: i32,
    #[serde(flatten)]
    pub flags: AppointmentFlags,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetails {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub specialty: String,
    pub date: String,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub appointment_type: ConsultationType,
    pub patient_email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpcomingAppointment {
    pub id: Uuid,
    pub doctor_name: String,
    pub date: String,
    pub hours_until: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminAppointment {
    pub id: Uuid,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: String,
    pub doctor_name: String,
    pub doctor_id: Uuid,
    pub date: String,
    pub status: AppointmentStatus,
    pub reason: String,
    pub appointment_type: ConsultationType,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminAppointmentPage {
    pub appointments: Vec<AdminAppointment>,
    pub total: usize,
    pub pages: usize,
    pub current_page: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DashboardTotals {
    pub total_doctors: usize,
    pub total_patients: usize,
    pub total_appointments: usize,
    pub scheduled_appointments: usize,
    pub completed_appointments: usize,
    pub cancelled_appointments: usize,
    pub total_reviews: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentAppointment {
    pub id: Uuid,
    pub patient_name: String,
    pub doctor_name: String,
    pub date: String,
    pub status: AppointmentStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub stats: DashboardTotals,
    pub recent_appointments: Vec<RecentAppointment>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error(
        "This time slot overlaps with an existing appointment. The doctor already has an appointment at {}.",
        clock(.existing_start)
    )]
    Overlap { existing_start: NaiveDateTime },

    #[error("{0}")]
    ValidationError(String),

    #[error(transparent)]
    Patient(#[from] PatientError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn clock(at: &NaiveDateTime) -> String {
    display_time(*at)
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound | AppointmentError::DoctorNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::Overlap { .. } => AppError::Conflict(err.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::Patient(patient_err) => patient_err.into(),
            AppointmentError::Store(store_err) => store_err.into(),
        }
    }
}
