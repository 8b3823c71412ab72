use serde::{Deserialize, Serialize};
use uuid::Uuid;

use doctor_cell::DoctorError;
use shared_database::StoreError;
use shared_models::error::AppError;

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToggleFavoriteRequest {
    pub email: Option<String>,
    pub doctor_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FavoriteToggle {
    pub favorited: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminPatientResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// `N/A` when no phone was given.
    pub phone: String,
    pub appointment_count: usize,
    /// Date of the latest appointment as `YYYY-MM-DD`, or `Never`.
    pub last_visit: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound | PatientError::DoctorNotFound => AppError::NotFound(err.to_string()),
            PatientError::Doctor(doctor_err) => doctor_err.into(),
            PatientError::Store(store_err) => store_err.into(),
        }
    }
}
