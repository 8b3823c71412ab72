// libs/shared/database/src/store.rs
//
// Persistence contract consumed by the scheduling cells.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::scheduling::{
    Appointment, AppointmentStatus, Doctor, FavoriteDoctor, NewPatient, Patient, Review,
    Specialty, WeeklyAvailability,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Uniqueness violated: {0}")]
    Conflict(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Failed to decode stored record: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound { entity, id: id.to_string() }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => AppError::NotFound(err.to_string()),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Backend(msg) | StoreError::Decode(msg) => AppError::Database(msg),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Default)]
pub struct DoctorQuery {
    pub specialty_id: Option<Uuid>,
    /// Case-insensitive match against first name, last name or "first last".
    pub name_contains: Option<String>,
    pub ids: Option<Vec<Uuid>>,
    pub limit: Option<usize>,
}

impl DoctorQuery {
    pub fn named(needle: impl Into<String>) -> Self {
        Self { name_contains: Some(needle.into()), ..Self::default() }
    }

    /// Applies every filter except `limit`.
    pub fn matches(&self, doctor: &Doctor) -> bool {
        self.specialty_id.map_or(true, |id| doctor.specialty_id == id)
            && self.ids.as_ref().map_or(true, |ids| ids.contains(&doctor.id))
            && self.name_contains.as_ref().map_or(true, |needle| {
                let needle = needle.to_lowercase();
                let first = doctor.first_name.to_lowercase();
                let last = doctor.last_name.to_lowercase();
                first.contains(&needle)
                    || last.contains(&needle)
                    || format!("{} {}", first, last).contains(&needle)
            })
    }
}

/// Appointment filter. `from` is inclusive and `until` exclusive; results are ordered by
/// `appointment_date` ascending.
#[derive(Debug, Clone, Default)]
pub struct AppointmentQuery {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub exclude_status: Option<AppointmentStatus>,
    pub from: Option<NaiveDateTime>,
    pub until: Option<NaiveDateTime>,
}

impl AppointmentQuery {
    pub fn for_doctor(doctor_id: Uuid) -> Self {
        Self { doctor_id: Some(doctor_id), ..Self::default() }
    }

    pub fn for_patient(patient_id: Uuid) -> Self {
        Self { patient_id: Some(patient_id), ..Self::default() }
    }

    pub fn between(mut self, from: NaiveDateTime, until: NaiveDateTime) -> Self {
        self.from = Some(from);
        self.until = Some(until);
        self
    }

    pub fn with_status(mut self, status: AppointmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn excluding_status(mut self, status: AppointmentStatus) -> Self {
        self.exclude_status = Some(status);
        self
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.doctor_id.map_or(true, |id| appointment.doctor_id == id)
            && self.patient_id.map_or(true, |id| appointment.patient_id == id)
            && self.status.map_or(true, |status| appointment.status == status)
            && self.exclude_status.map_or(true, |status| appointment.status != status)
            && self.from.map_or(true, |from| appointment.appointment_date >= from)
            && self.until.map_or(true, |until| appointment.appointment_date < until)
    }
}

/// Storage gateway for every scheduling record.
///
/// Implementations must reject a second non-cancelled appointment for the same doctor at the same
/// instant (`StoreError::Conflict`), a second active availability entry for the same
/// (doctor, day), duplicate doctor or patient emails, a second review per appointment and a
/// duplicate (patient, doctor) favorite.
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    // Specialties
    async fn list_specialties(&self) -> StoreResult<Vec<Specialty>>;
    async fn find_specialty(&self, id: Uuid) -> StoreResult<Option<Specialty>>;
    async fn insert_specialty(&self, specialty: &Specialty) -> StoreResult<()>;

    // Doctors
    async fn list_doctors(&self, query: &DoctorQuery) -> StoreResult<Vec<Doctor>>;
    async fn find_doctor(&self, id: Uuid) -> StoreResult<Option<Doctor>>;
    async fn find_doctor_by_email(&self, email: &str) -> StoreResult<Option<Doctor>>;
    async fn insert_doctor(&self, doctor: &Doctor) -> StoreResult<()>;
    async fn update_doctor(&self, doctor: &Doctor) -> StoreResult<()>;
    /// Removes the doctor with its appointments, reviews, availability and favorites.
    async fn delete_doctor(&self, id: Uuid) -> StoreResult<()>;
    async fn save_doctor_rating(&self, doctor_id: Uuid, rating: f64, review_count: i32) -> StoreResult<()>;

    // Patients
    async fn find_patient(&self, id: Uuid) -> StoreResult<Option<Patient>>;
    async fn find_patient_by_email(&self, email: &str) -> StoreResult<Option<Patient>>;
    async fn create_patient(&self, patient: NewPatient) -> StoreResult<Patient>;
    async fn list_patients(&self) -> StoreResult<Vec<Patient>>;

    // Weekly availability
    async fn list_availability(
        &self,
        doctor_id: Uuid,
        day_of_week: Option<i32>,
    ) -> StoreResult<Vec<WeeklyAvailability>>;
    /// Inserts or replaces the entry with the same id.
    async fn save_availability(&self, entry: &WeeklyAvailability) -> StoreResult<()>;

    // Appointments
    async fn find_appointment(&self, id: Uuid) -> StoreResult<Option<Appointment>>;
    async fn list_appointments(&self, query: &AppointmentQuery) -> StoreResult<Vec<Appointment>>;
    async fn insert_appointment(&self, appointment: &Appointment) -> StoreResult<()>;
    async fn update_appointment(&self, appointment: &Appointment) -> StoreResult<()>;
    /// Removes the appointment and its review.
    async fn delete_appointment(&self, id: Uuid) -> StoreResult<()>;

    // Reviews
    /// Newest first.
    async fn list_reviews(&self, doctor_id: Uuid) -> StoreResult<Vec<Review>>;
    async fn find_review_by_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<Review>>;
    async fn insert_review(&self, review: &Review) -> StoreResult<()>;
    async fn count_reviews(&self) -> StoreResult<usize>;

    // Favorites
    async fn list_favorites(&self, patient_id: Uuid) -> StoreResult<Vec<FavoriteDoctor>>;
    async fn find_favorite(&self, patient_id: Uuid, doctor_id: Uuid) -> StoreResult<Option<FavoriteDoctor>>;
    async fn insert_favorite(&self, favorite: &FavoriteDoctor) -> StoreResult<()>;
    async fn delete_favorite(&self, id: Uuid) -> StoreResult<()>;
}
