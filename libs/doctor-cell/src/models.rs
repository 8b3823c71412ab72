use std::collections::{BTreeMap, HashSet};
use std::iter;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;
use shared_models::scheduling::{slot_duration, ConsultationType, Doctor};
use shared_utils::time::{display_time, iso};

// ==============================================================================
// SLOT DERIVATION
// ==============================================================================

/// Bookable slots of one doctor on one date.
///
/// Candidates run every 30 minutes from the opening time (inclusive) to the closing time
/// (exclusive). A candidate is dropped when an active appointment starts at exactly that instant
/// or when it is not strictly after `now`. Iteration is lazy and can be restarted with `iter()`.
#[derive(Debug, Clone)]
pub struct SlotSchedule {
    date: NaiveDate,
    window: Option<(NaiveTime, NaiveTime)>,
    booked: HashSet<NaiveDateTime>,
    now: NaiveDateTime,
}

impl SlotSchedule {
    pub fn new(
        date: NaiveDate,
        open: NaiveTime,
        close: NaiveTime,
        booked: HashSet<NaiveDateTime>,
        now: NaiveDateTime,
    ) -> Self {
        Self { date, window: Some((open, close)), booked, now }
    }

    /// The doctor does not work on `date`.
    pub fn closed(date: NaiveDate, now: NaiveDateTime) -> Self {
        Self { date, window: None, booked: HashSet::new(), now }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        let bounds = self.window
            .map(|(open, close)| (self.date.and_time(open), self.date.and_time(close)));

        bounds.into_iter()
            .flat_map(|(first, close)| {
                iter::successors(Some(first), |start| Some(*start + slot_duration()))
                    .take_while(move |start| *start < close)
            })
            .filter(move |start| *start > self.now && !self.booked.contains(start))
    }

    pub fn slots(&self) -> Vec<AvailableSlot> {
        self.iter().map(AvailableSlot::at).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailableSlot {
    pub datetime: String,
    pub time: String,
    pub available: bool,
}

impl AvailableSlot {
    pub fn at(start: NaiveDateTime) -> Self {
        Self {
            datetime: iso(start),
            time: display_time(start),
            available: true,
        }
    }
}

// ==============================================================================
// RESPONSES
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DoctorResponse {
    pub id: Uuid,
    pub full_name: String,
    pub specialty: String,
    pub specialty_id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub rating: f64,
    pub review_count: i32,
    pub estimated_wait_time: i32,
    pub consultation_types: Vec<ConsultationType>,
    pub is_verified: bool,
    pub years_experience: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
}

impl DoctorResponse {
    pub fn new(doctor: &Doctor, specialty: &str) -> Self {
        Self {
            id: doctor.id,
            full_name: doctor.full_name(),
            specialty: specialty.to_string(),
            specialty_id: doctor.specialty_id,
            email: doctor.email.clone(),
            phone: doctor.phone.clone(),
            bio: doctor.bio.clone(),
            image_url: doctor.image_url.clone(),
            rating: doctor.rating,
            review_count: doctor.review_count,
            estimated_wait_time: doctor.estimated_wait_time,
            consultation_types: doctor.consultation_modes(),
            is_verified: doctor.is_verified,
            years_experience: doctor.years_experience,
            is_favorite: None,
        }
    }
}

/// Compact form used by search results and favorites.
#[derive(Debug, Clone, Serialize)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub full_name: String,
    pub specialty: String,
    pub rating: f64,
    pub review_count: i32,
}

impl DoctorSummary {
    pub fn new(doctor: &Doctor, specialty: &str) -> Self {
        Self {
            id: doctor.id,
            full_name: doctor.full_name(),
            specialty: specialty.to_string(),
            rating: doctor.rating,
            review_count: doctor.review_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminDoctorResponse {
    pub first_name: String,
    pub last_name: String,
    pub appointment_count: usize,
    #[serde(flatten)]
    pub doctor: DoctorResponse,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AvailabilityWindow {
    pub start: String,
    pub end: String,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyScheduleResponse {
    pub doctor_id: Uuid,
    pub doctor_name: String,
    /// Keyed by day name.
    pub availability: BTreeMap<String, Vec<AvailabilityWindow>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub date: String,
    pub patient_name: String,
}

// ==============================================================================
// REQUESTS
// ==============================================================================

/// Consultation modes arrive either as a list or as a comma separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ConsultationTypesInput {
    List(Vec<ConsultationType>),
    Csv(String),
}

impl ConsultationTypesInput {
    pub fn into_modes(self) -> Result<Vec<ConsultationType>, DoctorError> {
        let modes = match self {
            ConsultationTypesInput::List(modes) => modes,
            ConsultationTypesInput::Csv(raw) => ConsultationType::parse_list(&raw)
                .map_err(DoctorError::ValidationError)?,
        };
        if modes.is_empty() {
            return Ok(vec![ConsultationType::InPerson]);
        }
        Ok(modes)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDoctorRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub specialty_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub wait_time: Option<i32>,
    pub consultation_types: Option<ConsultationTypesInput>,
    pub years_experience: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDoctorRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub specialty_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub wait_time: Option<i32>,
    pub consultation_types: Option<ConsultationTypesInput>,
    pub years_experience: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAvailabilityRequest {
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewRequest {
    pub appointment_id: Option<String>,
    pub doctor_id: Option<String>,
    pub patient_id: Option<String>,
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Invalid specialty")]
    InvalidSpecialty,

    #[error("A doctor with this email already exists")]
    DuplicateEmail,

    #[error("Cannot delete doctor with {0} scheduled appointments. Cancel them first.")]
    HasScheduledAppointments(usize),

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Only completed appointments can be reviewed")]
    AppointmentNotCompleted,

    #[error("Review does not match the appointment's doctor and patient")]
    ReviewMismatch,

    #[error("This appointment has already been reviewed")]
    AlreadyReviewed,

    #[error("{0}")]
    ValidationError(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound | DoctorError::AppointmentNotFound => AppError::NotFound(err.to_string()),
            DoctorError::InvalidSpecialty
            | DoctorError::AppointmentNotCompleted
            | DoctorError::ReviewMismatch => AppError::BadRequest(err.to_string()),
            DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
            DoctorError::DuplicateEmail
            | DoctorError::HasScheduledAppointments(_)
            | DoctorError::AlreadyReviewed => AppError::Conflict(err.to_string()),
            DoctorError::Store(store_err) => store_err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::test_utils::{at, future_monday};

    fn nine_to_five(booked: &[NaiveDateTime], now: NaiveDateTime) -> SlotSchedule {
        SlotSchedule::new(
            future_monday(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            booked.iter().copied().collect(),
            now,
        )
    }

    #[test]
    fn test_full_day_has_sixteen_slots() {
        let day = future_monday();
        let schedule = nine_to_five(&[], at(day, 0, 0));
        let slots: Vec<NaiveDateTime> = schedule.iter().collect();

        assert_eq!(slots.len(), 16);
        assert_eq!(slots.first(), Some(&at(day, 9, 0)));
        assert_eq!(slots.last(), Some(&at(day, 16, 30)));
    }

    #[test]
    fn test_booked_and_past_slots_are_skipped() {
        let day = future_monday();
        let schedule = nine_to_five(&[at(day, 10, 0)], at(day, 9, 30));
        let slots: Vec<NaiveDateTime> = schedule.iter().collect();

        // 09:00 is past and 09:30 is not strictly after now
        assert_eq!(slots.first(), Some(&at(day, 10, 30)));
        assert!(!slots.contains(&at(day, 10, 0)));
        assert_eq!(slots.len(), 13);
    }

    #[test]
    fn test_schedule_restarts() {
        let day = future_monday();
        let schedule = nine_to_five(&[], at(day, 0, 0));
        assert_eq!(schedule.iter().count(), schedule.iter().count());
        assert_eq!(schedule.slots()[0].time, "09:00 AM");
        assert_eq!(schedule.slots()[0].datetime, "2099-01-05T09:00:00");
    }

    #[test]
    fn test_closed_day_is_empty() {
        let day = future_monday();
        assert_eq!(SlotSchedule::closed(day, at(day, 0, 0)).iter().count(), 0);
    }

    #[test]
    fn test_consultation_input_forms() {
        let csv: ConsultationTypesInput = serde_json::from_str("\"in-person,video\"").unwrap();
        assert_eq!(csv.into_modes().unwrap(), vec![ConsultationType::InPerson, ConsultationType::Video]);

        let list: ConsultationTypesInput = serde_json::from_str("[\"phone\"]").unwrap();
        assert_eq!(list.into_modes().unwrap(), vec![ConsultationType::Phone]);

        let empty: ConsultationTypesInput = serde_json::from_str("\"\"").unwrap();
        assert_eq!(empty.into_modes().unwrap(), vec![ConsultationType::InPerson]);
    }
}
