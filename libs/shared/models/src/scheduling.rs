// libs/shared/models/src/scheduling.rs
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Every appointment occupies exactly one slot of this length.
pub const SLOT_MINUTES: i64 = 30;

pub fn slot_duration() -> Duration {
    Duration::minutes(SLOT_MINUTES)
}

/// Day names indexed by `day_of_week` (Monday = 0).
pub const DAY_NAMES: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

/// Monday-based day index used by weekly availability.
pub fn day_of_week(date: NaiveDate) -> i32 {
    date.weekday().num_days_from_monday() as i32
}

pub fn weekday_from_index(day: i32) -> Option<Weekday> {
    match day {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

/// Half-open interval overlap: touching endpoints do not conflict.
pub fn intervals_overlap(
    start1: NaiveDateTime,
    end1: NaiveDateTime,
    start2: NaiveDateTime,
    end2: NaiveDateTime,
) -> bool {
    start1 < end2 && end1 > start2
}

// ==============================================================================
// DOCTORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Specialty {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
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
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("Dr. {} {}", self.first_name, self.last_name)
    }

    /// Falls back to in-person when no modes are recorded.
    pub fn consultation_modes(&self) -> Vec<ConsultationType> {
        if self.consultation_types.is_empty() {
            vec![ConsultationType::InPerson]
        } else {
            self.consultation_types.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ConsultationType {
    #[default]
    #[serde(rename = "in-person", alias = "in_person")]
    InPerson,
    #[serde(rename = "video")]
    Video,
    #[serde(rename = "phone")]
    Phone,
}

impl ConsultationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationType::InPerson => "in-person",
            ConsultationType::Video => "video",
            ConsultationType::Phone => "phone",
        }
    }

    /// Parses a comma separated list such as `in-person,video`.
    pub fn parse_list(raw: &str) -> Result<Vec<ConsultationType>, String> {
        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(ConsultationType::from_str)
            .collect()
    }
}

impl fmt::Display for ConsultationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsultationType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "in-person" | "in_person" => Ok(ConsultationType::InPerson),
            "video" => Ok(ConsultationType::Video),
            "phone" => Ok(ConsultationType::Phone),
            other => Err(format!("Unknown consultation type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklyAvailability {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub day_of_week: i32, // 0 = Monday, 6 = Sunday
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
}

impl WeeklyAvailability {
    pub fn day_name(&self) -> &'static str {
        DAY_NAMES
            .get(self.day_of_week as usize)
            .copied()
            .unwrap_or("Unknown")
    }
}

// ==============================================================================
// PATIENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Public form used next to reviews, e.g. `Jane D.`
    pub fn short_name(&self) -> String {
        match self.last_name.chars().next() {
            Some(initial) => format!("{} {}.", self.first_name, initial),
            None => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FavoriteDoctor {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub created_at: NaiveDateTime,
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    Rescheduled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Rescheduled => "rescheduled",
        }
    }

    /// Anything but a cancellation keeps holding the slot.
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }

    /// Scheduled and rescheduled appointments are still ahead of the patient.
    pub fn is_pending(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Rescheduled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "rescheduled" => Ok(AppointmentStatus::Rescheduled),
            other => Err(format!("Unknown appointment status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_date: NaiveDateTime,
    pub status: AppointmentStatus,
    pub appointment_type: ConsultationType,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub reschedule_count: i32,
    /// Present in the schema for history linkage; nothing writes it.
    pub original_appointment_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

impl Appointment {
    pub fn end_time(&self) -> NaiveDateTime {
        self.appointment_date + slot_duration()
    }

    /// True when this appointment still holds its slot and overlaps `[start, start + slot)`.
    pub fn collides_with(&self, start: NaiveDateTime) -> bool {
        self.status.occupies_slot()
            && intervals_overlap(start, start + slot_duration(), self.appointment_date, self.end_time())
    }
}

// ==============================================================================
// REVIEWS
// ==============================================================================

pub const MIN_REVIEW_RATING: i32 = 1;
pub const MAX_REVIEW_RATING: i32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: NaiveDateTime,
}
