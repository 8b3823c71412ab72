// libs/doctor-cell/src/services/availability.rs

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{AppointmentQuery, SchedulingStore};
use shared_models::scheduling::{day_of_week, AppointmentStatus, Doctor, WeeklyAvailability, DAY_NAMES};

use crate::models::{
    AvailabilityWindow, DoctorError, SetAvailabilityRequest, SlotSchedule, WeeklyScheduleResponse,
};

pub struct AvailabilityService {
    store: Arc<dyn SchedulingStore>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    async fn require_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        self.store.find_doctor(doctor_id).await?
            .ok_or(DoctorError::NotFound)
    }

    /// Derive the bookable slots of a doctor for one calendar date.
    pub async fn get_available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<SlotSchedule, DoctorError> {
        self.require_doctor(doctor_id).await?;

        let day = day_of_week(date);
        let entry = self.store.list_availability(doctor_id, Some(day)).await?
            .into_iter()
            .find(|entry| entry.is_available);

        let Some(entry) = entry else {
            debug!("Doctor {} does not work on {} ({})", doctor_id, date, DAY_NAMES[day as usize]);
            return Ok(SlotSchedule::closed(date, now));
        };

        let day_start = date.and_time(NaiveTime::MIN);
        let query = AppointmentQuery::for_doctor(doctor_id)
            .between(day_start, day_start + Duration::days(1))
            .excluding_status(AppointmentStatus::Cancelled);

        let booked: HashSet<NaiveDateTime> = self.store.list_appointments(&query).await?
            .into_iter()
            .map(|appointment| appointment.appointment_date)
            .collect();

        debug!("Doctor {} has {} active bookings on {}", doctor_id, booked.len(), date);

        Ok(SlotSchedule::new(date, entry.start_time, entry.end_time, booked, now))
    }

    /// Every availability entry of the doctor, grouped by day name.
    pub async fn get_weekly_schedule(&self, doctor_id: Uuid) -> Result<WeeklyScheduleResponse, DoctorError> {
        let doctor = self.require_doctor(doctor_id).await?;

        let mut availability: BTreeMap<String, Vec<AvailabilityWindow>> = BTreeMap::new();
        for entry in self.store.list_availability(doctor_id, None).await? {
            availability
                .entry(entry.day_name().to_string())
                .or_default()
                .push(AvailabilityWindow {
                    start: entry.start_time.format("%H:%M").to_string(),
                    end: entry.end_time.format("%H:%M").to_string(),
                    available: entry.is_available,
                });
        }

        Ok(WeeklyScheduleResponse {
            doctor_id,
            doctor_name: doctor.full_name(),
            availability,
        })
    }

    /// Upsert the single entry for (doctor, day).
    pub async fn set_availability(
        &self,
        doctor_id: Uuid,
        day: i32,
        request: SetAvailabilityRequest,
    ) -> Result<WeeklyAvailability, DoctorError> {
        if !(0..=6).contains(&day) {
            return Err(DoctorError::ValidationError(
                "Day of week must be between 0 (Monday) and 6 (Sunday)".to_string(),
            ));
        }

        let start_time = parse_clock("startTime", &request.start_time)?;
        let end_time = parse_clock("endTime", &request.end_time)?;
        if start_time >= end_time {
            return Err(DoctorError::ValidationError("Start time must be before end time".to_string()));
        }

        self.require_doctor(doctor_id).await?;

        let mut existing = self.store.list_availability(doctor_id, Some(day)).await?;
        // Reuse the active entry when there is one so the per-day uniqueness rule holds.
        existing.sort_by_key(|entry| !entry.is_available);

        let entry = WeeklyAvailability {
            id: existing.first().map(|entry| entry.id).unwrap_or_else(Uuid::new_v4),
            doctor_id,
            day_of_week: day,
            start_time,
            end_time,
            is_available: request.is_available,
        };

        self.store.save_availability(&entry).await?;

        info!(
            "Availability for doctor {} on {} set to {}-{} (available: {})",
            doctor_id, entry.day_name(), start_time, end_time, entry.is_available
        );
        Ok(entry)
    }
}

fn parse_clock(field: &str, raw: &str) -> Result<NaiveTime, DoctorError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S"))
        .map_err(|_| DoctorError::ValidationError(format!("Invalid {}: expected HH:MM", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_utils::test_utils::{at, future_monday, SchedulingFixture};

    fn hours(start: &str, end: &str, is_available: bool) -> SetAvailabilityRequest {
        SetAvailabilityRequest {
            start_time: start.to_string(),
            end_time: end.to_string(),
            is_available,
        }
    }

    #[tokio::test]
    async fn test_sunday_is_closed() {
        let fixture = SchedulingFixture::new().await;
        let service = AvailabilityService::new(fixture.store());
        let sunday = future_monday() - Duration::days(1);

        let schedule = service
            .get_available_slots(fixture.doctor.id, sunday, at(sunday, 0, 0) - Duration::days(1))
            .await
            .unwrap();
        assert_eq!(schedule.iter().count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_doctor() {
        let fixture = SchedulingFixture::new().await;
        let service = AvailabilityService::new(fixture.store());

        let result = service.get_available_slots(Uuid::new_v4(), future_monday(), at(future_monday(), 0, 0)).await;
        assert_matches!(result, Err(DoctorError::NotFound));
    }

    #[tokio::test]
    async fn test_set_availability_replaces_the_day() {
        let fixture = SchedulingFixture::new().await;
        let service = AvailabilityService::new(fixture.store());
        let monday = future_monday();

        service.set_availability(fixture.doctor.id, 0, hours("13:00", "15:00", true)).await.unwrap();

        let entries = fixture.store().list_availability(fixture.doctor.id, Some(0)).await.unwrap();
        assert_eq!(entries.len(), 1);

        let slots: Vec<NaiveDateTime> = service
            .get_available_slots(fixture.doctor.id, monday, at(monday, 0, 0))
            .await
            .unwrap()
            .iter()
            .collect();
        assert_eq!(slots, vec![at(monday, 13, 0), at(monday, 13, 30), at(monday, 14, 0), at(monday, 14, 30)]);
    }

    #[tokio::test]
    async fn test_set_availability_can_close_a_day() {
        let fixture = SchedulingFixture::new().await;
        let service = AvailabilityService::new(fixture.store());
        let monday = future_monday();

        service.set_availability(fixture.doctor.id, 0, hours("09:00", "17:00", false)).await.unwrap();

        let schedule = service.get_available_slots(fixture.doctor.id, monday, at(monday, 0, 0)).await.unwrap();
        assert_eq!(schedule.iter().count(), 0);

        let weekly = service.get_weekly_schedule(fixture.doctor.id).await.unwrap();
        assert_eq!(
            weekly.availability["Monday"],
            vec![AvailabilityWindow { start: "09:00".into(), end: "17:00".into(), available: false }]
        );
        assert!(!weekly.availability.contains_key("Sunday"));
    }

    #[tokio::test]
    async fn test_set_availability_validation() {
        let fixture = SchedulingFixture::new().await;
        let service = AvailabilityService::new(fixture.store());

        assert_matches!(
            service.set_availability(fixture.doctor.id, 7, hours("09:00", "17:00", true)).await,
            Err(DoctorError::ValidationError(_))
        );
        assert_matches!(
            service.set_availability(fixture.doctor.id, 1, hours("17:00", "09:00", true)).await,
            Err(DoctorError::ValidationError(_))
        );
        assert_matches!(
            service.set_availability(fixture.doctor.id, 1, hours("9am", "17:00", true)).await,
            Err(DoctorError::ValidationError(msg)) if msg.contains("startTime")
        );
    }
}
