use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::{AppointmentQuery, SchedulingStore};
use shared_models::scheduling::{Appointment, AppointmentStatus};

use crate::models::AppointmentError;

/// First appointment in `existing` whose slot overlaps `[start, start + 30m)`, skipping
/// `exclude` and anything cancelled.
pub fn find_overlap(
    existing: &[Appointment],
    start: NaiveDateTime,
    exclude: Option<Uuid>,
) -> Option<&Appointment> {
    existing.iter()
        .filter(|a| Some(a.id) != exclude)
        .find(|a| a.collides_with(start))
}

/// `[midnight, next midnight)` of the day containing `at`.
pub fn day_bounds(at: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let midnight = at.date().and_time(NaiveTime::MIN);
    (midnight, midnight + Duration::days(1))
}

pub struct ConflictDetectionService {
    store: Arc<dyn SchedulingStore>,
}

impl ConflictDetectionService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Looks for a booking of `doctor_id` that the candidate slot would overlap. Only the
    /// candidate's calendar day is scanned; a slot starting at 23:45 is never compared with one
    /// at 00:00 the next day.
    pub async fn check_overlap(
        &self,
        doctor_id: Uuid,
        start: NaiveDateTime,
        exclude: Option<Uuid>,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let (day_start, day_end) = day_bounds(start);
        debug!("Checking overlap for doctor {} at {} (exclude {:?})", doctor_id, start, exclude);

        let existing = self.store
            .list_appointments(
                &AppointmentQuery::for_doctor(doctor_id)
                    .between(day_start, day_end)
                    .excluding_status(AppointmentStatus::Cancelled),
            )
            .await?;

        let conflict = find_overlap(&existing, start, exclude).cloned();
        if let Some(existing) = &conflict {
            warn!(
                "Slot {} for doctor {} overlaps appointment {} at {}",
                start, doctor_id, existing.id, existing.appointment_date
            );
        }
        Ok(conflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_models::scheduling::ConsultationType;
    use shared_utils::test_utils::{at, future_monday, SchedulingFixture};

    fn booked(start: NaiveDateTime, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            appointment_date: start,
            status,
            appointment_type: ConsultationType::InPerson,
            reason: None,
            notes: None,
            reschedule_count: 0,
            original_appointment_id: None,
            created_at: start,
        }
    }

    #[test]
    fn test_overlap_is_symmetric_within_thirty_minutes() {
        let monday = future_monday();
        let a = booked(at(monday, 10, 0), AppointmentStatus::Scheduled);
        let b = booked(at(monday, 10, 15), AppointmentStatus::Scheduled);

        assert!(find_overlap(std::slice::from_ref(&a), b.appointment_date, None).is_some());
        assert!(find_overlap(std::slice::from_ref(&b), a.appointment_date, None).is_some());
    }

    #[test]
    fn test_back_to_back_slots_do_not_overlap() {
        let monday = future_monday();
        let existing = vec![booked(at(monday, 10, 0), AppointmentStatus::Scheduled)];

        assert!(find_overlap(&existing, at(monday, 10, 30), None).is_none());
        assert!(find_overlap(&existing, at(monday, 9, 30), None).is_none());
        assert!(find_overlap(&existing, at(monday, 9, 31), None).is_some());
    }

    #[test]
    fn test_excluded_and_cancelled_are_skipped() {
        let monday = future_monday();
        let own = booked(at(monday, 10, 0), AppointmentStatus::Rescheduled);
        let cancelled = booked(at(monday, 11, 0), AppointmentStatus::Cancelled);
        let existing = vec![own.clone(), cancelled];

        assert!(find_overlap(&existing, at(monday, 10, 15), Some(own.id)).is_none());
        assert!(find_overlap(&existing, at(monday, 11, 0), None).is_none());
        assert_eq!(find_overlap(&existing, at(monday, 10, 15), None).map(|a| a.id), Some(own.id));
    }

    #[test]
    fn test_day_bounds() {
        let (start, end) = day_bounds(at(future_monday(), 16, 30));
        assert_eq!(start, at(future_monday(), 0, 0));
        assert_eq!(end, at(future_monday().succ_opt().unwrap(), 0, 0));
    }

    #[tokio::test]
    async fn test_scan_is_limited_to_the_candidate_day() {
        let fixture = SchedulingFixture::new().await;
        let patient = fixture.patient("jane@example.com").await;
        let monday = future_monday();
        let late = fixture.book(&patient, at(monday, 23, 45), AppointmentStatus::Scheduled).await;
        let service = ConflictDetectionService::new(fixture.store());

        let same_day = service.check_overlap(fixture.doctor.id, at(monday, 23, 30), None).await.unwrap();
        assert_eq!(same_day.map(|a| a.id), Some(late.id));

        let next_day = service
            .check_overlap(fixture.doctor.id, at(monday.succ_opt().unwrap(), 0, 0), None)
            .await
            .unwrap();
        assert!(next_day.is_none());
    }

    #[tokio::test]
    async fn test_other_doctors_are_independent() {
        let fixture = SchedulingFixture::new().await;
        let patient = fixture.patient("jane@example.com").await;
        fixture.book(&patient, at(future_monday(), 9, 0), AppointmentStatus::Scheduled).await;
        let other = fixture.add_doctor("Michael", "Chen").await;
        let service = ConflictDetectionService::new(fixture.store());

        let conflict = service.check_overlap(other.id, at(future_monday(), 9, 0), None).await.unwrap();
        assert!(conflict.is_none());
    }
}
