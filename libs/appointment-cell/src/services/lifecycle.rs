// libs/appointment-cell/src/services/lifecycle.rs
use chrono::NaiveDateTime;
use tracing::debug;

use shared_models::scheduling::{Appointment, AppointmentStatus};

use crate::models::AppointmentFlags;

/// Status rules for appointments. Cancellation and completion are unconditional; a reschedule
/// always lands in `Rescheduled` and bumps the counter.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn flags(&self, appointment: &Appointment, has_review: bool, now: NaiveDateTime) -> AppointmentFlags {
        let upcoming = appointment.status == AppointmentStatus::Scheduled && appointment.appointment_date > now;
        AppointmentFlags {
            can_review: appointment.status == AppointmentStatus::Completed && !has_review,
            can_reschedule: upcoming,
            can_cancel: upcoming,
            is_upcoming: upcoming,
        }
    }

    pub fn reschedule(&self, appointment: &mut Appointment, new_start: NaiveDateTime) {
        debug!(
            "Moving appointment {} from {} to {}",
            appointment.id, appointment.appointment_date, new_start
        );
        appointment.appointment_date = new_start;
        appointment.reschedule_count += 1;
        appointment.status = AppointmentStatus::Rescheduled;
    }

    pub fn transition(&self, appointment: &mut Appointment, status: AppointmentStatus) {
        debug!("Appointment {}: {} -> {}", appointment.id, appointment.status, status);
        appointment.status = status;
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared_models::scheduling::ConsultationType;
    use uuid::Uuid;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2099, 1, 5).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn appointment(status: AppointmentStatus, start: NaiveDateTime) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            appointment_date: start,
            status,
            appointment_type: ConsultationType::Video,
            reason: None,
            notes: None,
            reschedule_count: 0,
            original_appointment_id: None,
            created_at: start,
        }
    }

    #[test]
    fn test_future_scheduled_is_actionable() {
        let lifecycle = AppointmentLifecycleService::new();
        let later = noon() + chrono::Duration::hours(1);

        let flags = lifecycle.flags(&appointment(AppointmentStatus::Scheduled, later), false, noon());
        assert!(flags.can_cancel && flags.can_reschedule && flags.is_upcoming);
        assert!(!flags.can_review);

        // Rescheduled appointments are not offered further changes.
        let flags = lifecycle.flags(&appointment(AppointmentStatus::Rescheduled, later), false, noon());
        assert!(!flags.can_cancel && !flags.is_upcoming);

        let flags = lifecycle.flags(&appointment(AppointmentStatus::Scheduled, noon()), false, noon());
        assert!(!flags.is_upcoming);
    }

    #[test]
    fn test_review_only_once_after_completion() {
        let lifecycle = AppointmentLifecycleService::new();
        let done = appointment(AppointmentStatus::Completed, noon());

        assert!(lifecycle.flags(&done, false, noon()).can_review);
        assert!(!lifecycle.flags(&done, true, noon()).can_review);
    }

    #[test]
    fn test_reschedule_always_marks_rescheduled() {
        let lifecycle = AppointmentLifecycleService::new();
        let mut cancelled = appointment(AppointmentStatus::Cancelled, noon());
        let new_start = noon() + chrono::Duration::days(1);

        lifecycle.reschedule(&mut cancelled, new_start);
        assert_eq!(cancelled.status, AppointmentStatus::Rescheduled);
        assert_eq!(cancelled.reschedule_count, 1);
        assert_eq!(cancelled.appointment_date, new_start);

        lifecycle.reschedule(&mut cancelled, new_start);
        assert_eq!(cancelled.reschedule_count, 2);
    }
}
