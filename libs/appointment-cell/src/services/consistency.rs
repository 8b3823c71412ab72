// libs/appointment-cell/src/services/consistency.rs
//
// Every appointment write runs under the owning doctor's lock, with the overlap check and the
// store write inside the same critical section. The store's own same-instant rule backs this up
// across processes.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use patient_cell::PatientService;
use shared_database::{DoctorLocks, SchedulingStore};
use shared_models::scheduling::{Appointment, AppointmentStatus};

use crate::models::{AppointmentError, NewBooking};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::AppointmentLifecycleService;

pub struct SchedulingConsistencyService {
    store: Arc<dyn SchedulingStore>,
    locks: Arc<DoctorLocks>,
    conflicts: ConflictDetectionService,
    patients: PatientService,
    lifecycle: AppointmentLifecycleService,
}

impl SchedulingConsistencyService {
    pub fn new(store: Arc<dyn SchedulingStore>, locks: Arc<DoctorLocks>) -> Self {
        Self {
            conflicts: ConflictDetectionService::new(store.clone()),
            patients: PatientService::new(store.clone()),
            lifecycle: AppointmentLifecycleService::new(),
            store,
            locks,
        }
    }

    /// Checks the slot and writes a new `Scheduled` appointment. The patient is resolved (or
    /// created) only once the slot is known to be free. Unknown doctors are rejected before any
    /// lock is taken, and the doctor is looked up again under the lock.
    #[instrument(skip(self, booking), fields(doctor_id = %booking.doctor_id, start = %booking.start))]
    pub async fn book(&self, booking: NewBooking, now: NaiveDateTime) -> Result<Appointment, AppointmentError> {
        self.ensure_doctor(booking.doctor_id).await?;
        let _guard = self.locks.acquire(booking.doctor_id).await;
        self.ensure_doctor(booking.doctor_id).await?;

        if let Some(existing) = self.conflicts.check_overlap(booking.doctor_id, booking.start, None).await? {
            return Err(AppointmentError::Overlap { existing_start: existing.appointment_date });
        }

        let patient = self.patients.resolve_or_create(booking.patient).await?;

        let appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id: booking.doctor_id,
            patient_id: patient.id,
            appointment_date: booking.start,
            status: AppointmentStatus::Scheduled,
            appointment_type: booking.appointment_type,
            reason: booking.reason,
            notes: None,
            reschedule_count: 0,
            original_appointment_id: None,
            created_at: now,
        };
        self.store.insert_appointment(&appointment).await.inspect_err(|e| {
            warn!("Store rejected appointment for doctor {} at {}: {}", appointment.doctor_id, appointment.appointment_date, e);
        })?;

        info!("Booked appointment {} for patient {}", appointment.id, patient.id);
        Ok(appointment)
    }

    /// Moves an appointment, comparing against every other booking of the doctor that day.
    #[instrument(skip(self))]
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        new_start: NaiveDateTime,
    ) -> Result<Appointment, AppointmentError> {
        let (_guard, mut appointment) = self.lock_appointment(appointment_id).await?;

        if let Some(existing) = self.conflicts
            .check_overlap(appointment.doctor_id, new_start, Some(appointment.id))
            .await?
        {
            return Err(AppointmentError::Overlap { existing_start: existing.appointment_date });
        }

        self.lifecycle.reschedule(&mut appointment, new_start);
        self.store.update_appointment(&appointment).await?;

        info!(
            "Rescheduled appointment {} to {} (count {})",
            appointment.id, appointment.appointment_date, appointment.reschedule_count
        );
        Ok(appointment)
    }

    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let (_guard, mut appointment) = self.lock_appointment(appointment_id).await?;

        self.lifecycle.transition(&mut appointment, status);
        self.store.update_appointment(&appointment).await?;

        info!("Appointment {} is now {}", appointment.id, appointment.status);
        Ok(appointment)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        let (_guard, appointment) = self.lock_appointment(appointment_id).await?;

        self.store.delete_appointment(appointment.id).await?;
        info!("Deleted appointment {}", appointment.id);
        Ok(())
    }

    async fn ensure_doctor(&self, doctor_id: Uuid) -> Result<(), AppointmentError> {
        match self.store.find_doctor(doctor_id).await? {
            Some(_) => Ok(()),
            None => Err(AppointmentError::DoctorNotFound),
        }
    }

    /// Takes the owning doctor's lock and re-reads the appointment under it.
    async fn lock_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<(OwnedMutexGuard<()>, Appointment), AppointmentError> {
        let doctor_id = self.store.find_appointment(appointment_id).await?
            .ok_or(AppointmentError::NotFound)?
            .doctor_id;

        let guard = self.locks.acquire(doctor_id).await;
        let appointment = self.store.find_appointment(appointment_id).await?
            .ok_or(AppointmentError::NotFound)?;
        Ok((guard, appointment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_database::StoreError;
    use shared_models::scheduling::{ConsultationType, NewPatient};
    use shared_utils::test_utils::{at, future_monday, SchedulingFixture};

    fn booking(doctor_id: Uuid, email: &str, start: NaiveDateTime) -> NewBooking {
        NewBooking {
            doctor_id,
            patient: NewPatient {
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                email: email.to_string(),
                phone: None,
            },
            start,
            appointment_type: ConsultationType::InPerson,
            reason: None,
        }
    }

    fn service(fixture: &SchedulingFixture) -> SchedulingConsistencyService {
        SchedulingConsistencyService::new(fixture.store(), fixture.state.locks.clone())
    }

    #[tokio::test]
    async fn test_conflict_does_not_create_patient() {
        let fixture = SchedulingFixture::new().await;
        let service = service(&fixture);
        let now = at(future_monday(), 8, 0);

        service.book(booking(fixture.doctor.id, "a@example.com", at(future_monday(), 10, 0)), now).await.unwrap();
        let result = service.book(booking(fixture.doctor.id, "b@example.com", at(future_monday(), 10, 15)), now).await;

        assert_matches!(result, Err(AppointmentError::Overlap { existing_start }) if existing_start == at(future_monday(), 10, 0));
        assert!(fixture.store().find_patient_by_email("b@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_doctor_takes_no_lock() {
        let fixture = SchedulingFixture::new().await;
        let service = service(&fixture);

        for _ in 0..50 {
            let result = service
                .book(booking(Uuid::new_v4(), "a@example.com", at(future_monday(), 10, 0)), at(future_monday(), 8, 0))
                .await;
            assert_matches!(result, Err(AppointmentError::DoctorNotFound));
        }
        assert_eq!(fixture.state.locks.tracked_doctors(), 0);
        assert!(fixture.store().find_patient_by_email("a@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reschedule_excludes_itself() {
        let fixture = SchedulingFixture::new().await;
        let service = service(&fixture);
        let now = at(future_monday(), 8, 0);
        let booked = service.book(booking(fixture.doctor.id, "a@example.com", at(future_monday(), 10, 0)), now).await.unwrap();

        let moved = service.reschedule(booked.id, at(future_monday(), 10, 15)).await.unwrap();
        assert_eq!(moved.status, AppointmentStatus::Rescheduled);
        assert_eq!(moved.reschedule_count, 1);
        assert_eq!(moved.appointment_date, at(future_monday(), 10, 15));
    }

    #[tokio::test]
    async fn test_completing_over_a_same_instant_rebooking_is_refused() {
        let fixture = SchedulingFixture::new().await;
        let service = service(&fixture);
        let now = at(future_monday(), 8, 0);

        let first = service.book(booking(fixture.doctor.id, "a@example.com", at(future_monday(), 10, 0)), now).await.unwrap();
        service.set_status(first.id, AppointmentStatus::Cancelled).await.unwrap();
        service.book(booking(fixture.doctor.id, "b@example.com", at(future_monday(), 10, 0)), now).await.unwrap();
        assert_matches!(
            service.set_status(first.id, AppointmentStatus::Completed).await,
            Err(AppointmentError::Store(StoreError::Conflict(_)))
        );

        let second = service.book(booking(fixture.doctor.id, "a@example.com", at(future_monday(), 12, 0)), now).await.unwrap();
        service.set_status(second.id, AppointmentStatus::Cancelled).await.unwrap();
        service.book(booking(fixture.doctor.id, "b@example.com", at(future_monday(), 12, 15)), now).await.unwrap();
        let completed = service.set_status(second.id, AppointmentStatus::Completed).await.unwrap();
        assert_eq!(completed.status, AppointmentStatus::Completed);
    }

    #[tokio::test]
    async fn test_missing_appointment() {
        let fixture = SchedulingFixture::new().await;
        let service = service(&fixture);

        assert_matches!(service.set_status(Uuid::new_v4(), AppointmentStatus::Cancelled).await, Err(AppointmentError::NotFound));
        assert_matches!(service.reschedule(Uuid::new_v4(), at(future_monday(), 9, 0)).await, Err(AppointmentError::NotFound));
        assert_matches!(service.delete(Uuid::new_v4()).await, Err(AppointmentError::NotFound));
    }

    #[tokio::test]
    async fn test_concurrent_bookings_for_one_slot() {
        let fixture = SchedulingFixture::new().await;
        let service = Arc::new(service(&fixture));
        let start = at(future_monday(), 11, 0);
        let now = at(future_monday(), 8, 0);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let service = service.clone();
                let request = booking(fixture.doctor.id, &format!("p{}@example.com", i), start);
                tokio::spawn(async move { service.book(request, now).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(AppointmentError::Overlap { .. }) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
        assert_eq!(successes, 1);
    }
}
