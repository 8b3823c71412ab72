// libs/appointment-cell/src/services/booking.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{AppointmentQuery, DoctorLocks, DoctorQuery, SchedulingStore};
use shared_models::scheduling::{Appointment, AppointmentStatus, Doctor, Patient};
use shared_utils::time::iso;

use crate::models::{
    AdminAppointment, AdminAppointmentPage, AdminStats, AppointmentDetails, AppointmentError,
    BookingConfirmation, DashboardTotals, NewBooking, PatientAppointment, RecentAppointment,
    RescheduleConfirmation, UpcomingAppointment,
};
use crate::services::consistency::SchedulingConsistencyService;
use crate::services::lifecycle::AppointmentLifecycleService;

pub const DEFAULT_PAGE_SIZE: usize = 20;
const RECENT_APPOINTMENTS: usize = 10;
const UNKNOWN_DOCTOR: &str = "Unknown Doctor";
const UNKNOWN_PATIENT: &str = "Unknown Patient";

/// Doctor display names and specialty names, loaded once per listing.
struct Directory {
    doctors: HashMap<Uuid, Doctor>,
    specialties: HashMap<Uuid, String>,
    patients: HashMap<Uuid, Patient>,
}

impl Directory {
    fn doctor_name(&self, doctor_id: Uuid) -> String {
        self.doctors.get(&doctor_id)
            .map(Doctor::full_name)
            .unwrap_or_else(|| UNKNOWN_DOCTOR.to_string())
    }

    fn specialty(&self, doctor_id: Uuid) -> String {
        self.doctors.get(&doctor_id)
            .and_then(|d| self.specialties.get(&d.specialty_id))
            .cloned()
            .unwrap_or_default()
    }

    fn patient(&self, patient_id: Uuid) -> Option<&Patient> {
        self.patients.get(&patient_id)
    }

    fn patient_name(&self, patient_id: Uuid) -> String {
        self.patient(patient_id)
            .map(Patient::full_name)
            .unwrap_or_else(|| UNKNOWN_PATIENT.to_string())
    }
}

/// Hours from `now` to `at`, one decimal.
pub fn hours_until(at: NaiveDateTime, now: NaiveDateTime) -> f64 {
    let hours = (at - now).num_seconds() as f64 / 3600.0;
    (hours * 10.0).round() / 10.0
}

pub struct AppointmentBookingService {
    store: Arc<dyn SchedulingStore>,
    consistency: SchedulingConsistencyService,
    lifecycle: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(store: Arc<dyn SchedulingStore>, locks: Arc<DoctorLocks>) -> Self {
        Self {
            consistency: SchedulingConsistencyService::new(store.clone(), locks),
            lifecycle: AppointmentLifecycleService::new(),
            store,
        }
    }

    // ==============================================================================
    // WRITES
    // ==============================================================================

    pub async fn create_appointment(
        &self,
        booking: NewBooking,
        now: NaiveDateTime,
    ) -> Result<BookingConfirmation, AppointmentError> {
        let appointment = self.consistency.book(booking, now).await?;
        let doctor = self.store.find_doctor(appointment.doctor_id).await?
            .ok_or(AppointmentError::DoctorNotFound)?;

        Ok(BookingConfirmation {
            id: appointment.id,
            message: "Appointment scheduled successfully".to_string(),
            doctor_name: doctor.full_name(),
            date: iso(appointment.appointment_date),
        })
    }

    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        new_start: NaiveDateTime,
    ) -> Result<RescheduleConfirmation, AppointmentError> {
        let appointment = self.consistency.reschedule(appointment_id, new_start).await?;
        Ok(RescheduleConfirmation {
            message: "Appointment rescheduled successfully".to_string(),
            new_date: iso(appointment.appointment_date),
            reschedule_count: appointment.reschedule_count,
        })
    }

    pub async fn cancel_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.consistency.set_status(appointment_id, AppointmentStatus::Cancelled).await
    }

    pub async fn complete_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.consistency.set_status(appointment_id, AppointmentStatus::Completed).await
    }

    pub async fn delete_appointment(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        self.consistency.delete(appointment_id).await
    }

    // ==============================================================================
    // READS
    // ==============================================================================

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<AppointmentDetails, AppointmentError> {
        let appointment = self.store.find_appointment(appointment_id).await?
            .ok_or(AppointmentError::NotFound)?;
        let doctor = self.store.find_doctor(appointment.doctor_id).await?;
        let specialty = match &doctor {
            Some(doctor) => self.store.find_specialty(doctor.specialty_id).await?.map(|s| s.name),
            None => None,
        };
        let patient = self.store.find_patient(appointment.patient_id).await?;

        Ok(AppointmentDetails {
            id: appointment.id,
            doctor_id: appointment.doctor_id,
            doctor_name: doctor.as_ref().map(Doctor::full_name).unwrap_or_else(|| UNKNOWN_DOCTOR.to_string()),
            specialty: specialty.unwrap_or_default(),
            date: iso(appointment.appointment_date),
            status: appointment.status,
            reason: appointment.reason,
            appointment_type: appointment.appointment_type,
            patient_email: patient.map(|p| p.email).unwrap_or_default(),
        })
    }

    /// All appointments of the patient with this email, newest first.
    pub async fn list_for_patient(
        &self,
        email: &str,
        now: NaiveDateTime,
    ) -> Result<Vec<PatientAppointment>, AppointmentError> {
        let Some(patient) = self.store.find_patient_by_email(email).await? else {
            debug!("No patient registered for {}", email);
            return Ok(Vec::new());
        };

        let mut appointments = self.store
            .list_appointments(&AppointmentQuery::for_patient(patient.id))
            .await?;
        appointments.reverse();

        let directory = self.directory(false).await?;
        let mut result = Vec::with_capacity(appointments.len());
        for appointment in appointments {
            let has_review = self.store.find_review_by_appointment(appointment.id).await?.is_some();
            result.push(PatientAppointment {
                id: appointment.id,
                doctor_id: appointment.doctor_id,
                doctor_name: directory.doctor_name(appointment.doctor_id),
                specialty: directory.specialty(appointment.doctor_id),
                date: iso(appointment.appointment_date),
                status: appointment.status,
                reason: appointment.reason.clone(),
                appointment_type: appointment.appointment_type,
                reschedule_count: appointment.reschedule_count,
                flags: self.lifecycle.flags(&appointment, has_review, now),
            });
        }
        Ok(result)
    }

    /// Scheduled appointments starting within the next 24 hours, for reminders.
    pub async fn upcoming_for_patient(
        &self,
        email: &str,
        now: NaiveDateTime,
    ) -> Result<Vec<UpcomingAppointment>, AppointmentError> {
        let Some(patient) = self.store.find_patient_by_email(email).await? else {
            return Ok(Vec::new());
        };

        let horizon = now + Duration::hours(24);
        let appointments = self.store
            .list_appointments(&AppointmentQuery::for_patient(patient.id).with_status(AppointmentStatus::Scheduled))
            .await?;

        let directory = self.directory(false).await?;
        Ok(appointments.into_iter()
            .filter(|a| a.appointment_date >= now && a.appointment_date <= horizon)
            .map(|a| UpcomingAppointment {
                id: a.id,
                doctor_name: directory.doctor_name(a.doctor_id),
                date: iso(a.appointment_date),
                hours_until: hours_until(a.appointment_date, now),
            })
            .collect())
    }

    // ==============================================================================
    // ADMIN
    // ==============================================================================

    /// One page of appointments, newest appointment date first. `page` starts at 1.
    pub async fn admin_list_appointments(
        &self,
        status: Option<AppointmentStatus>,
        page: usize,
        per_page: usize,
    ) -> Result<AdminAppointmentPage, AppointmentError> {
        let page = page.max(1);
        let per_page = per_page.max(1);

        let mut query = AppointmentQuery::default();
        if let Some(status) = status {
            query = query.with_status(status);
        }
        let mut appointments = self.store.list_appointments(&query).await?;
        appointments.reverse();

        let total = appointments.len();
        let pages = total.div_ceil(per_page);
        let directory = self.directory(true).await?;

        let rows = appointments.into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .map(|a| {
                let patient = directory.patient(a.patient_id);
                AdminAppointment {
                    id: a.id,
                    patient_name: directory.patient_name(a.patient_id),
                    patient_email: patient.map(|p| p.email.clone()).unwrap_or_default(),
                    patient_phone: patient.and_then(|p| p.phone.clone()).unwrap_or_default(),
                    doctor_name: directory.doctor_name(a.doctor_id),
                    doctor_id: a.doctor_id,
                    date: iso(a.appointment_date),
                    status: a.status,
                    reason: a.reason.unwrap_or_default(),
                    appointment_type: a.appointment_type,
                    created_at: iso(a.created_at),
                }
            })
            .collect();

        Ok(AdminAppointmentPage {
            appointments: rows,
            total,
            pages,
            current_page: page,
            has_prev: page > 1,
            has_next: page < pages,
        })
    }

    pub async fn admin_stats(&self) -> Result<AdminStats, AppointmentError> {
        let mut appointments = self.store.list_appointments(&AppointmentQuery::default()).await?;
        let directory = self.directory(true).await?;

        let count = |status: AppointmentStatus| appointments.iter().filter(|a| a.status == status).count();
        let stats = DashboardTotals {
            total_doctors: directory.doctors.len(),
            total_patients: directory.patients.len(),
            total_appointments: appointments.len(),
            scheduled_appointments: count(AppointmentStatus::Scheduled),
            completed_appointments: count(AppointmentStatus::Completed),
            cancelled_appointments: count(AppointmentStatus::Cancelled),
            total_reviews: self.store.count_reviews().await?,
        };

        appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let recent_appointments = appointments.into_iter()
            .take(RECENT_APPOINTMENTS)
            .map(|a| RecentAppointment {
                id: a.id,
                patient_name: directory.patient_name(a.patient_id),
                doctor_name: directory.doctor_name(a.doctor_id),
                date: iso(a.appointment_date),
                status: a.status,
                created_at: iso(a.created_at),
            })
            .collect();

        info!("Computed dashboard stats: {} appointments", stats.total_appointments);
        Ok(AdminStats { stats, recent_appointments })
    }

    async fn directory(&self, with_patients: bool) -> Result<Directory, AppointmentError> {
        let doctors = self.store.list_doctors(&DoctorQuery::default()).await?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();
        let specialties = self.store.list_specialties().await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();
        let patients = if with_patients {
            self.store.list_patients().await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect()
        } else {
            HashMap::new()
        };
        Ok(Directory { doctors, specialties, patients })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_models::scheduling::{ConsultationType, NewPatient};
    use shared_utils::test_utils::{at, future_monday, SchedulingFixture};

    fn booking(doctor_id: Uuid, start: NaiveDateTime) -> NewBooking {
        NewBooking {
            doctor_id,
            patient: NewPatient {
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                email: "jane@example.com".to_string(),
                phone: Some("555-0199".to_string()),
            },
            start,
            appointment_type: ConsultationType::Video,
            reason: Some("Checkup".to_string()),
        }
    }

    fn service(fixture: &SchedulingFixture) -> AppointmentBookingService {
        AppointmentBookingService::new(fixture.store(), fixture.state.locks.clone())
    }

    #[test]
    fn test_hours_until_rounds_to_one_decimal() {
        let now = at(future_monday(), 8, 0);
        assert_eq!(hours_until(at(future_monday(), 10, 0), now), 2.0);
        assert_eq!(hours_until(at(future_monday(), 9, 20), now), 1.3);
    }

    #[tokio::test]
    async fn test_create_confirms_with_doctor_name() {
        let fixture = SchedulingFixture::new().await;
        let service = service(&fixture);

        let confirmation = service
            .create_appointment(booking(fixture.doctor.id, at(future_monday(), 9, 0)), at(future_monday(), 8, 0))
            .await
            .unwrap();

        assert_eq!(confirmation.doctor_name, "Dr. Sarah Johnson");
        assert_eq!(confirmation.date, "2099-01-05T09:00:00");
        assert_eq!(confirmation.message, "Appointment scheduled successfully");
    }

    #[tokio::test]
    async fn test_cancellation_frees_the_slot() {
        let fixture = SchedulingFixture::new().await;
        let service = service(&fixture);
        let now = at(future_monday(), 8, 0);
        let start = at(future_monday(), 9, 0);

        let first = service.create_appointment(booking(fixture.doctor.id, start), now).await.unwrap();
        assert_matches!(
            service.create_appointment(booking(fixture.doctor.id, start), now).await,
            Err(AppointmentError::Overlap { .. })
        );

        service.cancel_appointment(first.id).await.unwrap();
        service.create_appointment(booking(fixture.doctor.id, start), now).await.unwrap();
    }

    #[tokio::test]
    async fn test_patient_listing_is_newest_first_with_flags() {
        let fixture = SchedulingFixture::new().await;
        let service = service(&fixture);
        let now = at(future_monday(), 8, 0);

        let early = service.create_appointment(booking(fixture.doctor.id, at(future_monday(), 9, 0)), now).await.unwrap();
        let late = service.create_appointment(booking(fixture.doctor.id, at(future_monday(), 15, 0)), now).await.unwrap();
        service.complete_appointment(early.id).await.unwrap();

        let listed = service.list_for_patient("jane@example.com", now).await.unwrap();
        assert_eq!(listed.iter().map(|a| a.id).collect::<Vec<_>>(), vec![late.id, early.id]);
        assert_eq!(listed[0].specialty, "Cardiology");
        assert!(listed[0].flags.can_cancel && listed[0].flags.is_upcoming);
        assert!(listed[1].flags.can_review);
        assert!(!listed[1].flags.can_cancel);

        assert!(service.list_for_patient("nobody@example.com", now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upcoming_window_is_24_hours() {
        let fixture = SchedulingFixture::new().await;
        let service = service(&fixture);
        let now = at(future_monday(), 8, 0);

        service.create_appointment(booking(fixture.doctor.id, at(future_monday(), 10, 0)), now).await.unwrap();
        let tomorrow = future_monday().succ_opt().unwrap();
        service.create_appointment(booking(fixture.doctor.id, at(tomorrow, 9, 0)), now).await.unwrap();
        let moved = service.create_appointment(booking(fixture.doctor.id, at(future_monday(), 12, 0)), now).await.unwrap();
        service.reschedule_appointment(moved.id, at(future_monday(), 13, 0)).await.unwrap();

        let upcoming = service.upcoming_for_patient("jane@example.com", now).await.unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].hours_until, 2.0);
        assert_eq!(upcoming[0].doctor_name, "Dr. Sarah Johnson");
    }

    #[tokio::test]
    async fn test_admin_pagination_and_stats() {
        let fixture = SchedulingFixture::new().await;
        let service = service(&fixture);
        let now = at(future_monday(), 8, 0);

        let mut ids = Vec::new();
        for hour in 9..14 {
            let created = service.create_appointment(booking(fixture.doctor.id, at(future_monday(), hour, 0)), now).await.unwrap();
            ids.push(created.id);
        }
        service.cancel_appointment(ids[0]).await.unwrap();

        let page = service.admin_list_appointments(None, 2, 2).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.pages, 3);
        assert!(page.has_prev && page.has_next);
        assert_eq!(page.appointments[0].date, "2099-01-05T11:00:00");
        assert_eq!(page.appointments[0].patient_phone, "555-0199");

        let cancelled = service.admin_list_appointments(Some(AppointmentStatus::Cancelled), 1, DEFAULT_PAGE_SIZE).await.unwrap();
        assert_eq!(cancelled.total, 1);
        assert!(!cancelled.has_next);

        let far = service.admin_list_appointments(None, usize::MAX, DEFAULT_PAGE_SIZE).await.unwrap();
        assert!(far.appointments.is_empty());
        assert_eq!(far.total, 5);
        assert!(far.has_prev && !far.has_next);

        let stats = service.admin_stats().await.unwrap();
        assert_eq!(stats.stats.total_appointments, 5);
        assert_eq!(stats.stats.scheduled_appointments, 4);
        assert_eq!(stats.stats.cancelled_appointments, 1);
        assert_eq!(stats.stats.total_doctors, 1);
        assert_eq!(stats.stats.total_patients, 1);
        assert_eq!(stats.recent_appointments.len(), 5);
        assert_eq!(stats.recent_appointments[0].patient_name, "Jane Doe");

        service.delete_appointment(ids[1]).await.unwrap();
        assert_matches!(service.get_appointment(ids[1]).await, Err(AppointmentError::NotFound));
    }
}
