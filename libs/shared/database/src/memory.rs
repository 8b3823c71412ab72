// libs/shared/database/src/memory.rs
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::scheduling::{
    Appointment, Doctor, FavoriteDoctor, NewPatient, Patient, Review, Specialty,
    WeeklyAvailability,
};

use crate::store::{AppointmentQuery, DoctorQuery, SchedulingStore, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    specialties: Vec<Specialty>,
    doctors: Vec<Doctor>,
    patients: Vec<Patient>,
    availability: Vec<WeeklyAvailability>,
    appointments: Vec<Appointment>,
    reviews: Vec<Review>,
    favorites: Vec<FavoriteDoctor>,
}

impl Tables {
    fn slot_taken(&self, candidate: &Appointment) -> bool {
        candidate.status.occupies_slot()
            && self.appointments.iter().any(|existing| {
                existing.id != candidate.id
                    && existing.doctor_id == candidate.doctor_id
                    && existing.appointment_date == candidate.appointment_date
                    && existing.status.occupies_slot()
            })
    }
}

/// In-process store. Every operation takes the table lock once, so multi-record changes such as
/// cascading deletes are atomic.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchedulingStore for InMemoryStore {
    async fn list_specialties(&self) -> StoreResult<Vec<Specialty>> {
        Ok(self.tables.read().await.specialties.clone())
    }

    async fn find_specialty(&self, id: Uuid) -> StoreResult<Option<Specialty>> {
        let tables = self.tables.read().await;
        Ok(tables.specialties.iter().find(|s| s.id == id).cloned())
    }

    async fn insert_specialty(&self, specialty: &Specialty) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.specialties.iter().any(|s| s.id == specialty.id || s.name == specialty.name) {
            return Err(StoreError::Conflict(format!("specialty {} already exists", specialty.name)));
        }
        tables.specialties.push(specialty.clone());
        Ok(())
    }

    async fn list_doctors(&self, query: &DoctorQuery) -> StoreResult<Vec<Doctor>> {
        let tables = self.tables.read().await;
        let doctors = tables.doctors.iter()
            .filter(|d| query.matches(d))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(doctors)
    }

    async fn find_doctor(&self, id: Uuid) -> StoreResult<Option<Doctor>> {
        let tables = self.tables.read().await;
        Ok(tables.doctors.iter().find(|d| d.id == id).cloned())
    }

    async fn find_doctor_by_email(&self, email: &str) -> StoreResult<Option<Doctor>> {
        let tables = self.tables.read().await;
        Ok(tables.doctors.iter().find(|d| d.email == email).cloned())
    }

    async fn insert_doctor(&self, doctor: &Doctor) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.doctors.iter().any(|d| d.id == doctor.id || d.email == doctor.email) {
            return Err(StoreError::Conflict(format!("doctor with email {} already exists", doctor.email)));
        }
        tables.doctors.push(doctor.clone());
        Ok(())
    }

    async fn update_doctor(&self, doctor: &Doctor) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.doctors.iter().any(|d| d.id != doctor.id && d.email == doctor.email) {
            return Err(StoreError::Conflict(format!("doctor with email {} already exists", doctor.email)));
        }
        let existing = tables.doctors.iter_mut()
            .find(|d| d.id == doctor.id)
            .ok_or_else(|| StoreError::not_found("doctor", doctor.id))?;
        *existing = doctor.clone();
        Ok(())
    }

    async fn delete_doctor(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.doctors.len();
        tables.doctors.retain(|d| d.id != id);
        if tables.doctors.len() == before {
            return Err(StoreError::not_found("doctor", id));
        }
        tables.appointments.retain(|a| a.doctor_id != id);
        tables.reviews.retain(|r| r.doctor_id != id);
        tables.availability.retain(|a| a.doctor_id != id);
        tables.favorites.retain(|f| f.doctor_id != id);
        debug!("Deleted doctor {} and dependent records", id);
        Ok(())
    }

    async fn save_doctor_rating(&self, doctor_id: Uuid, rating: f64, review_count: i32) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let doctor = tables.doctors.iter_mut()
            .find(|d| d.id == doctor_id)
            .ok_or_else(|| StoreError::not_found("doctor", doctor_id))?;
        doctor.rating = rating;
        doctor.review_count = review_count;
        Ok(())
    }

    async fn find_patient(&self, id: Uuid) -> StoreResult<Option<Patient>> {
        let tables = self.tables.read().await;
        Ok(tables.patients.iter().find(|p| p.id == id).cloned())
    }

    async fn find_patient_by_email(&self, email: &str) -> StoreResult<Option<Patient>> {
        let tables = self.tables.read().await;
        Ok(tables.patients.iter().find(|p| p.email == email).cloned())
    }

    async fn create_patient(&self, patient: NewPatient) -> StoreResult<Patient> {
        let mut tables = self.tables.write().await;
        if tables.patients.iter().any(|p| p.email == patient.email) {
            return Err(StoreError::Conflict(format!("patient with email {} already exists", patient.email)));
        }
        let created = Patient {
            id: Uuid::new_v4(),
            first_name: patient.first_name,
            last_name: patient.last_name,
            email: patient.email,
            phone: patient.phone,
        };
        tables.patients.push(created.clone());
        Ok(created)
    }

    async fn list_patients(&self) -> StoreResult<Vec<Patient>> {
        Ok(self.tables.read().await.patients.clone())
    }

    async fn list_availability(
        &self,
        doctor_id: Uuid,
        day_of_week: Option<i32>,
    ) -> StoreResult<Vec<WeeklyAvailability>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<WeeklyAvailability> = tables.availability.iter()
            .filter(|a| a.doctor_id == doctor_id)
            .filter(|a| day_of_week.map_or(true, |day| a.day_of_week == day))
            .cloned()
            .collect();
        entries.sort_by_key(|a| (a.day_of_week, a.start_time));
        Ok(entries)
    }

    async fn save_availability(&self, entry: &WeeklyAvailability) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let clashes = entry.is_available
            && tables.availability.iter().any(|a| {
                a.id != entry.id
                    && a.doctor_id == entry.doctor_id
                    && a.day_of_week == entry.day_of_week
                    && a.is_available
            });
        if clashes {
            return Err(StoreError::Conflict(format!(
                "doctor {} already has active availability on day {}",
                entry.doctor_id, entry.day_of_week
            )));
        }

        match tables.availability.iter_mut().find(|a| a.id == entry.id) {
            Some(existing) => *existing = entry.clone(),
            None => tables.availability.push(entry.clone()),
        }
        Ok(())
    }

    async fn find_appointment(&self, id: Uuid) -> StoreResult<Option<Appointment>> {
        let tables = self.tables.read().await;
        Ok(tables.appointments.iter().find(|a| a.id == id).cloned())
    }

    async fn list_appointments(&self, query: &AppointmentQuery) -> StoreResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut appointments: Vec<Appointment> = tables.appointments.iter()
            .filter(|a| query.matches(a))
            .cloned()
            .collect();
        appointments.sort_by_key(|a| a.appointment_date);
        Ok(appointments)
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.appointments.iter().any(|a| a.id == appointment.id) {
            return Err(StoreError::Conflict(format!("appointment {} already exists", appointment.id)));
        }
        if tables.slot_taken(appointment) {
            return Err(StoreError::Conflict(format!(
                "doctor {} already has an active appointment at {}",
                appointment.doctor_id, appointment.appointment_date
            )));
        }
        tables.appointments.push(appointment.clone());
        Ok(())
    }

    async fn update_appointment(&self, appointment: &Appointment) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.slot_taken(appointment) {
            return Err(StoreError::Conflict(format!(
                "doctor {} already has an active appointment at {}",
                appointment.doctor_id, appointment.appointment_date
            )));
        }
        let existing = tables.appointments.iter_mut()
            .find(|a| a.id == appointment.id)
            .ok_or_else(|| StoreError::not_found("appointment", appointment.id))?;
        *existing = appointment.clone();
        Ok(())
    }

    async fn delete_appointment(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.appointments.len();
        tables.appointments.retain(|a| a.id != id);
        if tables.appointments.len() == before {
            return Err(StoreError::not_found("appointment", id));
        }
        tables.reviews.retain(|r| r.appointment_id != id);
        Ok(())
    }

    async fn list_reviews(&self, doctor_id: Uuid) -> StoreResult<Vec<Review>> {
        let tables = self.tables.read().await;
        let mut reviews: Vec<Review> = tables.reviews.iter()
            .rev()
            .filter(|r| r.doctor_id == doctor_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn find_review_by_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<Review>> {
        let tables = self.tables.read().await;
        Ok(tables.reviews.iter().find(|r| r.appointment_id == appointment_id).cloned())
    }

    async fn insert_review(&self, review: &Review) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.reviews.iter().any(|r| r.id == review.id || r.appointment_id == review.appointment_id) {
            return Err(StoreError::Conflict(format!(
                "appointment {} has already been reviewed",
                review.appointment_id
            )));
        }
        tables.reviews.push(review.clone());
        Ok(())
    }

    async fn count_reviews(&self) -> StoreResult<usize> {
        Ok(self.tables.read().await.reviews.len())
    }

    async fn list_favorites(&self, patient_id: Uuid) -> StoreResult<Vec<FavoriteDoctor>> {
        let tables = self.tables.read().await;
        Ok(tables.favorites.iter().filter(|f| f.patient_id == patient_id).cloned().collect())
    }

    async fn find_favorite(&self, patient_id: Uuid, doctor_id: Uuid) -> StoreResult<Option<FavoriteDoctor>> {
        let tables = self.tables.read().await;
        Ok(tables.favorites.iter()
            .find(|f| f.patient_id == patient_id && f.doctor_id == doctor_id)
            .cloned())
    }

    async fn insert_favorite(&self, favorite: &FavoriteDoctor) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.favorites.iter().any(|f| f.patient_id == favorite.patient_id && f.doctor_id == favorite.doctor_id) {
            return Err(StoreError::Conflict("doctor is already a favorite".to_string()));
        }
        tables.favorites.push(favorite.clone());
        Ok(())
    }

    async fn delete_favorite(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.favorites.len();
        tables.favorites.retain(|f| f.id != id);
        if tables.favorites.len() == before {
            return Err(StoreError::not_found("favorite", id));
        }
        Ok(())
    }
}
