use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::seed::default_weekly_availability;
use shared_database::{AppointmentQuery, DoctorLocks, DoctorQuery, SchedulingStore, StoreError};
use shared_models::scheduling::{ConsultationType, Doctor, Specialty};
use shared_utils::validation::optional;

use crate::models::{
    AdminDoctorResponse, CreateDoctorRequest, DoctorError, DoctorResponse, DoctorSummary,
    UpdateDoctorRequest,
};

const SEARCH_MIN_CHARS: usize = 2;
const SEARCH_LIMIT: usize = 10;
const DEFAULT_WAIT_TIME: i32 = 15;
const DEFAULT_YEARS_EXPERIENCE: i32 = 5;

pub struct DoctorService {
    store: Arc<dyn SchedulingStore>,
    locks: Arc<DoctorLocks>,
}

impl DoctorService {
    pub fn new(store: Arc<dyn SchedulingStore>, locks: Arc<DoctorLocks>) -> Self {
        Self { store, locks }
    }

    pub async fn list_specialties(&self) -> Result<Vec<Specialty>, DoctorError> {
        Ok(self.store.list_specialties().await?)
    }

    async fn specialty_names(&self) -> Result<HashMap<Uuid, String>, DoctorError> {
        Ok(self.store.list_specialties().await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect())
    }

    async fn specialty_name(&self, specialty_id: Uuid) -> Result<String, DoctorError> {
        Ok(self.store.find_specialty(specialty_id).await?
            .map(|s| s.name)
            .unwrap_or_default())
    }

    /// Catalogue listing. `is_favorite` is set for every doctor, relative to `patient_email` when
    /// that patient exists.
    pub async fn list_doctors(
        &self,
        specialty_id: Option<Uuid>,
        patient_email: Option<&str>,
    ) -> Result<Vec<DoctorResponse>, DoctorError> {
        let query = DoctorQuery { specialty_id, ..DoctorQuery::default() };
        let doctors = self.store.list_doctors(&query).await?;
        let specialties = self.specialty_names().await?;

        let mut favorites = HashSet::new();
        if let Some(email) = patient_email {
            if let Some(patient) = self.store.find_patient_by_email(email).await? {
                favorites = self.store.list_favorites(patient.id).await?
                    .into_iter()
                    .map(|f| f.doctor_id)
                    .collect();
            }
        }

        debug!("Listing {} doctors", doctors.len());

        Ok(doctors.iter()
            .map(|doctor| {
                let specialty = specialties.get(&doctor.specialty_id).map(String::as_str).unwrap_or_default();
                DoctorResponse {
                    is_favorite: Some(favorites.contains(&doctor.id)),
                    ..DoctorResponse::new(doctor, specialty)
                }
            })
            .collect())
    }

    /// Case-insensitive name search. Queries shorter than two characters return nothing.
    pub async fn search_doctors(&self, q: &str) -> Result<Vec<DoctorSummary>, DoctorError> {
        let needle = q.trim().to_lowercase();
        if needle.chars().count() < SEARCH_MIN_CHARS {
            return Ok(Vec::new());
        }

        let query = DoctorQuery {
            limit: Some(SEARCH_LIMIT),
            ..DoctorQuery::named(needle)
        };
        let doctors = self.store.list_doctors(&query).await?;
        let specialties = self.specialty_names().await?;

        Ok(doctors.iter()
            .map(|d| DoctorSummary::new(d, specialties.get(&d.specialty_id).map(String::as_str).unwrap_or_default()))
            .collect())
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<DoctorResponse, DoctorError> {
        let doctor = self.store.find_doctor(doctor_id).await?
            .ok_or(DoctorError::NotFound)?;
        let specialty = self.specialty_name(doctor.specialty_id).await?;
        Ok(DoctorResponse::new(&doctor, &specialty))
    }

    /// Summaries for a set of ids, in catalogue order.
    pub async fn summaries(&self, ids: Vec<Uuid>) -> Result<Vec<DoctorSummary>, DoctorError> {
        let query = DoctorQuery { ids: Some(ids), ..DoctorQuery::default() };
        let doctors = self.store.list_doctors(&query).await?;
        let specialties = self.specialty_names().await?;

        Ok(doctors.iter()
            .map(|d| DoctorSummary::new(d, specialties.get(&d.specialty_id).map(String::as_str).unwrap_or_default()))
            .collect())
    }

    // ==============================================================================
    // ADMIN
    // ==============================================================================

    pub async fn admin_list_doctors(&self) -> Result<Vec<AdminDoctorResponse>, DoctorError> {
        let doctors = self.store.list_doctors(&DoctorQuery::default()).await?;
        let specialties = self.specialty_names().await?;

        let mut result = Vec::with_capacity(doctors.len());
        for doctor in &doctors {
            let appointment_count = self.store
                .list_appointments(&AppointmentQuery::for_doctor(doctor.id))
                .await?
                .len();
            let specialty = specialties.get(&doctor.specialty_id).map(String::as_str).unwrap_or_default();

            result.push(AdminDoctorResponse {
                first_name: doctor.first_name.clone(),
                last_name: doctor.last_name.clone(),
                appointment_count,
                doctor: DoctorResponse::new(doctor, specialty),
            });
        }
        Ok(result)
    }

    async fn require_specialty(&self, raw: &str) -> Result<Uuid, DoctorError> {
        let specialty_id = Uuid::parse_str(raw.trim()).map_err(|_| DoctorError::InvalidSpecialty)?;
        self.store.find_specialty(specialty_id).await?
            .ok_or(DoctorError::InvalidSpecialty)?;
        Ok(specialty_id)
    }

    /// Adds a doctor with the default Monday to Friday 09:00-17:00 availability.
    pub async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, DoctorError> {
        let first_name = required("firstName", request.first_name)?;
        let last_name = required("lastName", request.last_name)?;
        let specialty_raw = required("specialtyId", request.specialty_id)?;
        let email = required("email", request.email)?;

        if self.store.find_doctor_by_email(&email).await?.is_some() {
            return Err(DoctorError::DuplicateEmail);
        }
        let specialty_id = self.require_specialty(&specialty_raw).await?;

        let consultation_types = match request.consultation_types {
            Some(input) => input.into_modes()?,
            None => vec![ConsultationType::InPerson],
        };

        let doctor = Doctor {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            specialty_id,
            email,
            phone: optional(request.phone),
            bio: optional(request.bio),
            image_url: optional(request.image_url),
            rating: 0.0,
            review_count: 0,
            estimated_wait_time: request.wait_time.unwrap_or(DEFAULT_WAIT_TIME),
            consultation_types,
            is_verified: true,
            years_experience: request.years_experience.unwrap_or(DEFAULT_YEARS_EXPERIENCE),
        };

        self.store.insert_doctor(&doctor).await.map_err(duplicate_email)?;
        for entry in default_weekly_availability(doctor.id) {
            self.store.save_availability(&entry).await?;
        }

        info!("Doctor {} ({}) added", doctor.full_name(), doctor.id);
        Ok(doctor)
    }

    pub async fn update_doctor(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorRequest,
    ) -> Result<DoctorResponse, DoctorError> {
        let mut doctor = self.store.find_doctor(doctor_id).await?
            .ok_or(DoctorError::NotFound)?;

        if let Some(email) = optional(request.email) {
            if email != doctor.email {
                if self.store.find_doctor_by_email(&email).await?.is_some() {
                    return Err(DoctorError::DuplicateEmail);
                }
                doctor.email = email;
            }
        }
        if let Some(first_name) = optional(request.first_name) {
            doctor.first_name = first_name;
        }
        if let Some(last_name) = optional(request.last_name) {
            doctor.last_name = last_name;
        }
        if let Some(raw) = optional(request.specialty_id) {
            doctor.specialty_id = self.require_specialty(&raw).await?;
        }
        if let Some(phone) = request.phone {
            doctor.phone = optional(Some(phone));
        }
        if let Some(bio) = request.bio {
            doctor.bio = optional(Some(bio));
        }
        if let Some(image_url) = request.image_url {
            doctor.image_url = optional(Some(image_url));
        }
        if let Some(wait_time) = request.wait_time {
            doctor.estimated_wait_time = wait_time;
        }
        if let Some(input) = request.consultation_types {
            doctor.consultation_types = input.into_modes()?;
        }
        if let Some(years) = request.years_experience {
            doctor.years_experience = years;
        }

        self.store.update_doctor(&doctor).await.map_err(duplicate_email)?;
        info!("Doctor {} updated", doctor_id);

        let specialty = self.specialty_name(doctor.specialty_id).await?;
        Ok(DoctorResponse::new(&doctor, &specialty))
    }

    /// Removes the doctor with every dependent record. Refused while scheduled or rescheduled
    /// appointments remain. Returns the removed doctor's display name.
    pub async fn delete_doctor(&self, doctor_id: Uuid) -> Result<String, DoctorError> {
        self.store.find_doctor(doctor_id).await?
            .ok_or(DoctorError::NotFound)?;
        let _guard = self.locks.acquire(doctor_id).await;

        let doctor = self.store.find_doctor(doctor_id).await?
            .ok_or(DoctorError::NotFound)?;

        let pending = self.store
            .list_appointments(&AppointmentQuery::for_doctor(doctor_id))
            .await?
            .iter()
            .filter(|a| a.status.is_pending())
            .count();

        if pending > 0 {
            warn!("Refusing to delete doctor {} with {} pending appointments", doctor_id, pending);
            return Err(DoctorError::HasScheduledAppointments(pending));
        }

        self.store.delete_doctor(doctor_id).await?;
        info!("Doctor {} deleted", doctor.full_name());
        Ok(doctor.full_name())
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, DoctorError> {
    optional(value).ok_or_else(|| DoctorError::ValidationError(format!("{} is required", field)))
}

fn duplicate_email(err: StoreError) -> DoctorError {
    match err {
        StoreError::Conflict(_) => DoctorError::DuplicateEmail,
        other => DoctorError::Store(other),
    }
}
