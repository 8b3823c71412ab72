use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::seed::default_weekly_availability;
use shared_database::{InMemoryStore, SchedulingStore};
use shared_models::scheduling::{
    Appointment, AppointmentStatus, ConsultationType, Doctor, NewPatient, Patient, Specialty,
};

use crate::state::AppState;

pub const TEST_ADMIN_PASSWORD: &str = "test-admin-secret";

pub struct TestConfig {
    pub admin_password: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            admin_password: TEST_ADMIN_PASSWORD.to_string(),
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            admin_password: self.admin_password.clone(),
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            seed_sample_data: false,
            ..AppConfig::default()
        }
    }
}

/// Empty in-process state.
pub fn test_state() -> AppState {
    AppState::new(TestConfig::default().to_app_config(), Arc::new(InMemoryStore::new()))
}

/// Monday 5 January 2099, far enough ahead that every slot counts as future.
pub fn future_monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2099, 1, 5).expect("valid date")
}

pub fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time"))
}

/// A state holding one specialty and one doctor who works Monday to Friday, 09:00 to 17:00.
pub struct SchedulingFixture {
    pub state: AppState,
    pub specialty: Specialty,
    pub doctor: Doctor,
}

impl SchedulingFixture {
    pub async fn new() -> Self {
        let state = test_state();

        let specialty = Specialty {
            id: Uuid::new_v4(),
            name: "Cardiology".to_string(),
            description: Some("Heart and cardiovascular system".to_string()),
        };
        state.store.insert_specialty(&specialty).await.expect("insert specialty");

        let fixture = Self {
            doctor: Doctor {
                id: Uuid::new_v4(),
                first_name: "Sarah".to_string(),
                last_name: "Johnson".to_string(),
                specialty_id: specialty.id,
                email: "sarah.johnson@clinic.com".to_string(),
                phone: Some("555-0101".to_string()),
                bio: None,
                image_url: None,
                rating: 0.0,
                review_count: 0,
                estimated_wait_time: 10,
                consultation_types: vec![ConsultationType::InPerson, ConsultationType::Video],
                is_verified: true,
                years_experience: 15,
            },
            state,
            specialty,
        };
        fixture.register_doctor(&fixture.doctor).await;
        fixture
    }

    pub fn store(&self) -> Arc<dyn SchedulingStore> {
        self.state.store.clone()
    }

    async fn register_doctor(&self, doctor: &Doctor) {
        self.state.store.insert_doctor(doctor).await.expect("insert doctor");
        for entry in default_weekly_availability(doctor.id) {
            self.state.store.save_availability(&entry).await.expect("insert availability");
        }
    }

    /// Another weekday doctor in the same specialty.
    pub async fn add_doctor(&self, first_name: &str, last_name: &str) -> Doctor {
        let doctor = Doctor {
            id: Uuid::new_v4(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: format!("{}.{}@clinic.com", first_name, last_name).to_lowercase(),
            ..self.doctor.clone()
        };
        self.register_doctor(&doctor).await;
        doctor
    }

    pub async fn patient(&self, email: &str) -> Patient {
        self.state.store
            .create_patient(NewPatient {
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                email: email.to_string(),
                phone: None,
            })
            .await
            .expect("create patient")
    }

    /// Writes an appointment straight to the store, bypassing the overlap guard.
    pub async fn book(&self, patient: &Patient, start: NaiveDateTime, status: AppointmentStatus) -> Appointment {
        let appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id: self.doctor.id,
            patient_id: patient.id,
            appointment_date: start,
            status,
            appointment_type: ConsultationType::InPerson,
            reason: None,
            notes: None,
            reschedule_count: 0,
            original_appointment_id: None,
            created_at: start,
        };
        self.state.store.insert_appointment(&appointment).await.expect("insert appointment");
        appointment
    }
}
