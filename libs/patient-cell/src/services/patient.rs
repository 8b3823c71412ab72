use std::sync::Arc;

use tracing::{debug, info};

use shared_database::{AppointmentQuery, SchedulingStore, StoreError};
use shared_models::scheduling::{NewPatient, Patient};

use crate::models::{AdminPatientResponse, PatientError};

pub struct PatientService {
    store: Arc<dyn SchedulingStore>,
}

impl PatientService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Patient>, PatientError> {
        Ok(self.store.find_patient_by_email(email).await?)
    }

    /// The patient owning `identity.email`, created on first sight. Names and phone of an existing
    /// patient are never overwritten.
    pub async fn resolve_or_create(&self, identity: NewPatient) -> Result<Patient, PatientError> {
        if let Some(existing) = self.store.find_patient_by_email(&identity.email).await? {
            debug!("Resolved existing patient {}", existing.id);
            return Ok(existing);
        }

        let email = identity.email.clone();
        match self.store.create_patient(identity).await {
            Ok(created) => {
                info!("Created patient {} for {}", created.id, created.email);
                Ok(created)
            }
            // Another request registered the same email first.
            Err(StoreError::Conflict(_)) => self.store.find_patient_by_email(&email).await?
                .ok_or(PatientError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn admin_list_patients(&self) -> Result<Vec<AdminPatientResponse>, PatientError> {
        let patients = self.store.list_patients().await?;

        let mut result = Vec::with_capacity(patients.len());
        for patient in patients {
            let appointments = self.store
                .list_appointments(&AppointmentQuery::for_patient(patient.id))
                .await?;

            // Ascending by date, so the last one is the latest visit.
            let last_visit = appointments.last()
                .map(|a| a.appointment_date.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "Never".to_string());

            result.push(AdminPatientResponse {
                id: patient.id,
                first_name: patient.first_name,
                last_name: patient.last_name,
                email: patient.email,
                phone: patient.phone.unwrap_or_else(|| "N/A".to_string()),
                appointment_count: appointments.len(),
                last_visit,
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_models::scheduling::AppointmentStatus;
    use shared_utils::test_utils::{at, future_monday, SchedulingFixture};

    fn identity(first_name: &str, phone: Option<&str>) -> NewPatient {
        NewPatient {
            first_name: first_name.to_string(),
            last_name: "Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone: phone.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_email_is_the_identity() {
        let fixture = SchedulingFixture::new().await;
        let service = PatientService::new(fixture.store());

        let first = service.resolve_or_create(identity("Jane", Some("555-0199"))).await.unwrap();
        let second = service.resolve_or_create(identity("Janet", None)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.first_name, "Jane");
        assert_eq!(second.phone.as_deref(), Some("555-0199"));
        assert_eq!(fixture.store().list_patients().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_admin_listing_counts_visits() {
        let fixture = SchedulingFixture::new().await;
        let service = PatientService::new(fixture.store());
        let jane = fixture.patient("jane@example.com").await;
        fixture.patient("john@example.com").await;

        let monday = future_monday();
        fixture.book(&jane, at(monday, 9, 0), AppointmentStatus::Completed).await;
        fixture.book(&jane, at(monday + chrono::Duration::days(2), 9, 0), AppointmentStatus::Scheduled).await;

        let listed = service.admin_list_patients().await.unwrap();
        let jane_row = listed.iter().find(|p| p.email == "jane@example.com").unwrap();
        assert_eq!(jane_row.appointment_count, 2);
        assert_eq!(jane_row.last_visit, "2099-01-07");
        assert_eq!(jane_row.phone, "N/A");

        let john_row = listed.iter().find(|p| p.email == "john@example.com").unwrap();
        assert_eq!(john_row.last_visit, "Never");
    }
}
