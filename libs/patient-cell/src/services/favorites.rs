use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::info;
use uuid::Uuid;

use doctor_cell::{DoctorService, DoctorSummary};
use shared_database::{DoctorLocks, SchedulingStore, StoreError};
use shared_models::scheduling::FavoriteDoctor;

use crate::models::{FavoriteToggle, PatientError};

pub struct FavoritesService {
    store: Arc<dyn SchedulingStore>,
    doctors: DoctorService,
}

impl FavoritesService {
    pub fn new(store: Arc<dyn SchedulingStore>, locks: Arc<DoctorLocks>) -> Self {
        Self {
            doctors: DoctorService::new(store.clone(), locks),
            store,
        }
    }

    /// Favorite doctors of the patient with this email; unknown patients have none.
    pub async fn list_favorites(&self, email: &str) -> Result<Vec<DoctorSummary>, PatientError> {
        let Some(patient) = self.store.find_patient_by_email(email).await? else {
            return Ok(Vec::new());
        };

        let ids: Vec<Uuid> = self.store.list_favorites(patient.id).await?
            .into_iter()
            .map(|f| f.doctor_id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self.doctors.summaries(ids).await?)
    }

    /// Adds the doctor to the patient's favorites, or removes it when already present.
    pub async fn toggle_favorite(
        &self,
        email: &str,
        doctor_id: Uuid,
        now: NaiveDateTime,
    ) -> Result<FavoriteToggle, PatientError> {
        let patient = self.store.find_patient_by_email(email).await?
            .ok_or(PatientError::NotFound)?;
        self.store.find_doctor(doctor_id).await?
            .ok_or(PatientError::DoctorNotFound)?;

        if let Some(existing) = self.store.find_favorite(patient.id, doctor_id).await? {
            self.store.delete_favorite(existing.id).await?;
            info!("Patient {} removed doctor {} from favorites", patient.id, doctor_id);
            return Ok(FavoriteToggle {
                favorited: false,
                message: "Removed from favorites".to_string(),
            });
        }

        let favorite = FavoriteDoctor {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            doctor_id,
            created_at: now,
        };
        match self.store.insert_favorite(&favorite).await {
            // A concurrent toggle already added it; the end state is the same.
            Ok(()) | Err(StoreError::Conflict(_)) => {}
            Err(e) => return Err(e.into()),
        }

        info!("Patient {} added doctor {} to favorites", patient.id, doctor_id);
        Ok(FavoriteToggle {
            favorited: true,
            message: "Added to favorites".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_utils::test_utils::{at, future_monday, SchedulingFixture};

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let fixture = SchedulingFixture::new().await;
        let service = FavoritesService::new(fixture.store(), fixture.state.locks.clone());
        fixture.patient("jane@example.com").await;
        let now = at(future_monday(), 8, 0);

        let added = service.toggle_favorite("jane@example.com", fixture.doctor.id, now).await.unwrap();
        assert!(added.favorited);

        let favorites = service.list_favorites("jane@example.com").await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].full_name, "Dr. Sarah Johnson");

        let removed = service.toggle_favorite("jane@example.com", fixture.doctor.id, now).await.unwrap();
        assert!(!removed.favorited);
        assert!(service.list_favorites("jane@example.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_needs_known_patient_and_doctor() {
        let fixture = SchedulingFixture::new().await;
        let service = FavoritesService::new(fixture.store(), fixture.state.locks.clone());
        let now = at(future_monday(), 8, 0);

        assert_matches!(
            service.toggle_favorite("nobody@example.com", fixture.doctor.id, now).await,
            Err(PatientError::NotFound)
        );

        fixture.patient("jane@example.com").await;
        assert_matches!(
            service.toggle_favorite("jane@example.com", Uuid::new_v4(), now).await,
            Err(PatientError::DoctorNotFound)
        );
        assert!(service.list_favorites("nobody@example.com").await.unwrap().is_empty());
    }
}
