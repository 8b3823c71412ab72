use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use shared_database::{DoctorLocks, SchedulingStore, StoreError};
use shared_models::scheduling::{Appointment, AppointmentStatus, Review, MAX_REVIEW_RATING, MIN_REVIEW_RATING};
use shared_utils::time::iso;

use crate::models::{DoctorError, ReviewResponse};
use crate::services::rating::RatingAggregator;

pub struct NewReview {
    pub appointment_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

pub struct ReviewService {
    store: Arc<dyn SchedulingStore>,
    locks: Arc<DoctorLocks>,
    aggregator: RatingAggregator,
}

impl ReviewService {
    pub fn new(store: Arc<dyn SchedulingStore>, locks: Arc<DoctorLocks>) -> Self {
        Self {
            aggregator: RatingAggregator::new(store.clone()),
            store,
            locks,
        }
    }

    /// Attach a review to a completed appointment and refresh the doctor's cached rating.
    /// The write and the recompute happen under the doctor's lock.
    #[instrument(skip(self, review), fields(appointment_id = %review.appointment_id, doctor_id = %review.doctor_id))]
    pub async fn submit_review(&self, review: NewReview, now: NaiveDateTime) -> Result<Review, DoctorError> {
        if !(MIN_REVIEW_RATING..=MAX_REVIEW_RATING).contains(&review.rating) {
            return Err(DoctorError::ValidationError(format!(
                "rating must be between {} and {}",
                MIN_REVIEW_RATING, MAX_REVIEW_RATING
            )));
        }

        self.reviewed_appointment(&review).await?;
        let _guard = self.locks.acquire(review.doctor_id).await;
        let appointment = self.reviewed_appointment(&review).await?;

        if appointment.status != AppointmentStatus::Completed {
            return Err(DoctorError::AppointmentNotCompleted);
        }
        if self.store.find_review_by_appointment(appointment.id).await?.is_some() {
            warn!("Appointment {} already has a review", appointment.id);
            return Err(DoctorError::AlreadyReviewed);
        }

        let stored = Review {
            id: Uuid::new_v4(),
            appointment_id: review.appointment_id,
            doctor_id: review.doctor_id,
            patient_id: review.patient_id,
            rating: review.rating,
            comment: review.comment,
            created_at: now,
        };

        self.store.insert_review(&stored).await.map_err(|e| match e {
            StoreError::Conflict(_) => DoctorError::AlreadyReviewed,
            other => DoctorError::Store(other),
        })?;
        info!("Review {} stored with rating {}", stored.id, stored.rating);

        self.aggregator.recompute_rating(review.doctor_id).await?;
        Ok(stored)
    }

    /// The appointment under review, provided it belongs to the named doctor and patient.
    async fn reviewed_appointment(&self, review: &NewReview) -> Result<Appointment, DoctorError> {
        let appointment = self.store.find_appointment(review.appointment_id).await?
            .ok_or(DoctorError::AppointmentNotFound)?;

        if appointment.doctor_id != review.doctor_id || appointment.patient_id != review.patient_id {
            return Err(DoctorError::ReviewMismatch);
        }
        Ok(appointment)
    }

    /// Reviews of a doctor, newest first, with the reviewer shortened to `First L.`
    pub async fn list_reviews(&self, doctor_id: Uuid) -> Result<Vec<ReviewResponse>, DoctorError> {
        self.store.find_doctor(doctor_id).await?
            .ok_or(DoctorError::NotFound)?;

        let mut result = Vec::new();
        for review in self.store.list_reviews(doctor_id).await? {
            let patient_name = self.store.find_patient(review.patient_id).await?
                .map(|p| p.short_name())
                .unwrap_or_else(|| "Anonymous".to_string());

            result.push(ReviewResponse {
                id: review.id,
                rating: review.rating,
                comment: review.comment,
                date: iso(review.created_at),
                patient_name,
            });
        }
        Ok(result)
    }
}
