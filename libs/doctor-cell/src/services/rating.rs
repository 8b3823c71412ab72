use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use shared_database::SchedulingStore;

use crate::models::DoctorError;

/// Mean of the ratings rounded to one decimal, with the count. No ratings gives `(0.0, 0)`.
pub fn aggregate_rating(ratings: &[i32]) -> (f64, i32) {
    if ratings.is_empty() {
        return (0.0, 0);
    }

    let count = ratings.len();
    let mean = ratings.iter().map(|r| f64::from(*r)).sum::<f64>() / count as f64;
    ((mean * 10.0).round() / 10.0, count as i32)
}

/// Keeps the cached rating on the doctor record in step with the stored reviews.
pub struct RatingAggregator {
    store: Arc<dyn SchedulingStore>,
}

impl RatingAggregator {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Full recompute from every review of the doctor; cost grows with the review count.
    pub async fn recompute_rating(&self, doctor_id: Uuid) -> Result<(f64, i32), DoctorError> {
        let ratings: Vec<i32> = self.store.list_reviews(doctor_id).await?
            .iter()
            .map(|review| review.rating)
            .collect();

        let (rating, count) = aggregate_rating(&ratings);
        self.store.save_doctor_rating(doctor_id, rating, count).await?;

        info!("Doctor {} rating recomputed: {} over {} reviews", doctor_id, rating, count);
        Ok((rating, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_rating() {
        assert_eq!(aggregate_rating(&[5, 4, 3]), (4.0, 3));
        assert_eq!(aggregate_rating(&[]), (0.0, 0));
        assert_eq!(aggregate_rating(&[5, 4]), (4.5, 2));
        assert_eq!(aggregate_rating(&[5, 5, 4]), (4.7, 3));
        assert_eq!(aggregate_rating(&[1, 2, 2]), (1.7, 3));
    }
}
