pub mod doctor;
pub mod availability;
pub mod rating;
pub mod review;

pub use doctor::DoctorService;
pub use availability::AvailabilityService;
pub use rating::{aggregate_rating, RatingAggregator};
pub use review::{NewReview, ReviewService};
