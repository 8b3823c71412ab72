pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{AvailableSlot, DoctorError, DoctorResponse, DoctorSummary, SlotSchedule};
pub use services::{AvailabilityService, DoctorService, RatingAggregator, ReviewService};
