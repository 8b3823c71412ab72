pub mod models;
pub mod handlers;
pub mod router;
pub mod services;

pub use models::PatientError;
pub use router::patient_routes;
pub use services::{FavoritesService, PatientService};
