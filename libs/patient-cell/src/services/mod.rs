pub mod favorites;
pub mod patient;

pub use favorites::FavoritesService;
pub use patient::PatientService;
