pub mod error;
pub mod scheduling;

pub use error::AppError;
