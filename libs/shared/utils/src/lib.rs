pub mod admin;
pub mod extractor;
pub mod state;
pub mod test_utils;
pub mod time;
pub mod validation;

pub use state::AppState;
