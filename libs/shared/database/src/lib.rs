pub mod locks;
pub mod memory;
pub mod seed;
pub mod store;
pub mod supabase;

pub use locks::DoctorLocks;
pub use memory::InMemoryStore;
pub use store::{AppointmentQuery, DoctorQuery, SchedulingStore, StoreError, StoreResult};
pub use supabase::{SupabaseClient, SupabaseStore};
