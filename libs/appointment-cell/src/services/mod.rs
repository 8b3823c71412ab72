pub mod booking;
pub mod conflict;
pub mod consistency;
pub mod lifecycle;

pub use booking::AppointmentBookingService;
pub use conflict::{find_overlap, ConflictDetectionService};
pub use consistency::SchedulingConsistencyService;
pub use lifecycle::AppointmentLifecycleService;
