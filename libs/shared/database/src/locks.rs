// libs/shared/database/src/locks.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

/// Per-doctor async mutexes. Holding a doctor's guard serializes every read-check-write sequence on
/// that doctor's calendar; different doctors never contend. Entries nobody holds or waits on are
/// dropped on the next `acquire`.
#[derive(Default)]
pub struct DoctorLocks {
    registry: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl DoctorLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, doctor_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            prune_idle(&mut registry);
            registry.entry(doctor_id).or_default().clone()
        };

        debug!("Waiting for scheduling lock on doctor {}", doctor_id);
        lock.lock_owned().await
    }

    /// Doctors whose lock is currently held or awaited.
    pub fn tracked_doctors(&self) -> usize {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        prune_idle(&mut registry);
        registry.len()
    }
}

// Guards and waiters each hold a clone, so a count of one means only the registry refers to it.
fn prune_idle(registry: &mut HashMap<Uuid, Arc<AsyncMutex<()>>>) {
    registry.retain(|_, lock| Arc::strong_count(lock) > 1);
}
