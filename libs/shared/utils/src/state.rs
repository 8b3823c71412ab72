use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::{DoctorLocks, SchedulingStore};

use crate::admin::{AdminAuthenticator, SharedSecretAuthenticator};

/// Router state shared by every cell.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn SchedulingStore>,
    pub admin_auth: Arc<dyn AdminAuthenticator>,
    pub locks: Arc<DoctorLocks>,
}

impl AppState {
    /// Wires the shared-secret admin check from `config.admin_password`.
    pub fn new(config: AppConfig, store: Arc<dyn SchedulingStore>) -> Self {
        let admin_auth = Arc::new(SharedSecretAuthenticator::new(&config.admin_password));
        Self {
            config: Arc::new(config),
            store,
            admin_auth,
            locks: Arc::new(DoctorLocks::new()),
        }
    }

    pub fn with_admin_auth(mut self, admin_auth: Arc<dyn AdminAuthenticator>) -> Self {
        self.admin_auth = admin_auth;
        self
    }
}
