//! Server-wide shared state.

use std::sync::Arc;

use eksporyuk_ledger::commission::{Recipients, RevenueSplit};
use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::config::ServerConfig;

/// State handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Database connection. Ledger mutations run while holding the lock.
    pub db: Arc<Mutex<Connection>>,
    /// Configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(conn: Connection, config: ServerConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            config: Arc::new(config),
        }
    }

    /// Configured revenue split.
    pub fn split(&self) -> RevenueSplit {
        self.config.revenue.split()
    }

    /// Share recipients, with unset ids falling back to `acting_admin`.
    pub fn recipients(&self, acting_admin: &str) -> Recipients {
        let pick = |configured: &str| {
            if configured.is_empty() {
                acting_admin.to_string()
            } else {
                configured.to_string()
            }
        };
        let revenue = &self.config.revenue;
        Recipients {
            admin_user_id: pick(&revenue.admin_user_id),
            founder_user_id: pick(&revenue.founder_user_id),
            cofounder_user_id: pick(&revenue.cofounder_user_id),
        }
    }
}
