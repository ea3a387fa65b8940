//! # eksporyuk-server
//!
//! HTTP JSON API over the affiliate ledger.
//!
//! Handlers authenticate the caller from the session cookie, check the
//! role, take the shared database connection and call into
//! `eksporyuk-ledger`. Ledger errors map onto HTTP statuses in
//! [`error::ApiError`].

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use eksporyuk_db::queries::users;
use eksporyuk_types::unix_now;
use eksporyuk_types::user::Role;
use rusqlite::Connection;
use tracing::{info, warn};

pub use routes::router;
pub use state::AppState;

use crate::config::BootstrapConfig;

/// Create the configured admin account if the database has no admin yet.
/// Returns the id of the created admin.
pub fn bootstrap_admin(
    conn: &Connection,
    config: &BootstrapConfig,
) -> anyhow::Result<Option<String>> {
    if users::count_with_role(conn, Role::Admin)? > 0 {
        return Ok(None);
    }
    if config.admin_email.is_empty() || config.admin_password.is_empty() {
        warn!("no admin account exists and [bootstrap] is not configured");
        return Ok(None);
    }
    if config.admin_password.chars().count() < auth::MIN_PASSWORD_LEN {
        anyhow::bail!(
            "[bootstrap] admin_password must be at least {} characters",
            auth::MIN_PASSWORD_LEN
        );
    }

    let email = config.admin_email.trim().to_lowercase();
    let (hash, salt) = auth::hash_password(&config.admin_password)?;
    let user = users::insert(
        conn,
        &users::NewUser {
            email: &email,
            name: &config.admin_name,
            role: Role::Admin,
            password_hash: &hash,
            password_salt: &salt,
        },
        unix_now(),
    )?;
    info!(user_id = %user.id, email = %user.email, "bootstrap admin created");
    Ok(Some(user.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_admin_once() {
        let conn = eksporyuk_db::open_memory().expect("db");
        let config = BootstrapConfig {
            admin_email: "Owner@Eksporyuk.id".into(),
            admin_password: "change-me-now".into(),
            admin_name: "Owner".into(),
        };
        let id = bootstrap_admin(&conn, &config).expect("bootstrap").expect("created");
        let row = users::get(&conn, &id).expect("user");
        assert_eq!(row.email, "owner@eksporyuk.id");
        assert_eq!(row.role, Role::Admin);

        assert!(bootstrap_admin(&conn, &config).expect("bootstrap").is_none());
    }

    #[test]
    fn test_bootstrap_skipped_without_config() {
        let conn = eksporyuk_db::open_memory().expect("db");
        assert!(bootstrap_admin(&conn, &BootstrapConfig::default())
            .expect("bootstrap")
            .is_none());
    }

    #[test]
    fn test_bootstrap_rejects_short_password() {
        let conn = eksporyuk_db::open_memory().expect("db");
        let config = BootstrapConfig {
            admin_email: "a@b.id".into(),
            admin_password: "short".into(),
            admin_name: "A".into(),
        };
        assert!(bootstrap_admin(&conn, &config).is_err());
    }
}
