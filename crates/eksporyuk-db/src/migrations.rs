//! Forward-only schema migrations.
//!
//! The applied version lives in `PRAGMA user_version`. Each step runs in
//! its own transaction together with the version bump, so a failed step
//! leaves the database at the previous version.

use rusqlite::{Connection, Transaction};
use tracing::info;

use crate::queries::settings::{WITHDRAWAL_ADMIN_FEE, WITHDRAWAL_MIN_AMOUNT};
use crate::{schema, DbError, Result, SCHEMA_VERSION};

/// One migration step.
struct Step {
    version: u32,
    sql: &'static str,
    seed: Option<fn(&Transaction<'_>) -> Result<()>>,
}

const STEPS: &[Step] = &[Step {
    version: 1,
    sql: schema::SCHEMA_V1,
    seed: Some(seed_withdrawal_settings),
}];

/// Schema version the database file is at.
pub fn current_version(conn: &Connection) -> Result<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Apply every step newer than the database's version.
pub fn run(conn: &Connection) -> Result<()> {
    let from = current_version(conn)?;
    if from > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "database is at schema v{from}, this build supports up to v{SCHEMA_VERSION}"
        )));
    }

    for step in STEPS.iter().filter(|s| s.version > from) {
        info!(version = step.version, "applying schema migration");
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(step.sql)
            .map_err(|e| DbError::Migration(format!("v{}: {e}", step.version)))?;
        if let Some(seed) = step.seed {
            seed(&tx)?;
        }
        tx.pragma_update(None, "user_version", step.version)?;
        tx.commit()?;
    }
    Ok(())
}

fn seed_withdrawal_settings(tx: &Transaction<'_>) -> Result<()> {
    let mut stmt = tx.prepare("INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)")?;
    stmt.execute(rusqlite::params![
        WITHDRAWAL_MIN_AMOUNT,
        eksporyuk_types::DEFAULT_WITHDRAWAL_MIN_AMOUNT.to_string()
    ])?;
    stmt.execute(rusqlite::params![
        WITHDRAWAL_ADMIN_FEE,
        eksporyuk_types::DEFAULT_WITHDRAWAL_ADMIN_FEE.to_string()
    ])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch("PRAGMA foreign_keys = ON;").expect("pragma");
        conn
    }

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [name],
            |row| row.get(0),
        )
        .expect("sqlite_master")
    }

    #[test]
    fn test_steps_end_at_schema_version() {
        let last = STEPS.last().expect("at least one step");
        assert_eq!(last.version, SCHEMA_VERSION);
        assert!(STEPS.windows(2).all(|w| w[0].version < w[1].version));
    }

    #[test]
    fn test_blank_database_reaches_current_version() {
        let conn = blank();
        run(&conn).expect("migrate");
        assert_eq!(current_version(&conn).expect("version"), SCHEMA_VERSION);

        for table in [
            "users",
            "sessions",
            "affiliate_profiles",
            "affiliate_credits",
            "affiliate_credit_transactions",
            "wallets",
            "wallet_transactions",
            "affiliate_conversions",
            "pending_revenue",
            "payouts",
            "settings",
        ] {
            assert!(table_exists(&conn, table), "missing table {table}");
        }
    }

    #[test]
    fn test_rerun_is_a_no_op() {
        let conn = blank();
        run(&conn).expect("first");
        conn.execute(
            "UPDATE settings SET value = '75000' WHERE key = ?1",
            [WITHDRAWAL_MIN_AMOUNT],
        )
        .expect("edit setting");
        run(&conn).expect("second");

        let min: String = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [WITHDRAWAL_MIN_AMOUNT],
                |row| row.get(0),
            )
            .expect("setting");
        assert_eq!(min, "75000", "seeding must not overwrite admin edits");
    }

    #[test]
    fn test_seeded_withdrawal_defaults() {
        let conn = blank();
        run(&conn).expect("migrate");
        let fee: String = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [WITHDRAWAL_ADMIN_FEE],
                |row| row.get(0),
            )
            .expect("setting");
        assert_eq!(fee, "5000");
    }

    #[test]
    fn test_future_version_refused() {
        let conn = blank();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .expect("bump");
        let err = run(&conn).expect_err("newer schema");
        assert!(matches!(err, DbError::Migration(_)));
        assert!(!table_exists(&conn, "users"));
    }
}
