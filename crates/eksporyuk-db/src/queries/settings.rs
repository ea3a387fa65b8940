//! Key/value settings editable at runtime.

use eksporyuk_types::payout::WithdrawalSettings;
use rusqlite::{Connection, OptionalExtension};

use crate::{DbError, Result};

/// Minimum amount (Rupiah) an affiliate may withdraw in one payout.
pub const WITHDRAWAL_MIN_AMOUNT: &str = "withdrawal_min_amount";
/// Flat fee (Rupiah) deducted from every payout.
pub const WITHDRAWAL_ADMIN_FEE: &str = "withdrawal_admin_fee";

/// Raw value stored under `key`.
pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| row.get(0))
        .optional()?)
}

/// Store `value` under `key`, replacing any previous value.
pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

/// Integer setting, or `default` when unset.
pub fn get_i64(conn: &Connection, key: &str, default: i64) -> Result<i64> {
    let Some(raw) = get(conn, key)? else {
        return Ok(default);
    };
    raw.trim()
        .parse()
        .map_err(|e| DbError::Serialization(format!("setting {key} = {raw:?}: {e}")))
}

/// Current withdrawal rules.
pub fn withdrawal(conn: &Connection) -> Result<WithdrawalSettings> {
    let defaults = WithdrawalSettings::default();
    let min_amount = get_i64(conn, WITHDRAWAL_MIN_AMOUNT, defaults.withdrawal_min_amount)?;
    let admin_fee = get_i64(conn, WITHDRAWAL_ADMIN_FEE, defaults.withdrawal_admin_fee)?;
    Ok(WithdrawalSettings {
        withdrawal_min_amount: min_amount,
        withdrawal_admin_fee: admin_fee,
    })
}

/// Replace the withdrawal rules.
pub fn set_withdrawal(conn: &Connection, settings: &WithdrawalSettings) -> Result<()> {
    set(conn, WITHDRAWAL_MIN_AMOUNT, &settings.withdrawal_min_amount.to_string())?;
    set(conn, WITHDRAWAL_ADMIN_FEE, &settings.withdrawal_admin_fee.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_fee_and_missing_key() {
        let conn = crate::open_memory().expect("open test db");
        assert_eq!(get(&conn, WITHDRAWAL_ADMIN_FEE).expect("get").as_deref(), Some("5000"));
        assert_eq!(get(&conn, "nonexistent").expect("get"), None);
    }

    #[test]
    fn test_set_overwrites() {
        let conn = crate::open_memory().expect("open test db");
        set(&conn, "k", "1").expect("set");
        set(&conn, "k", "2").expect("overwrite");
        assert_eq!(get(&conn, "k").expect("get").as_deref(), Some("2"));
    }

    #[test]
    fn test_get_i64_fallback_and_garbage() {
        let conn = crate::open_memory().expect("open test db");
        assert_eq!(get_i64(&conn, "missing", 7).expect("get"), 7);

        set(&conn, "broken", "abc").expect("set");
        assert!(matches!(
            get_i64(&conn, "broken", 0),
            Err(DbError::Serialization(_))
        ));
    }

    #[test]
    fn test_withdrawal_round_trip() {
        let conn = crate::open_memory().expect("open test db");
        assert_eq!(withdrawal(&conn).expect("read"), WithdrawalSettings::default());

        let updated = WithdrawalSettings {
            withdrawal_min_amount: 100_000,
            withdrawal_admin_fee: 2_500,
        };
        set_withdrawal(&conn, &updated).expect("write");
        assert_eq!(withdrawal(&conn).expect("read"), updated);
    }
}
