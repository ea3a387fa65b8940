//! Affiliate profile queries.

use eksporyuk_types::affiliate::AffiliateProfile;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::{constraint_or, new_id, ts_col, DbError, Result};

const COLUMNS: &str =
    "id, user_id, affiliate_code, commission_rate, total_earnings, total_conversions, created_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<AffiliateProfile> {
    Ok(AffiliateProfile {
        id: row.get(0)?,
        user_id: row.get(1)?,
        affiliate_code: row.get(2)?,
        commission_rate: row.get(3)?,
        total_earnings: row.get(4)?,
        total_conversions: row.get(5)?,
        created_at: ts_col(row, 6)?,
    })
}

/// Create an affiliate profile for a user.
pub fn insert(
    conn: &Connection,
    user_id: &str,
    affiliate_code: &str,
    commission_rate: i64,
    now: u64,
) -> Result<AffiliateProfile> {
    let id = new_id();
    conn.execute(
        "INSERT INTO affiliate_profiles (id, user_id, affiliate_code, commission_rate, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![id, user_id, affiliate_code, commission_rate, now as i64],
    )
    .map_err(|e| constraint_or(e, "affiliate profile or code already exists"))?;
    get(conn, &id)
}

/// Get a profile by id.
pub fn get(conn: &Connection, id: &str) -> Result<AffiliateProfile> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM affiliate_profiles WHERE id = ?1"),
        [id],
        map_row,
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("affiliate {id}")))
}

/// Find the profile owned by a user.
pub fn find_by_user(conn: &Connection, user_id: &str) -> Result<Option<AffiliateProfile>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM affiliate_profiles WHERE user_id = ?1"),
            [user_id],
            map_row,
        )
        .optional()?)
}

/// Find a profile by its referral code (case-insensitive).
pub fn find_by_code(conn: &Connection, code: &str) -> Result<Option<AffiliateProfile>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {COLUMNS} FROM affiliate_profiles WHERE affiliate_code = ?1 COLLATE NOCASE"
            ),
            [code],
            map_row,
        )
        .optional()?)
}

/// Add one converted sale to the profile's running statistics.
pub fn record_conversion(conn: &Connection, id: &str, commission: i64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE affiliate_profiles
         SET total_earnings = total_earnings + ?1, total_conversions = total_conversions + 1
         WHERE id = ?2",
        rusqlite::params![commission, id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("affiliate {id}")));
    }
    Ok(())
}
