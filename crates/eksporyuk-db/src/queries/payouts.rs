//! Payout (withdrawal request) queries.

use eksporyuk_types::payout::{Payout, PayoutStatus};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::{enum_col, opt_ts_col, ts_col, DbError, Result};

const COLUMNS: &str = "id, wallet_id, amount, admin_fee, net_amount, status, notes,
     rejected_reason, processed_by, processed_at, created_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<Payout> {
    Ok(Payout {
        id: row.get(0)?,
        wallet_id: row.get(1)?,
        amount: row.get(2)?,
        admin_fee: row.get(3)?,
        net_amount: row.get(4)?,
        status: enum_col(row, 5)?,
        notes: row.get(6)?,
        rejected_reason: row.get(7)?,
        processed_by: row.get(8)?,
        processed_at: opt_ts_col(row, 9)?,
        created_at: ts_col(row, 10)?,
    })
}

/// Store a new payout request.
pub fn insert(conn: &Connection, payout: &Payout) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO payouts ({COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        rusqlite::params![
            payout.id,
            payout.wallet_id,
            payout.amount,
            payout.admin_fee,
            payout.net_amount,
            payout.status.as_str(),
            payout.notes,
            payout.rejected_reason,
            payout.processed_by,
            payout.processed_at.map(|t| t as i64),
            payout.created_at as i64,
        ],
    )?;
    Ok(())
}

/// Get a payout by id.
pub fn get(conn: &Connection, id: &str) -> Result<Payout> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM payouts WHERE id = ?1"),
        [id],
        map_row,
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("payout {id}")))
}

/// Move a payout out of `PENDING`. Returns `false` when the payout was no
/// longer pending, so the caller can report the conflict.
pub fn resolve(
    conn: &Connection,
    id: &str,
    status: PayoutStatus,
    processed_by: &str,
    rejected_reason: Option<&str>,
    now: u64,
) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE payouts
         SET status = ?1, processed_by = ?2, rejected_reason = ?3, processed_at = ?4
         WHERE id = ?5 AND status = 'PENDING'",
        rusqlite::params![status.as_str(), processed_by, rejected_reason, now as i64, id],
    )?;
    Ok(updated == 1)
}

/// Payouts, newest first, optionally limited to one wallet and/or status.
pub fn list(
    conn: &Connection,
    wallet_id: Option<&str>,
    status: Option<PayoutStatus>,
    limit: u32,
    offset: u32,
) -> Result<Vec<Payout>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM payouts
         WHERE (?1 IS NULL OR wallet_id = ?1) AND (?2 IS NULL OR status = ?2)
         ORDER BY created_at DESC, rowid DESC LIMIT ?3 OFFSET ?4"
    ))?;
    let rows = stmt
        .query_map(
            rusqlite::params![wallet_id, status.map(|s| s.as_str()), limit, offset],
            map_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
