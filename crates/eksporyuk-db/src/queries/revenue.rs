//! Pending revenue share queries.

use eksporyuk_types::revenue::{PendingRevenue, PendingRevenueStatus};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::{enum_col, opt_ts_col, ts_col, DbError, Result};

const COLUMNS: &str = "id, wallet_id, transaction_id, amount, type, percentage, status,
     adjusted_amount, note, approved_by, approved_at, created_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<PendingRevenue> {
    Ok(PendingRevenue {
        id: row.get(0)?,
        wallet_id: row.get(1)?,
        transaction_id: row.get(2)?,
        amount: row.get(3)?,
        share_type: enum_col(row, 4)?,
        percentage: row.get(5)?,
        status: enum_col(row, 6)?,
        adjusted_amount: row.get(7)?,
        note: row.get(8)?,
        approved_by: row.get(9)?,
        approved_at: opt_ts_col(row, 10)?,
        created_at: ts_col(row, 11)?,
    })
}

/// Store a new revenue share.
pub fn insert(conn: &Connection, revenue: &PendingRevenue) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO pending_revenue ({COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ),
        rusqlite::params![
            revenue.id,
            revenue.wallet_id,
            revenue.transaction_id,
            revenue.amount,
            revenue.share_type.as_str(),
            revenue.percentage,
            revenue.status.as_str(),
            revenue.adjusted_amount,
            revenue.note,
            revenue.approved_by,
            revenue.approved_at.map(|t| t as i64),
            revenue.created_at as i64,
        ],
    )?;
    Ok(())
}

/// Get a revenue share by id.
pub fn get(conn: &Connection, id: &str) -> Result<PendingRevenue> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM pending_revenue WHERE id = ?1"),
        [id],
        map_row,
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("pending revenue {id}")))
}

/// Settle a share that is still `PENDING`. Returns `false` if it was
/// already settled.
pub fn resolve(
    conn: &Connection,
    id: &str,
    status: PendingRevenueStatus,
    adjusted_amount: Option<i64>,
    note: Option<&str>,
    approved_by: &str,
    now: u64,
) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE pending_revenue
         SET status = ?1, adjusted_amount = ?2, note = ?3, approved_by = ?4, approved_at = ?5
         WHERE id = ?6 AND status = 'PENDING'",
        rusqlite::params![status.as_str(), adjusted_amount, note, approved_by, now as i64, id],
    )?;
    Ok(updated == 1)
}

/// Revenue shares, newest first.
pub fn list(
    conn: &Connection,
    status: Option<PendingRevenueStatus>,
    limit: u32,
    offset: u32,
) -> Result<Vec<PendingRevenue>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM pending_revenue WHERE (?1 IS NULL OR status = ?1)
         ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3"
    ))?;
    let rows = stmt
        .query_map(
            rusqlite::params![status.map(|s| s.as_str()), limit, offset],
            map_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Shares recorded for one sale.
pub fn for_transaction(conn: &Connection, transaction_id: &str) -> Result<Vec<PendingRevenue>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM pending_revenue WHERE transaction_id = ?1 ORDER BY rowid"
    ))?;
    let rows = stmt
        .query_map([transaction_id], map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::new_id;
    use crate::queries::{users, wallets};
    use eksporyuk_types::revenue::RevenueShareType;
    use eksporyuk_types::user::Role;

    fn setup() -> (Connection, String) {
        let conn = crate::open_memory().expect("open test db");
        let user = users::insert(
            &conn,
            &users::NewUser {
                email: "f@example.com",
                name: "Founder",
                role: Role::Admin,
                password_hash: "h",
                password_salt: "s",
            },
            1,
        )
        .expect("user");
        let wallet = wallets::ensure(&conn, &user.id, 1).expect("wallet");
        (conn, wallet.id)
    }

    fn share(wallet_id: &str, tx: &str) -> PendingRevenue {
        PendingRevenue {
            id: new_id(),
            wallet_id: wallet_id.to_string(),
            transaction_id: tx.to_string(),
            amount: 12_750,
            share_type: RevenueShareType::FounderShare,
            percentage: 60,
            status: PendingRevenueStatus::Pending,
            adjusted_amount: None,
            note: None,
            approved_by: None,
            approved_at: None,
            created_at: 5,
        }
    }

    #[test]
    fn test_insert_resolve_list() {
        let (conn, wallet_id) = setup();
        let s = share(&wallet_id, "INV-9");
        insert(&conn, &s).expect("insert");

        let pending = list(&conn, Some(PendingRevenueStatus::Pending), 10, 0).expect("list");
        assert_eq!(pending.len(), 1);
        let adjusted = resolve(
            &conn,
            &s.id,
            PendingRevenueStatus::Adjusted,
            Some(10_000),
            Some("rounding"),
            "admin",
            9,
        );
        assert!(adjusted.expect("resolve"));
        let again = resolve(&conn, &s.id, PendingRevenueStatus::Rejected, None, None, "admin", 10);
        assert!(!again.expect("resolve again"));

        let loaded = get(&conn, &s.id).expect("get");
        assert_eq!(loaded.status, PendingRevenueStatus::Adjusted);
        assert_eq!(loaded.adjusted_amount, Some(10_000));
        assert_eq!(for_transaction(&conn, "INV-9").expect("for tx").len(), 1);
        assert!(list(&conn, Some(PendingRevenueStatus::Pending), 10, 0).expect("list").is_empty());
    }
}
