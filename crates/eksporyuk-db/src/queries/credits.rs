//! Credit ledger queries.
//!
//! These are the raw row operations. Balance arithmetic and the
//! one-transaction-per-posting rule live in `eksporyuk-ledger`.

use eksporyuk_types::credit::{CreditAccount, CreditStats, CreditTransaction};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::{enum_col, new_id, opt_enum_col, ts_col, DbError, Result};

const ACCOUNT_COLUMNS: &str =
    "id, affiliate_id, balance, total_top_up, total_used, total_refund, created_at, updated_at";

const TX_COLUMNS: &str = "id, credit_id, affiliate_id, type, amount, balance_before, balance_after,
     description, reference_type, reference_id, status, created_at";

fn map_account(row: &Row<'_>) -> rusqlite::Result<CreditAccount> {
    Ok(CreditAccount {
        id: row.get(0)?,
        affiliate_id: row.get(1)?,
        balance: row.get(2)?,
        total_top_up: row.get(3)?,
        total_used: row.get(4)?,
        total_refund: row.get(5)?,
        created_at: ts_col(row, 6)?,
        updated_at: ts_col(row, 7)?,
    })
}

fn map_tx(row: &Row<'_>) -> rusqlite::Result<CreditTransaction> {
    Ok(CreditTransaction {
        id: row.get(0)?,
        credit_id: row.get(1)?,
        affiliate_id: row.get(2)?,
        tx_type: enum_col(row, 3)?,
        amount: row.get(4)?,
        balance_before: row.get(5)?,
        balance_after: row.get(6)?,
        description: row.get(7)?,
        reference_type: opt_enum_col(row, 8)?,
        reference_id: row.get(9)?,
        status: enum_col(row, 10)?,
        created_at: ts_col(row, 11)?,
    })
}

/// Get the credit account of an affiliate, if one was ever created.
pub fn find_account(conn: &Connection, affiliate_id: &str) -> Result<Option<CreditAccount>> {
    Ok(conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM affiliate_credits WHERE affiliate_id = ?1"),
            [affiliate_id],
            map_account,
        )
        .optional()?)
}

/// Create an empty credit account.
pub fn insert_account(conn: &Connection, affiliate_id: &str, now: u64) -> Result<CreditAccount> {
    let account = CreditAccount {
        id: new_id(),
        affiliate_id: affiliate_id.to_string(),
        balance: 0,
        total_top_up: 0,
        total_used: 0,
        total_refund: 0,
        created_at: now,
        updated_at: now,
    };
    conn.execute(
        "INSERT INTO affiliate_credits (id, affiliate_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?3)",
        rusqlite::params![account.id, account.affiliate_id, now as i64],
    )?;
    Ok(account)
}

/// Persist new balance and totals for an existing account.
pub fn update_account(conn: &Connection, account: &CreditAccount) -> Result<()> {
    let updated = conn.execute(
        "UPDATE affiliate_credits
         SET balance = ?1, total_top_up = ?2, total_used = ?3, total_refund = ?4, updated_at = ?5
         WHERE id = ?6",
        rusqlite::params![
            account.balance,
            account.total_top_up,
            account.total_used,
            account.total_refund,
            account.updated_at as i64,
            account.id,
        ],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("credit account {}", account.id)));
    }
    Ok(())
}

/// Append a row to the credit log.
pub fn insert_transaction(conn: &Connection, tx: &CreditTransaction) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO affiliate_credit_transactions ({TX_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ),
        rusqlite::params![
            tx.id,
            tx.credit_id,
            tx.affiliate_id,
            tx.tx_type.as_str(),
            tx.amount,
            tx.balance_before,
            tx.balance_after,
            tx.description,
            tx.reference_type.map(|r| r.as_str()),
            tx.reference_id,
            tx.status.as_str(),
            tx.created_at as i64,
        ],
    )?;
    Ok(())
}

/// Most recent credit log rows of an affiliate, newest first.
pub fn recent_transactions(
    conn: &Connection,
    affiliate_id: &str,
    limit: u32,
) -> Result<Vec<CreditTransaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TX_COLUMNS} FROM affiliate_credit_transactions
         WHERE affiliate_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2"
    ))?;
    let rows = stmt
        .query_map(rusqlite::params![affiliate_id, limit], map_tx)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// An account joined with the owning affiliate, for admin listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountListing {
    #[serde(flatten)]
    pub account: CreditAccount,
    pub affiliate_code: String,
    pub user_name: String,
    pub user_email: String,
}

/// All credit accounts, richest first.
pub fn list_accounts(conn: &Connection) -> Result<Vec<AccountListing>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.affiliate_id, c.balance, c.total_top_up, c.total_used, c.total_refund,
                c.created_at, c.updated_at, p.affiliate_code, u.name, u.email
         FROM affiliate_credits c
         JOIN affiliate_profiles p ON p.id = c.affiliate_id
         JOIN users u ON u.id = p.user_id
         ORDER BY c.balance DESC, c.created_at ASC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(AccountListing {
                account: map_account(row)?,
                affiliate_code: row.get(8)?,
                user_name: row.get(9)?,
                user_email: row.get(10)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Aggregate figures across all accounts.
pub fn stats(conn: &Connection) -> Result<CreditStats> {
    Ok(conn.query_row(
        "SELECT COALESCE(SUM(balance), 0), COALESCE(SUM(total_top_up), 0),
                COALESCE(SUM(total_used), 0), COUNT(*)
         FROM affiliate_credits",
        [],
        |row| {
            Ok(CreditStats {
                total_balance: row.get(0)?,
                total_top_up: row.get(1)?,
                total_used: row.get(2)?,
                total_affiliates: row.get(3)?,
            })
        },
    )?)
}
