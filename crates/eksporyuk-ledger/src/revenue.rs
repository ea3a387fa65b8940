//! Approval of pending platform revenue shares.
//!
//! A share recorded by [`crate::commission::record_sale`] sits in the
//! recipient's `balance_pending`. Approving it moves it into `balance`,
//! optionally at an adjusted amount; rejecting it drops it.

use eksporyuk_db::queries::{revenue, wallets};
use eksporyuk_types::revenue::{PendingRevenue, PendingRevenueStatus};
use eksporyuk_types::wallet::WalletTxType;
use rusqlite::Connection;
use tracing::info;

use crate::{begin, LedgerError, Result};

fn pending(conn: &Connection, id: &str) -> Result<PendingRevenue> {
    let row = revenue::get(conn, id)?;
    if row.status != PendingRevenueStatus::Pending {
        return Err(LedgerError::Conflict(format!(
            "revenue share {id} is already {}",
            row.status
        )));
    }
    Ok(row)
}

fn release_pending(wallet_pending: i64, amount: i64, id: &str) -> Result<i64> {
    match wallet_pending.checked_sub(amount) {
        Some(left) if left >= 0 => Ok(left),
        _ => Err(LedgerError::Inconsistent(format!(
            "pending balance {wallet_pending} cannot cover revenue share {id} of {amount}"
        ))),
    }
}

/// Approve a pending share, crediting `adjusted_amount` instead of the
/// recorded amount when given.
///
/// # Errors
///
/// - [`LedgerError::NotFound`] if the share does not exist
/// - [`LedgerError::Conflict`] if it is no longer pending
/// - [`LedgerError::Validation`] if `adjusted_amount` is negative
pub fn approve(
    conn: &mut Connection,
    id: &str,
    approved_by: &str,
    adjusted_amount: Option<i64>,
    note: Option<&str>,
    now: u64,
) -> Result<PendingRevenue> {
    if adjusted_amount.is_some_and(|a| a < 0) {
        return Err(LedgerError::Validation("adjustedAmount must not be negative".into()));
    }

    let tx = begin(conn)?;
    let row = pending(&tx, id)?;
    let final_amount = adjusted_amount.unwrap_or(row.amount);
    let status = if final_amount == row.amount {
        PendingRevenueStatus::Approved
    } else {
        PendingRevenueStatus::Adjusted
    };

    let mut wallet = wallets::get(&tx, &row.wallet_id)?;
    wallet.balance_pending = release_pending(wallet.balance_pending, row.amount, id)?;
    wallet.balance = wallet.balance.checked_add(final_amount).ok_or(LedgerError::Overflow)?;
    wallet.total_earnings = wallet
        .total_earnings
        .checked_add(final_amount)
        .ok_or(LedgerError::Overflow)?;
    wallet.updated_at = now;
    wallets::update(&tx, &wallet)?;

    if final_amount > 0 {
        let description = match status {
            PendingRevenueStatus::Adjusted => format!(
                "{} for sale {} (adjusted from {})",
                row.share_type, row.transaction_id, row.amount
            ),
            _ => format!("{} for sale {}", row.share_type, row.transaction_id),
        };
        wallets::insert_transaction(
            &tx,
            &wallet.id,
            final_amount,
            WalletTxType::Credit,
            &description,
            Some(&row.transaction_id),
            now,
        )?;
    }

    let stored_adjustment = (status == PendingRevenueStatus::Adjusted).then_some(final_amount);
    if !revenue::resolve(&tx, id, status, stored_adjustment, note, approved_by, now)? {
        return Err(LedgerError::Conflict(format!("revenue share {id} is no longer pending")));
    }
    let updated = revenue::get(&tx, id)?;
    tx.commit()?;

    info!(id, %status, amount = final_amount, approved_by, "revenue share approved");
    Ok(updated)
}

/// Reject a pending share. A note explaining why is required.
pub fn reject(
    conn: &mut Connection,
    id: &str,
    approved_by: &str,
    note: &str,
    now: u64,
) -> Result<PendingRevenue> {
    if note.trim().is_empty() {
        return Err(LedgerError::Validation("a note is required to reject".into()));
    }

    let tx = begin(conn)?;
    let row = pending(&tx, id)?;

    let mut wallet = wallets::get(&tx, &row.wallet_id)?;
    wallet.balance_pending = release_pending(wallet.balance_pending, row.amount, id)?;
    wallet.updated_at = now;
    wallets::update(&tx, &wallet)?;

    if !revenue::resolve(
        &tx,
        id,
        PendingRevenueStatus::Rejected,
        None,
        Some(note),
        approved_by,
        now,
    )? {
        return Err(LedgerError::Conflict(format!("revenue share {id} is no longer pending")));
    }
    let updated = revenue::get(&tx, id)?;
    tx.commit()?;

    info!(id, amount = row.amount, approved_by, "revenue share rejected");
    Ok(updated)
}

/// Shares, newest first, optionally by status.
pub fn list(
    conn: &Connection,
    status: Option<PendingRevenueStatus>,
    limit: u32,
    offset: u32,
) -> Result<Vec<PendingRevenue>> {
    Ok(revenue::list(conn, status, limit, offset)?)
}
