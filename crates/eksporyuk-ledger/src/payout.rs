//! Withdrawal requests.
//!
//! Requesting a payout holds the amount right away: the wallet balance is
//! debited and a negative `PAYOUT` movement appended. Approval only records
//! the payout in `total_payout`; rejection gives the held amount back.
//!
//! ```text
//! PENDING ──approve──▶ APPROVED
//!    │
//!    └────reject────▶ REJECTED   (amount refunded)
//! ```

use eksporyuk_db::queries::{payouts, settings, wallets};
use eksporyuk_types::payout::{Payout, PayoutStatus};
use eksporyuk_types::wallet::WalletTxType;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::{begin, LedgerError, Result};

/// Request a withdrawal from the user's wallet.
///
/// # Errors
///
/// - [`LedgerError::Validation`] if the amount is below the configured
///   minimum or does not cover the admin fee
/// - [`LedgerError::NotFound`] if the user has no wallet
/// - [`LedgerError::InsufficientBalance`] if the wallet balance is short
pub fn request(
    conn: &mut Connection,
    user_id: &str,
    amount: i64,
    notes: Option<&str>,
    now: u64,
) -> Result<Payout> {
    let tx = begin(conn)?;
    let limits = settings::withdrawal(&tx)?;

    if amount < limits.withdrawal_min_amount {
        return Err(LedgerError::Validation(format!(
            "minimum withdrawal is {}",
            limits.withdrawal_min_amount
        )));
    }
    let net_amount = amount - limits.withdrawal_admin_fee;
    if net_amount <= 0 {
        return Err(LedgerError::Validation(format!(
            "amount must exceed the admin fee of {}",
            limits.withdrawal_admin_fee
        )));
    }

    let mut wallet = wallets::find_by_user(&tx, user_id)?
        .ok_or_else(|| LedgerError::NotFound(format!("wallet for user {user_id}")))?;
    if amount > wallet.balance {
        warn!(user_id, amount, balance = wallet.balance, "payout exceeds balance");
        return Err(LedgerError::InsufficientBalance {
            required: amount,
            available: wallet.balance,
        });
    }

    let payout = Payout {
        id: eksporyuk_db::new_id(),
        wallet_id: wallet.id.clone(),
        amount,
        admin_fee: limits.withdrawal_admin_fee,
        net_amount,
        status: PayoutStatus::Pending,
        notes: notes.map(str::to_string),
        rejected_reason: None,
        processed_by: None,
        processed_at: None,
        created_at: now,
    };
    payouts::insert(&tx, &payout)?;

    wallet.balance -= amount;
    wallet.updated_at = now;
    wallets::update(&tx, &wallet)?;
    wallets::insert_transaction(
        &tx,
        &wallet.id,
        -amount,
        WalletTxType::Payout,
        "Withdrawal request",
        Some(&payout.id),
        now,
    )?;
    tx.commit()?;

    info!(payout_id = %payout.id, user_id, amount, net_amount, "payout requested");
    Ok(payout)
}

fn pending(conn: &Connection, payout_id: &str) -> Result<Payout> {
    let payout = payouts::get(conn, payout_id)?;
    if payout.status != PayoutStatus::Pending {
        return Err(LedgerError::Conflict(format!(
            "payout {payout_id} is already {}",
            payout.status
        )));
    }
    Ok(payout)
}

/// Approve a pending payout.
pub fn approve(conn: &mut Connection, payout_id: &str, admin_id: &str, now: u64) -> Result<Payout> {
    let tx = begin(conn)?;
    let payout = pending(&tx, payout_id)?;

    if !payouts::resolve(&tx, payout_id, PayoutStatus::Approved, admin_id, None, now)? {
        return Err(LedgerError::Conflict(format!("payout {payout_id} is no longer pending")));
    }
    let mut wallet = wallets::get(&tx, &payout.wallet_id)?;
    wallet.total_payout = wallet
        .total_payout
        .checked_add(payout.amount)
        .ok_or(LedgerError::Overflow)?;
    wallet.updated_at = now;
    wallets::update(&tx, &wallet)?;

    let updated = payouts::get(&tx, payout_id)?;
    tx.commit()?;

    info!(payout_id, admin_id, amount = payout.amount, "payout approved");
    Ok(updated)
}

/// Reject a pending payout and return the held amount.
pub fn reject(
    conn: &mut Connection,
    payout_id: &str,
    admin_id: &str,
    reason: &str,
    now: u64,
) -> Result<Payout> {
    if reason.trim().is_empty() {
        return Err(LedgerError::Validation("rejectedReason is required".into()));
    }

    let tx = begin(conn)?;
    let payout = pending(&tx, payout_id)?;

    if !payouts::resolve(&tx, payout_id, PayoutStatus::Rejected, admin_id, Some(reason), now)? {
        return Err(LedgerError::Conflict(format!("payout {payout_id} is no longer pending")));
    }
    let mut wallet = wallets::get(&tx, &payout.wallet_id)?;
    wallet.balance = wallet
        .balance
        .checked_add(payout.amount)
        .ok_or(LedgerError::Overflow)?;
    wallet.updated_at = now;
    wallets::update(&tx, &wallet)?;
    wallets::insert_transaction(
        &tx,
        &wallet.id,
        payout.amount,
        WalletTxType::Refund,
        &format!("Withdrawal rejected: {reason}"),
        Some(payout_id),
        now,
    )?;

    let updated = payouts::get(&tx, payout_id)?;
    tx.commit()?;

    info!(payout_id, admin_id, amount = payout.amount, "payout rejected");
    Ok(updated)
}

/// A user's payouts, newest first. Empty if the user has no wallet.
pub fn list_for_user(
    conn: &Connection,
    user_id: &str,
    status: Option<PayoutStatus>,
    limit: u32,
    offset: u32,
) -> Result<Vec<Payout>> {
    match wallets::find_by_user(conn, user_id)? {
        Some(wallet) => Ok(payouts::list(conn, Some(&wallet.id), status, limit, offset)?),
        None => Ok(Vec::new()),
    }
}

/// All payouts, newest first.
pub fn list(
    conn: &Connection,
    status: Option<PayoutStatus>,
    limit: u32,
    offset: u32,
) -> Result<Vec<Payout>> {
    Ok(payouts::list(conn, None, status, limit, offset)?)
}
