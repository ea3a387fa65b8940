//! Affiliate credit ledger.
//!
//! Each affiliate owns one credit account, created by the first posting
//! against it. A posting reads the account, computes the new state with
//! [`apply`], then writes the account and appends an immutable log row,
//! all inside one `IMMEDIATE` transaction.
//!
//! After every posting:
//!
//! ```text
//! balance == total_top_up + total_refund - total_used    and    balance >= 0
//! ```

use eksporyuk_db::queries::{affiliates, credits};
use eksporyuk_types::credit::{
    find_package, CreditAccount, CreditPackage, CreditStats, CreditTransaction, CreditTxStatus,
    CreditTxType, ReferenceType,
};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use crate::{begin, require_positive, LedgerError, Result};

/// How many log rows [`account_summary`] returns.
pub const RECENT_TRANSACTIONS: u32 = 50;

/// Free-form context stored with a posting.
#[derive(Clone, Copy, Debug, Default)]
pub struct Memo<'a> {
    pub description: Option<&'a str>,
    pub reference_type: Option<ReferenceType>,
    pub reference_id: Option<&'a str>,
}

/// New account state plus the log row that records the change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Posting {
    pub account: CreditAccount,
    pub transaction: CreditTransaction,
}

/// Compute the effect of one posting without touching storage.
///
/// # Errors
///
/// - [`LedgerError::Validation`] if `amount <= 0`, or a refund exceeds the
///   credits used and not yet refunded
/// - [`LedgerError::InsufficientBalance`] if a deduction exceeds the balance
/// - [`LedgerError::Overflow`] if a total would overflow
pub fn apply(
    account: &CreditAccount,
    kind: CreditTxType,
    amount: i64,
    memo: &Memo<'_>,
    now: u64,
) -> Result<Posting> {
    require_positive(amount, "amount")?;

    let mut next = account.clone();
    match kind {
        CreditTxType::Topup => {
            next.balance = add(account.balance, amount)?;
            next.total_top_up = add(account.total_top_up, amount)?;
        }
        CreditTxType::Deduct => {
            if amount > account.balance {
                return Err(LedgerError::InsufficientBalance {
                    required: amount,
                    available: account.balance,
                });
            }
            next.balance = account.balance - amount;
            next.total_used = add(account.total_used, amount)?;
        }
        CreditTxType::Refund => {
            let refundable = account.total_used - account.total_refund;
            if amount > refundable {
                return Err(LedgerError::Validation(format!(
                    "refund of {amount} exceeds refundable credits ({refundable})"
                )));
            }
            next.balance = add(account.balance, amount)?;
            next.total_refund = add(account.total_refund, amount)?;
        }
    }
    next.updated_at = now;

    let transaction = CreditTransaction {
        id: eksporyuk_db::new_id(),
        credit_id: account.id.clone(),
        affiliate_id: account.affiliate_id.clone(),
        tx_type: kind,
        amount,
        balance_before: account.balance,
        balance_after: next.balance,
        description: memo.description.map(str::to_string),
        reference_type: memo.reference_type,
        reference_id: memo.reference_id.map(str::to_string),
        status: CreditTxStatus::Completed,
        created_at: now,
    };

    Ok(Posting {
        account: next,
        transaction,
    })
}

fn add(a: i64, b: i64) -> Result<i64> {
    a.checked_add(b).ok_or(LedgerError::Overflow)
}

/// Post one change to an affiliate's credit account.
pub fn post(
    conn: &mut Connection,
    affiliate_id: &str,
    kind: CreditTxType,
    amount: i64,
    memo: &Memo<'_>,
    now: u64,
) -> Result<Posting> {
    let tx = begin(conn)?;

    affiliates::get(&tx, affiliate_id)?;
    let account = match credits::find_account(&tx, affiliate_id)? {
        Some(account) => account,
        None => credits::insert_account(&tx, affiliate_id, now)?,
    };

    let posting = match apply(&account, kind, amount, memo, now) {
        Ok(posting) => posting,
        Err(e) => {
            warn!(
                affiliate_id,
                %kind,
                amount,
                balance = account.balance,
                error = %e,
                "credit posting rejected"
            );
            return Err(e);
        }
    };

    credits::update_account(&tx, &posting.account)?;
    credits::insert_transaction(&tx, &posting.transaction)?;
    tx.commit()?;

    info!(
        affiliate_id,
        %kind,
        amount,
        balance_before = posting.transaction.balance_before,
        balance_after = posting.transaction.balance_after,
        "credit posting"
    );
    Ok(posting)
}

/// Add credits.
pub fn top_up(
    conn: &mut Connection,
    affiliate_id: &str,
    amount: i64,
    memo: &Memo<'_>,
    now: u64,
) -> Result<Posting> {
    post(conn, affiliate_id, CreditTxType::Topup, amount, memo, now)
}

/// Consume credits. Fails without side effects when the balance is short.
pub fn deduct(
    conn: &mut Connection,
    affiliate_id: &str,
    amount: i64,
    memo: &Memo<'_>,
    now: u64,
) -> Result<Posting> {
    post(conn, affiliate_id, CreditTxType::Deduct, amount, memo, now)
}

/// Return previously consumed credits.
pub fn refund(
    conn: &mut Connection,
    affiliate_id: &str,
    amount: i64,
    memo: &Memo<'_>,
    now: u64,
) -> Result<Posting> {
    post(conn, affiliate_id, CreditTxType::Refund, amount, memo, now)
}

/// Top up by buying a catalogue package.
pub fn buy_package(
    conn: &mut Connection,
    affiliate_id: &str,
    package_name: &str,
    now: u64,
) -> Result<(&'static CreditPackage, Posting)> {
    let package = find_package(package_name)
        .ok_or_else(|| LedgerError::Validation(format!("unknown credit package: {package_name}")))?;
    let description = format!("Top up {} credits ({} package)", package.credits, package.name);
    let memo = Memo {
        description: Some(&description),
        reference_type: Some(ReferenceType::Package),
        reference_id: Some(package.name),
    };
    let posting = top_up(conn, affiliate_id, package.credits, &memo, now)?;
    Ok((package, posting))
}

/// Manual posting by an admin. The admin's user id is kept as reference.
pub fn adjust(
    conn: &mut Connection,
    affiliate_id: &str,
    kind: CreditTxType,
    amount: i64,
    description: Option<&str>,
    admin_id: &str,
    now: u64,
) -> Result<Posting> {
    let memo = Memo {
        description,
        reference_type: Some(ReferenceType::Admin),
        reference_id: Some(admin_id),
    };
    post(conn, affiliate_id, kind, amount, &memo, now)
}

/// Balance view shown to an affiliate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub balance: i64,
    pub total_top_up: i64,
    pub total_used: i64,
    pub total_refund: i64,
    pub transactions: Vec<CreditTransaction>,
}

/// Current balance and recent history. Zeroes if no account exists yet.
pub fn account_summary(conn: &Connection, affiliate_id: &str) -> Result<AccountSummary> {
    let Some(account) = credits::find_account(conn, affiliate_id)? else {
        return Ok(AccountSummary::default());
    };
    Ok(AccountSummary {
        balance: account.balance,
        total_top_up: account.total_top_up,
        total_used: account.total_used,
        total_refund: account.total_refund,
        transactions: credits::recent_transactions(conn, affiliate_id, RECENT_TRANSACTIONS)?,
    })
}

/// Every account with its owner, richest first.
pub fn list_accounts(conn: &Connection) -> Result<Vec<credits::AccountListing>> {
    Ok(credits::list_accounts(conn)?)
}

/// Totals across all accounts.
pub fn ledger_stats(conn: &Connection) -> Result<CreditStats> {
    Ok(credits::stats(conn)?)
}
