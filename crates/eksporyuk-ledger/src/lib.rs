//! # eksporyuk-ledger
//!
//! Bookkeeping rules for affiliate credits, commissions, revenue shares
//! and payouts.
//!
//! Every mutating operation takes `&mut Connection`, opens one
//! `IMMEDIATE` SQLite transaction (the write lock is held before any
//! balance is read), performs all reads and writes through it and commits.
//! Any error drops the transaction, which rolls everything back. Nothing
//! is retried.
//!
//! ## Modules
//!
//! - [`credit`] — credit account postings (TOPUP / DEDUCT / REFUND)
//! - [`commission`] — sale commission split and conversion payment
//! - [`revenue`] — approval of pending platform revenue shares
//! - [`payout`] — withdrawal requests and their approval
//! - [`wallet`] — wallet overview

pub mod commission;
pub mod credit;
pub mod payout;
pub mod revenue;
pub mod wallet;

use eksporyuk_db::DbError;
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Input outside the accepted shape or range.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A debit larger than the available balance.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Amount the operation needed.
        required: i64,
        /// Balance at the time of the request.
        available: i64,
    },

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The entity is not in a state that allows the operation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Arithmetic overflow.
    #[error("arithmetic overflow in ledger calculation")]
    Overflow,

    /// Stored data violates a ledger invariant.
    #[error("ledger inconsistency: {0}")]
    Inconsistent(String),

    /// Storage failure.
    #[error("storage error: {0}")]
    Storage(DbError),
}

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => LedgerError::NotFound(what),
            DbError::Constraint(what) => LedgerError::Conflict(what),
            other => LedgerError::Storage(other),
        }
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::Storage(DbError::Sqlite(err))
    }
}

/// Convenience result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Begin a transaction that takes the database write lock immediately.
pub(crate) fn begin(conn: &mut Connection) -> Result<Transaction<'_>> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

/// Reject zero and negative amounts.
pub(crate) fn require_positive(amount: i64, what: &str) -> Result<()> {
    if amount <= 0 {
        return Err(LedgerError::Validation(format!(
            "{what} must be greater than zero"
        )));
    }
    Ok(())
}
