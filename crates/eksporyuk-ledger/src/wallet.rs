//! Wallet overview.

use eksporyuk_db::queries::{payouts, wallets};
use eksporyuk_types::wallet::WalletSummary;
use rusqlite::Connection;

use crate::Result;

/// Wallet movements included in a [`summary`].
pub const SUMMARY_TRANSACTIONS: u32 = 10;

/// Payouts included in a [`summary`].
pub const SUMMARY_PAYOUTS: u32 = 5;

/// Balances plus the latest movements and payouts. Users without a
/// wallet get an all-zero summary.
pub fn summary(conn: &Connection, user_id: &str) -> Result<WalletSummary> {
    let Some(wallet) = wallets::find_by_user(conn, user_id)? else {
        return Ok(WalletSummary::default());
    };
    Ok(WalletSummary {
        balance: wallet.balance,
        balance_pending: wallet.balance_pending,
        total_earnings: wallet.total_earnings,
        total_payout: wallet.total_payout,
        transactions: wallets::recent_transactions(conn, &wallet.id, SUMMARY_TRANSACTIONS)?,
        payouts: payouts::list(conn, Some(&wallet.id), None, SUMMARY_PAYOUTS, 0)?,
    })
}
