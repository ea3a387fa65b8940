//! Rupiah wallets.
//!
//! Every user that earns money (affiliates, and the admin / founder /
//! co-founder revenue recipients) owns one wallet. `balance` is
//! withdrawable; `balance_pending` holds revenue shares that still need an
//! admin's approval.

use serde::{Deserialize, Serialize};

use crate::payout::Payout;
use crate::{Id, UserId, WalletId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: WalletId,
    pub user_id: UserId,
    pub balance: i64,
    pub balance_pending: i64,
    pub total_earnings: i64,
    pub total_payout: i64,
    pub created_at: u64,
    pub updated_at: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletTxType {
    /// Affiliate commission from a sale.
    Commission,
    /// Approved revenue share moved out of pending.
    Credit,
    /// Money leaving the wallet for an external payout.
    Payout,
    /// A held payout returned after rejection.
    Refund,
    /// Manual correction.
    Adjustment,
}

crate::string_enum!(WalletTxType {
    Commission => "COMMISSION",
    Credit => "CREDIT",
    Payout => "PAYOUT",
    Refund => "REFUND",
    Adjustment => "ADJUSTMENT",
});

/// A signed wallet movement; negative amounts leave the wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    pub id: Id,
    pub wallet_id: WalletId,
    pub amount: i64,
    #[serde(rename = "type")]
    pub tx_type: WalletTxType,
    pub description: String,
    pub reference: Option<String>,
    pub created_at: u64,
}

/// Wallet overview returned to the wallet owner.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub balance: i64,
    pub balance_pending: i64,
    pub total_earnings: i64,
    pub total_payout: i64,
    pub transactions: Vec<WalletTransaction>,
    pub payouts: Vec<Payout>,
}
