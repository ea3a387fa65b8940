//! Withdrawal requests.

use serde::{Deserialize, Serialize};

use crate::{Id, WalletId};

/// Payout lifecycle: `Pending` moves exactly once to `Approved` or
/// `Rejected`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutStatus {
    Pending,
    Approved,
    Rejected,
}

crate::string_enum!(PayoutStatus {
    Pending => "PENDING",
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    pub id: Id,
    pub wallet_id: WalletId,
    /// Amount held from the wallet.
    pub amount: i64,
    pub admin_fee: i64,
    /// Amount actually transferred: `amount - admin_fee`.
    pub net_amount: i64,
    pub status: PayoutStatus,
    pub notes: Option<String>,
    pub rejected_reason: Option<String>,
    pub processed_by: Option<String>,
    pub processed_at: Option<u64>,
    pub created_at: u64,
}

/// Admin decision on a pending payout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutAction {
    Approve,
    Reject,
}

/// Withdrawal rules editable by admins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalSettings {
    pub withdrawal_min_amount: i64,
    pub withdrawal_admin_fee: i64,
}

impl Default for WithdrawalSettings {
    fn default() -> Self {
        Self {
            withdrawal_min_amount: crate::DEFAULT_WITHDRAWAL_MIN_AMOUNT,
            withdrawal_admin_fee: crate::DEFAULT_WITHDRAWAL_ADMIN_FEE,
        }
    }
}
