//! Pending revenue shares awaiting admin approval.

use serde::{Deserialize, Serialize};

use crate::{Id, WalletId};

/// Which platform party a revenue share belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevenueShareType {
    AdminFee,
    FounderShare,
    CofounderShare,
}

crate::string_enum!(RevenueShareType {
    AdminFee => "ADMIN_FEE",
    FounderShare => "FOUNDER_SHARE",
    CofounderShare => "COFOUNDER_SHARE",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingRevenueStatus {
    Pending,
    Approved,
    /// Approved with an amount different from the computed share.
    Adjusted,
    Rejected,
}

crate::string_enum!(PendingRevenueStatus {
    Pending => "PENDING",
    Approved => "APPROVED",
    Adjusted => "ADJUSTED",
    Rejected => "REJECTED",
});

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PendingRevenue {
    pub id: Id,
    pub wallet_id: WalletId,
    pub transaction_id: String,
    pub amount: i64,
    #[serde(rename = "type")]
    pub share_type: RevenueShareType,
    pub percentage: i64,
    pub status: PendingRevenueStatus,
    pub adjusted_amount: Option<i64>,
    pub note: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<u64>,
    pub created_at: u64,
}
