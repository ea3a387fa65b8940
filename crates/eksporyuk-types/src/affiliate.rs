//! Affiliate profiles and commission conversions.

use serde::{Deserialize, Serialize};

use crate::{AffiliateId, Id, UserId};

/// Affiliate-specific data attached to a user with the `AFFILIATE` role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateProfile {
    pub id: AffiliateId,
    pub user_id: UserId,
    pub affiliate_code: String,
    /// Default commission rate in percent.
    pub commission_rate: i64,
    pub total_earnings: i64,
    pub total_conversions: i64,
    pub created_at: u64,
}

/// How a commission rate is interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionType {
    /// Rate is a percentage of the sale amount.
    #[default]
    Percentage,
    /// Rate is a fixed Rupiah amount, capped at the sale amount.
    Flat,
}

crate::string_enum!(CommissionType {
    Percentage => "PERCENTAGE",
    Flat => "FLAT",
});

/// Links one completed sale to the affiliate that referred it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateConversion {
    pub id: Id,
    /// The sale this commission was earned on. Unique.
    pub transaction_id: String,
    pub affiliate_id: AffiliateId,
    pub commission_amount: i64,
    pub commission_rate: i64,
    pub commission_type: CommissionType,
    pub paid_out: bool,
    pub paid_out_at: Option<u64>,
    pub created_at: u64,
}

/// Filter on the paid flag of conversions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaidFilter {
    #[default]
    All,
    Paid,
    Unpaid,
}

impl PaidFilter {
    /// SQL value for `paid_out`, or `None` when not filtering.
    pub fn paid_out(self) -> Option<bool> {
        match self {
            PaidFilter::All => None,
            PaidFilter::Paid => Some(true),
            PaidFilter::Unpaid => Some(false),
        }
    }
}

/// Totals over a set of conversions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ConversionStats {
    pub total_commissions: i64,
    pub total_amount: i64,
    pub paid_amount: i64,
    pub unpaid_amount: i64,
    pub paid_count: i64,
    pub unpaid_count: i64,
}

/// Commission booked on one UTC day (`YYYY-MM-DD`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotal {
    pub date: String,
    pub amount: i64,
    pub count: i64,
}
