//! Sale commissions and platform revenue split.
//!
//! When a sale completes, the affiliate who referred it (if any) earns a
//! commission. What remains is split among the platform:
//!
//! - **Admin fee**: 15% of the remainder
//! - **Founder**: 60% of what is left after the admin fee
//! - **Co-founder**: the rest (40% plus any rounding remainder)
//!
//! The affiliate is paid straight into their wallet balance. Platform
//! shares are parked in the recipients' `balance_pending` until an admin
//! approves them (see [`crate::revenue`]).

use std::collections::BTreeMap;

use eksporyuk_db::queries::conversions::{self, ConversionFilter};
use eksporyuk_db::queries::{affiliates, revenue, wallets};
use chrono::{DateTime, Days, NaiveTime};
use eksporyuk_types::affiliate::{AffiliateConversion, CommissionType, ConversionStats, DailyTotal};
use eksporyuk_types::revenue::{PendingRevenue, PendingRevenueStatus, RevenueShareType};
use eksporyuk_types::wallet::WalletTxType;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{begin, require_positive, LedgerError, Result};

/// Default admin fee percentage of the post-commission remainder.
pub const DEFAULT_ADMIN_PCT: i64 = 15;

/// Default founder percentage of what is left after the admin fee.
pub const DEFAULT_FOUNDER_PCT: i64 = 60;

/// Default co-founder percentage of what is left after the admin fee.
pub const DEFAULT_COFOUNDER_PCT: i64 = 40;

/// Percentages used to divide the non-affiliate part of a sale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueSplit {
    pub admin_pct: i64,
    pub founder_pct: i64,
    pub cofounder_pct: i64,
}

/// Default split: admin 15, then founder 60 / co-founder 40.
pub const DEFAULT_SPLIT: RevenueSplit = RevenueSplit {
    admin_pct: DEFAULT_ADMIN_PCT,
    founder_pct: DEFAULT_FOUNDER_PCT,
    cofounder_pct: DEFAULT_COFOUNDER_PCT,
};

impl Default for RevenueSplit {
    fn default() -> Self {
        DEFAULT_SPLIT
    }
}

impl RevenueSplit {
    /// The admin percentage must be within 0..=100 and the founder and
    /// co-founder percentages must sum to 100.
    pub fn validate(&self) -> Result<()> {
        if !(0..=100).contains(&self.admin_pct) {
            return Err(LedgerError::Validation(format!(
                "admin percentage {} out of range",
                self.admin_pct
            )));
        }
        if self.founder_pct < 0
            || self.cofounder_pct < 0
            || self.founder_pct + self.cofounder_pct != 100
        {
            return Err(LedgerError::Validation(format!(
                "founder and co-founder percentages must sum to 100, got {} + {}",
                self.founder_pct, self.cofounder_pct
            )));
        }
        Ok(())
    }
}

/// How one sale amount is divided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionBreakdown {
    pub total_amount: i64,
    pub affiliate_commission: i64,
    pub remaining_after_affiliate: i64,
    pub admin_fee: i64,
    pub founder_share: i64,
    pub cofounder_share: i64,
}

impl CommissionBreakdown {
    /// Sum of all parts. Always equals `total_amount`.
    pub fn distributed(&self) -> i64 {
        self.affiliate_commission + self.admin_fee + self.founder_share + self.cofounder_share
    }
}

/// Percentage of an amount, rounded down.
fn pct_of(amount: i64, pct: i64) -> Result<i64> {
    Ok(amount.checked_mul(pct).ok_or(LedgerError::Overflow)? / 100)
}

/// Divide a sale amount.
///
/// `rate` is a percentage for [`CommissionType::Percentage`] and a fixed
/// amount for [`CommissionType::Flat`] (capped at the sale amount).
///
/// # Errors
///
/// - [`LedgerError::Validation`] if `total_amount <= 0`, the rate is
///   negative, a percentage rate exceeds 100, or the split is invalid
/// - [`LedgerError::Overflow`] on arithmetic overflow
pub fn calculate(
    total_amount: i64,
    rate: i64,
    kind: CommissionType,
    split: &RevenueSplit,
) -> Result<CommissionBreakdown> {
    require_positive(total_amount, "sale amount")?;
    split.validate()?;
    if rate < 0 {
        return Err(LedgerError::Validation("commission rate must not be negative".into()));
    }

    let affiliate_commission = match kind {
        CommissionType::Percentage => {
            if rate > 100 {
                return Err(LedgerError::Validation(format!(
                    "commission rate {rate}% exceeds 100%"
                )));
            }
            pct_of(total_amount, rate)?
        }
        CommissionType::Flat => rate.min(total_amount),
    };

    let remaining = total_amount - affiliate_commission;
    let admin_fee = pct_of(remaining, split.admin_pct)?;
    let for_founders = remaining - admin_fee;
    let founder_share = pct_of(for_founders, split.founder_pct)?;
    let cofounder_share = for_founders - founder_share;

    Ok(CommissionBreakdown {
        total_amount,
        affiliate_commission,
        remaining_after_affiliate: remaining,
        admin_fee,
        founder_share,
        cofounder_share,
    })
}

/// User ids that receive the platform shares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recipients {
    pub admin_user_id: String,
    pub founder_user_id: String,
    pub cofounder_user_id: String,
}

/// A completed sale to be booked.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    /// External id of the sale; one booking per id.
    pub transaction_id: String,
    pub amount: i64,
    /// Referring affiliate, if any.
    #[serde(default)]
    pub affiliate_id: Option<String>,
    /// Overrides the affiliate's own rate. Required for FLAT commissions,
    /// where it is the Rupiah amount paid.
    #[serde(default)]
    pub commission_rate: Option<i64>,
    #[serde(default)]
    pub commission_type: CommissionType,
}

/// Everything written for one sale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleOutcome {
    pub breakdown: CommissionBreakdown,
    pub conversion: Option<AffiliateConversion>,
    pub pending_revenue: Vec<PendingRevenue>,
}

/// Book a completed sale.
///
/// # Errors
///
/// - [`LedgerError::Validation`] for a FLAT sale without `commission_rate`
/// - [`LedgerError::Conflict`] if the sale was already booked
/// - [`LedgerError::NotFound`] if the affiliate does not exist
/// - anything [`calculate`] returns
pub fn record_sale(
    conn: &mut Connection,
    sale: &Sale,
    recipients: &Recipients,
    split: &RevenueSplit,
    now: u64,
) -> Result<SaleOutcome> {
    if sale.transaction_id.trim().is_empty() {
        return Err(LedgerError::Validation("transactionId is required".into()));
    }
    // A profile rate is a percentage; it cannot stand in for a Rupiah amount.
    if sale.commission_type == CommissionType::Flat && sale.commission_rate.is_none() {
        return Err(LedgerError::Validation(
            "commissionRate is required for FLAT commissions".into(),
        ));
    }

    let tx = begin(conn)?;

    if conversions::find_by_transaction(&tx, &sale.transaction_id)?.is_some()
        || !revenue::for_transaction(&tx, &sale.transaction_id)?.is_empty()
    {
        warn!(transaction_id = %sale.transaction_id, "duplicate sale");
        return Err(LedgerError::Conflict(format!(
            "sale {} already recorded",
            sale.transaction_id
        )));
    }

    let profile = match &sale.affiliate_id {
        Some(id) => Some(affiliates::get(&tx, id)?),
        None => None,
    };
    let (rate, kind) = match &profile {
        Some(p) => (
            sale.commission_rate.unwrap_or(p.commission_rate),
            sale.commission_type,
        ),
        None => (0, CommissionType::Percentage),
    };
    let breakdown = calculate(sale.amount, rate, kind, split)?;

    let mut conversion = None;
    if let Some(profile) = profile {
        let commission = breakdown.affiliate_commission;
        let row = AffiliateConversion {
            id: eksporyuk_db::new_id(),
            transaction_id: sale.transaction_id.clone(),
            affiliate_id: profile.id.clone(),
            commission_amount: commission,
            commission_rate: rate,
            commission_type: kind,
            paid_out: false,
            paid_out_at: None,
            created_at: now,
        };
        conversions::insert(&tx, &row)?;
        affiliates::record_conversion(&tx, &profile.id, commission)?;

        if commission > 0 {
            let mut wallet = wallets::ensure(&tx, &profile.user_id, now)?;
            wallet.balance = wallet.balance.checked_add(commission).ok_or(LedgerError::Overflow)?;
            wallet.total_earnings = wallet
                .total_earnings
                .checked_add(commission)
                .ok_or(LedgerError::Overflow)?;
            wallet.updated_at = now;
            wallets::update(&tx, &wallet)?;
            wallets::insert_transaction(
                &tx,
                &wallet.id,
                commission,
                WalletTxType::Commission,
                &format!("Commission for sale {}", sale.transaction_id),
                Some(&sale.transaction_id),
                now,
            )?;
        }
        conversion = Some(row);
    }

    let shares = [
        (
            RevenueShareType::AdminFee,
            &recipients.admin_user_id,
            breakdown.admin_fee,
            split.admin_pct,
        ),
        (
            RevenueShareType::FounderShare,
            &recipients.founder_user_id,
            breakdown.founder_share,
            split.founder_pct,
        ),
        (
            RevenueShareType::CofounderShare,
            &recipients.cofounder_user_id,
            breakdown.cofounder_share,
            split.cofounder_pct,
        ),
    ];

    let mut pending_revenue = Vec::new();
    for (share_type, user_id, amount, percentage) in shares {
        if amount == 0 {
            continue;
        }
        let mut wallet = wallets::ensure(&tx, user_id, now)?;
        wallet.balance_pending = wallet
            .balance_pending
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        wallet.updated_at = now;
        wallets::update(&tx, &wallet)?;

        let row = PendingRevenue {
            id: eksporyuk_db::new_id(),
            wallet_id: wallet.id,
            transaction_id: sale.transaction_id.clone(),
            amount,
            share_type,
            percentage,
            status: PendingRevenueStatus::Pending,
            adjusted_amount: None,
            note: None,
            approved_by: None,
            approved_at: None,
            created_at: now,
        };
        revenue::insert(&tx, &row)?;
        pending_revenue.push(row);
    }

    tx.commit()?;

    info!(
        transaction_id = %sale.transaction_id,
        amount = sale.amount,
        affiliate_commission = breakdown.affiliate_commission,
        admin_fee = breakdown.admin_fee,
        founder_share = breakdown.founder_share,
        cofounder_share = breakdown.cofounder_share,
        "sale recorded"
    );

    Ok(SaleOutcome {
        breakdown,
        conversion,
        pending_revenue,
    })
}

/// Commissions paid to one affiliate by [`mark_paid`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliatePayment {
    pub affiliate_id: String,
    pub amount: i64,
    pub conversions: usize,
}

/// An affiliate whose commissions could not be paid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFailure {
    pub affiliate_id: String,
    pub error: String,
}

/// Outcome of [`mark_paid`]. Each affiliate succeeds or fails on its own.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPaidReport {
    pub paid: Vec<AffiliatePayment>,
    pub failed: Vec<PaymentFailure>,
    pub total_paid: i64,
}

/// Pay out unpaid conversions from the affiliates' wallets.
///
/// Unknown and already-paid ids are ignored. Conversions are grouped by
/// affiliate and each group is settled in its own transaction: the
/// conversions are flagged paid, the wallet is debited and a `PAYOUT`
/// wallet movement appended.
///
/// # Errors
///
/// - [`LedgerError::Validation`] if `conversion_ids` is empty or none of
///   them is an unpaid conversion
pub fn mark_paid(
    conn: &mut Connection,
    conversion_ids: &[String],
    processed_by: &str,
    notes: Option<&str>,
    now: u64,
) -> Result<MarkPaidReport> {
    if conversion_ids.is_empty() {
        return Err(LedgerError::Validation("conversionIds must not be empty".into()));
    }

    let mut ids = conversion_ids.to_vec();
    ids.sort();
    ids.dedup();
    let unpaid = conversions::unpaid_by_ids(conn, &ids)?;
    if unpaid.is_empty() {
        return Err(LedgerError::Validation("no unpaid commissions found".into()));
    }

    let mut groups: BTreeMap<String, Vec<AffiliateConversion>> = BTreeMap::new();
    for conv in unpaid {
        groups.entry(conv.affiliate_id.clone()).or_default().push(conv);
    }

    let mut report = MarkPaidReport::default();
    for (affiliate_id, group) in groups {
        match pay_affiliate(conn, &affiliate_id, &group, processed_by, notes, now) {
            Ok(payment) => {
                report.total_paid += payment.amount;
                report.paid.push(payment);
            }
            Err(e) => {
                warn!(affiliate_id = %affiliate_id, error = %e, "commission payment failed");
                report.failed.push(PaymentFailure {
                    affiliate_id,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        processed_by,
        paid = report.paid.len(),
        failed = report.failed.len(),
        total_paid = report.total_paid,
        "commissions marked paid"
    );
    Ok(report)
}

fn pay_affiliate(
    conn: &mut Connection,
    affiliate_id: &str,
    group: &[AffiliateConversion],
    processed_by: &str,
    notes: Option<&str>,
    now: u64,
) -> Result<AffiliatePayment> {
    let amount = group
        .iter()
        .try_fold(0i64, |acc, c| acc.checked_add(c.commission_amount))
        .ok_or(LedgerError::Overflow)?;
    let ids: Vec<String> = group.iter().map(|c| c.id.clone()).collect();

    let tx = begin(conn)?;

    let profile = affiliates::get(&tx, affiliate_id)?;
    let mut wallet = wallets::find_by_user(&tx, &profile.user_id)?
        .ok_or_else(|| LedgerError::NotFound(format!("wallet for affiliate {affiliate_id}")))?;
    if wallet.balance < amount {
        return Err(LedgerError::InsufficientBalance {
            required: amount,
            available: wallet.balance,
        });
    }

    if conversions::mark_paid(&tx, &ids, now)? != ids.len() {
        return Err(LedgerError::Conflict(
            "commissions were paid concurrently".into(),
        ));
    }

    wallet.balance -= amount;
    wallet.total_payout = wallet.total_payout.checked_add(amount).ok_or(LedgerError::Overflow)?;
    wallet.updated_at = now;
    wallets::update(&tx, &wallet)?;

    let description = match notes {
        Some(n) if !n.trim().is_empty() => {
            format!("Commission payout ({} conversions): {n}", ids.len())
        }
        _ => format!("Commission payout ({} conversions)", ids.len()),
    };
    wallets::insert_transaction(
        &tx,
        &wallet.id,
        -amount,
        WalletTxType::Payout,
        &description,
        Some(processed_by),
        now,
    )?;
    tx.commit()?;

    Ok(AffiliatePayment {
        affiliate_id: affiliate_id.to_string(),
        amount,
        conversions: ids.len(),
    })
}

/// Days covered by [`commission_chart`], ending today.
pub const CHART_DAYS: usize = 30;

/// A page of conversions with the matching total.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionPage {
    pub conversions: Vec<AffiliateConversion>,
    pub total: i64,
    pub stats: ConversionStats,
    pub chart_data: Vec<DailyTotal>,
}

/// List conversions with totals. Stats ignore the paid filter, search and
/// paging. The chart covers the filter's affiliate only.
pub fn list_conversions(
    conn: &Connection,
    filter: &ConversionFilter,
    now: u64,
) -> Result<ConversionPage> {
    Ok(ConversionPage {
        conversions: conversions::list(conn, filter)?,
        total: conversions::count(conn, filter)?,
        stats: conversion_stats(conn, filter)?,
        chart_data: commission_chart(conn, filter.affiliate_id.as_deref(), now)?,
    })
}

/// Paid / unpaid totals for the filter's affiliate and period.
pub fn conversion_stats(conn: &Connection, filter: &ConversionFilter) -> Result<ConversionStats> {
    Ok(conversions::stats(conn, filter)?)
}

/// Commission per UTC day for the last [`CHART_DAYS`] days, oldest first.
/// Days without sales are reported as zero.
pub fn commission_chart(
    conn: &Connection,
    affiliate_id: Option<&str>,
    now: u64,
) -> Result<Vec<DailyTotal>> {
    let today = i64::try_from(now)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| LedgerError::Validation(format!("timestamp out of range: {now}")))?
        .date_naive();
    let first = today
        .checked_sub_days(Days::new(CHART_DAYS as u64 - 1))
        .ok_or_else(|| LedgerError::Validation(format!("timestamp out of range: {now}")))?;
    let since = first.and_time(NaiveTime::MIN).and_utc().timestamp().max(0) as u64;

    let mut booked: BTreeMap<String, DailyTotal> =
        conversions::daily_totals(conn, affiliate_id, since)?
            .into_iter()
            .map(|day| (day.date.clone(), day))
            .collect();
    Ok(first
        .iter_days()
        .take(CHART_DAYS)
        .map(|day| {
            let date = day.format("%Y-%m-%d").to_string();
            booked.remove(&date).unwrap_or(DailyTotal {
                date,
                amount: 0,
                count: 0,
            })
        })
        .collect())
}
