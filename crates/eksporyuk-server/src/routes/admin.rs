//! Admin back office: credit adjustments, affiliates, sales, commission
//! payment, payout review, revenue approval and withdrawal settings.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::{DateTime, Datelike, Months, NaiveTime};
use eksporyuk_db::queries::conversions::ConversionFilter;
use eksporyuk_db::queries::{affiliates, settings, users};
use eksporyuk_ledger::commission::{self, ConversionPage, MarkPaidReport, Sale, SaleOutcome};
use eksporyuk_ledger::{credit, payout, revenue};
use eksporyuk_types::affiliate::{AffiliateProfile, PaidFilter};
use eksporyuk_types::credit::CreditTxType;
use eksporyuk_types::payout::{Payout, PayoutAction, PayoutStatus, WithdrawalSettings};
use eksporyuk_types::revenue::{PendingRevenue, PendingRevenueStatus};
use eksporyuk_types::unix_now;
use eksporyuk_types::user::Role;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{paging, ApiJson, ApiQuery};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/affiliate/credits", get(list_credits).post(adjust_credits))
        .route("/admin/affiliates", post(enrol_affiliate))
        .route("/admin/sales", post(record_sale))
        .route(
            "/admin/affiliate-commissions",
            get(list_commissions).post(pay_commissions),
        )
        .route("/admin/payouts", get(list_payouts))
        .route("/admin/payouts/:id", patch(process_payout))
        .route("/admin/pending-revenue", get(list_revenue))
        .route("/admin/pending-revenue/:id/approve", post(approve_revenue))
        .route("/admin/pending-revenue/:id/reject", post(reject_revenue))
        .route(
            "/admin/settings/withdrawal",
            get(get_withdrawal_settings).put(put_withdrawal_settings),
        )
}

// ============================================================================
// Credits
// ============================================================================

async fn list_credits(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Value>, ApiError> {
    user.require_admin()?;
    let db = state.db.lock().await;
    Ok(Json(serde_json::json!({
        "credits": credit::list_accounts(&db)?,
        "stats": credit::ledger_stats(&db)?,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustCreditsRequest {
    pub affiliate_id: String,
    #[serde(rename = "type")]
    pub tx_type: CreditTxType,
    pub amount: i64,
    #[serde(default)]
    pub description: Option<String>,
}

async fn adjust_credits(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<AdjustCreditsRequest>,
) -> Result<Json<Value>, ApiError> {
    user.require_admin()?;
    let mut db = state.db.lock().await;
    let posting = credit::adjust(
        &mut db,
        &req.affiliate_id,
        req.tx_type,
        req.amount,
        req.description.as_deref(),
        user.id(),
        unix_now(),
    )?;
    Ok(Json(serde_json::json!({
        "success": true,
        "credit": posting.account,
        "transaction": posting.transaction,
    })))
}

// ============================================================================
// Affiliates & sales
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolAffiliateRequest {
    pub user_id: String,
    #[serde(default)]
    pub affiliate_code: Option<String>,
    #[serde(default)]
    pub commission_rate: Option<i64>,
}

/// Referral code from the first letters of a name plus a random suffix.
fn generate_code(name: &str) -> String {
    let prefix: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(4)
        .collect::<String>()
        .to_uppercase();
    format!("{prefix}{}", hex::encode_upper(rand::random::<[u8; 3]>()))
}

fn validate_code(code: &str) -> Result<(), ApiError> {
    let ok = (3..=32).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(ApiError::Validation(
            "affiliateCode must be 3-32 letters, digits, '-' or '_'".into(),
        ))
    }
}

async fn enrol_affiliate(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<EnrolAffiliateRequest>,
) -> Result<(StatusCode, Json<AffiliateProfile>), ApiError> {
    user.require_admin()?;
    let rate = req
        .commission_rate
        .unwrap_or(state.config.affiliate.default_commission_rate);
    if !(0..=100).contains(&rate) {
        return Err(ApiError::Validation("commissionRate must be between 0 and 100".into()));
    }

    let mut db = state.db.lock().await;
    let tx = db.transaction()?;
    let target = users::get(&tx, &req.user_id)?;
    if affiliates::find_by_user(&tx, &target.id)?.is_some() {
        return Err(ApiError::Conflict("user is already an affiliate".into()));
    }
    let code = match req.affiliate_code {
        Some(code) => {
            validate_code(&code)?;
            code
        }
        None => generate_code(&target.name),
    };
    let profile = affiliates::insert(&tx, &target.id, &code, rate, unix_now())?;
    if target.role == Role::Member {
        users::set_role(&tx, &target.id, Role::Affiliate)?;
    }
    tx.commit()?;

    info!(
        user_id = %target.id,
        affiliate_id = %profile.id,
        code = %profile.affiliate_code,
        "affiliate enrolled"
    );
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn record_sale(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(sale): ApiJson<Sale>,
) -> Result<(StatusCode, Json<SaleOutcome>), ApiError> {
    user.require_admin()?;
    let recipients = state.recipients(user.id());
    let split = state.split();
    let mut db = state.db.lock().await;
    let outcome = commission::record_sale(&mut db, &sale, &recipients, &split, unix_now())?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

// ============================================================================
// Commissions
// ============================================================================

/// Reporting window `[since, until)` for `7d`, `15d`, `30d`, `thisMonth`,
/// `lastMonth` or `all`. Calendar months are UTC.
fn period_range(period: Option<&str>, now: u64) -> Result<(Option<u64>, Option<u64>), ApiError> {
    const DAY: u64 = 24 * 3600;
    let days = match period.unwrap_or("all") {
        "all" => return Ok((None, None)),
        "7d" => 7,
        "15d" => 15,
        "30d" => 30,
        "thisMonth" => return Ok((Some(month_start(now, 0)?), None)),
        "lastMonth" => return Ok((Some(month_start(now, 1)?), Some(month_start(now, 0)?))),
        other => {
            return Err(ApiError::Validation(format!("unknown period: {other}")));
        }
    };
    Ok((Some(now.saturating_sub(days * DAY)), None))
}

/// Midnight UTC on the first of the month, `months_back` months before the
/// month containing `now`.
fn month_start(now: u64, months_back: u32) -> Result<u64, ApiError> {
    let out_of_range = || ApiError::Validation(format!("timestamp out of range: {now}"));
    let start = i64::try_from(now)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .and_then(|t| t.date_naive().with_day(1))
        .and_then(|d| d.checked_sub_months(Months::new(months_back)))
        .ok_or_else(out_of_range)?;
    u64::try_from(start.and_time(NaiveTime::MIN).and_utc().timestamp()).map_err(|_| out_of_range())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionQuery {
    #[serde(default)]
    pub status: PaidFilter,
    pub period: Option<String>,
    pub affiliate_id: Option<String>,
    /// Sale id, affiliate code, email or name.
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

async fn list_commissions(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<CommissionQuery>,
) -> Result<Json<ConversionPage>, ApiError> {
    user.require_admin()?;
    let (limit, offset) = paging(query.page, query.limit);
    let now = unix_now();
    let (since, until) = period_range(query.period.as_deref(), now)?;
    let filter = ConversionFilter {
        affiliate_id: query.affiliate_id,
        paid: query.status,
        since,
        until,
        search: query.search,
        limit,
        offset,
    };
    let db = state.db.lock().await;
    Ok(Json(commission::list_conversions(&db, &filter, now)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayCommissionsRequest {
    pub conversion_ids: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

async fn pay_commissions(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<PayCommissionsRequest>,
) -> Result<Json<MarkPaidReport>, ApiError> {
    user.require_admin()?;
    let mut db = state.db.lock().await;
    let report = commission::mark_paid(
        &mut db,
        &req.conversion_ids,
        user.id(),
        req.notes.as_deref(),
        unix_now(),
    )?;
    Ok(Json(report))
}

// ============================================================================
// Payouts
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PayoutQuery {
    pub status: Option<PayoutStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

async fn list_payouts(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<PayoutQuery>,
) -> Result<Json<Value>, ApiError> {
    user.require_admin()?;
    let (limit, offset) = paging(query.page, query.limit);
    let db = state.db.lock().await;
    let payouts = payout::list(&db, query.status, limit, offset)?;
    Ok(Json(serde_json::json!({ "payouts": payouts })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPayoutRequest {
    pub action: PayoutAction,
    #[serde(default)]
    pub rejected_reason: Option<String>,
}

async fn process_payout(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ProcessPayoutRequest>,
) -> Result<Json<Payout>, ApiError> {
    user.require_admin()?;
    let mut db = state.db.lock().await;
    let now = unix_now();
    let payout = match req.action {
        PayoutAction::Approve => payout::approve(&mut db, &id, user.id(), now)?,
        PayoutAction::Reject => payout::reject(
            &mut db,
            &id,
            user.id(),
            req.rejected_reason.as_deref().unwrap_or_default(),
            now,
        )?,
    };
    Ok(Json(payout))
}

// ============================================================================
// Pending revenue
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct RevenueQuery {
    pub status: Option<PendingRevenueStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

async fn list_revenue(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<RevenueQuery>,
) -> Result<Json<Value>, ApiError> {
    user.require_admin()?;
    let (limit, offset) = paging(query.page, query.limit);
    let db = state.db.lock().await;
    let rows = revenue::list(&db, query.status, limit, offset)?;
    Ok(Json(serde_json::json!({ "pendingRevenue": rows })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRevenueRequest {
    #[serde(default)]
    pub adjusted_amount: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
}

async fn approve_revenue(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ApproveRevenueRequest>,
) -> Result<Json<PendingRevenue>, ApiError> {
    user.require_admin()?;
    let mut db = state.db.lock().await;
    let row = revenue::approve(
        &mut db,
        &id,
        user.id(),
        req.adjusted_amount,
        req.note.as_deref(),
        unix_now(),
    )?;
    Ok(Json(row))
}

#[derive(Debug, Deserialize)]
pub struct RejectRevenueRequest {
    #[serde(default)]
    pub note: String,
}

async fn reject_revenue(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<RejectRevenueRequest>,
) -> Result<Json<PendingRevenue>, ApiError> {
    user.require_admin()?;
    let mut db = state.db.lock().await;
    let row = revenue::reject(&mut db, &id, user.id(), &req.note, unix_now())?;
    Ok(Json(row))
}

// ============================================================================
// Settings
// ============================================================================

async fn get_withdrawal_settings(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<WithdrawalSettings>, ApiError> {
    user.require_admin()?;
    let db = state.db.lock().await;
    Ok(Json(settings::withdrawal(&db)?))
}

async fn put_withdrawal_settings(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<WithdrawalSettings>,
) -> Result<Json<WithdrawalSettings>, ApiError> {
    user.require_admin()?;
    if req.withdrawal_min_amount <= 0 {
        return Err(ApiError::Validation("withdrawalMinAmount must be positive".into()));
    }
    if req.withdrawal_admin_fee < 0 || req.withdrawal_admin_fee >= req.withdrawal_min_amount {
        return Err(ApiError::Validation(
            "withdrawalAdminFee must be at least 0 and below withdrawalMinAmount".into(),
        ));
    }
    let db = state.db.lock().await;
    settings::set_withdrawal(&db, &req)?;
    info!(
        admin_id = %user.id(),
        min_amount = req.withdrawal_min_amount,
        admin_fee = req.withdrawal_admin_fee,
        "withdrawal settings updated"
    );
    Ok(Json(req))
}
