//! Affiliate self-service: credits, conversions and payouts.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use eksporyuk_db::queries::affiliates;
use eksporyuk_db::queries::conversions::ConversionFilter;
use eksporyuk_ledger::commission::{self, ConversionPage};
use eksporyuk_ledger::credit::{self, AccountSummary};
use eksporyuk_ledger::payout;
use eksporyuk_types::affiliate::{AffiliateProfile, PaidFilter};
use eksporyuk_types::credit::CREDIT_PACKAGES;
use eksporyuk_types::payout::{Payout, PayoutStatus};
use eksporyuk_types::unix_now;
use eksporyuk_types::user::Role;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;

use super::{paging, ApiJson, ApiQuery};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/affiliate/credits", get(credit_summary).post(buy_credits))
        .route("/affiliate/credits/packages", get(packages))
        .route("/affiliate/conversions", get(conversions))
        .route("/affiliate/payouts", get(list_payouts).post(request_payout))
}

const AFFILIATE_ROLES: &[Role] = &[Role::Affiliate, Role::Admin];

/// The caller's affiliate profile.
fn own_profile(conn: &Connection, user: &CurrentUser) -> Result<AffiliateProfile, ApiError> {
    user.require(AFFILIATE_ROLES)?;
    affiliates::find_by_user(conn, user.id())?
        .ok_or_else(|| ApiError::Forbidden("affiliate profile required".into()))
}

async fn credit_summary(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<AccountSummary>, ApiError> {
    let db = state.db.lock().await;
    let profile = own_profile(&db, &user)?;
    Ok(Json(credit::account_summary(&db, &profile.id)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyCreditsRequest {
    pub package_name: String,
}

/// Post a package top-up for the caller.
///
/// Nothing is charged here: the top-up is booked as completed straight
/// away. The route answers 403 unless `[affiliate] self_service_top_up`
/// is set, which should only happen behind a payment step.
async fn buy_credits(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<BuyCreditsRequest>,
) -> Result<Json<Value>, ApiError> {
    if !state.config.affiliate.self_service_top_up {
        return Err(ApiError::Forbidden("self-service top-up is disabled".into()));
    }
    let mut db = state.db.lock().await;
    let profile = own_profile(&db, &user)?;
    let (package, posting) =
        credit::buy_package(&mut db, &profile.id, &req.package_name, unix_now())?;
    Ok(Json(serde_json::json!({
        "success": true,
        "package": package,
        "credit": posting.account,
        "transaction": posting.transaction,
    })))
}

async fn packages(user: CurrentUser) -> Result<Json<Value>, ApiError> {
    user.require(AFFILIATE_ROLES)?;
    Ok(Json(serde_json::json!({ "packages": CREDIT_PACKAGES })))
}

#[derive(Debug, Default, Deserialize)]
pub struct ConversionQuery {
    #[serde(default)]
    pub status: PaidFilter,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

async fn conversions(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<ConversionQuery>,
) -> Result<Json<ConversionPage>, ApiError> {
    let (limit, offset) = paging(query.page, query.limit);
    let db = state.db.lock().await;
    let profile = own_profile(&db, &user)?;
    let filter = ConversionFilter {
        affiliate_id: Some(profile.id),
        paid: query.status,
        limit,
        offset,
        ..Default::default()
    };
    Ok(Json(commission::list_conversions(&db, &filter, unix_now())?))
}

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
    user.require(AFFILIATE_ROLES)?;
    let (limit, offset) = paging(query.page, query.limit);
    let db = state.db.lock().await;
    let payouts = payout::list_for_user(&db, user.id(), query.status, limit, offset)?;
    Ok(Json(serde_json::json!({ "payouts": payouts })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRequest {
    pub amount: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

async fn request_payout(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<PayoutRequest>,
) -> Result<(StatusCode, Json<Payout>), ApiError> {
    user.require(AFFILIATE_ROLES)?;
    let mut db = state.db.lock().await;
    let payout = payout::request(&mut db, user.id(), req.amount, req.notes.as_deref(), unix_now())?;
    Ok((StatusCode::CREATED, Json(payout)))
}
