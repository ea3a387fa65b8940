//! HTTP routes.
//!
//! Each submodule contributes the routes of one area; [`router`] merges
//! them and adds request tracing.

pub mod admin;
pub mod affiliate;
pub mod auth;
pub mod wallet;

use axum::extract::{FromRequest, FromRequestParts};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::AppState;

/// Default page size.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Largest page size a client may ask for.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// JSON body extractor whose rejections use the API error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejections use the API error shape.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `(limit, offset)` for 1-based `page` and `limit` query values.
pub fn paging(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
    let page = page.unwrap_or(1).max(1);
    (limit, (page - 1).saturating_mul(limit))
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(auth::routes())
        .merge(affiliate::routes())
        .merge(wallet::routes())
        .merge(admin::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
