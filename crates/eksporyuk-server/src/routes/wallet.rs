//! Wallet overview for any signed-in user.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use eksporyuk_ledger::wallet;
use eksporyuk_types::wallet::WalletSummary;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/wallet", get(summary))
}

async fn summary(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<WalletSummary>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(wallet::summary(&db, user.id())?))
}
