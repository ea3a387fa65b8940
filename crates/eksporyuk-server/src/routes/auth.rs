//! Registration, login and sessions.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use eksporyuk_db::queries::{sessions, users};
use eksporyuk_db::DbError;
use eksporyuk_types::unix_now;
use eksporyuk_types::user::{Role, UserView};
use serde::Deserialize;
use tracing::{info, warn};

use super::ApiJson;
use crate::auth::{self, CurrentUser, MIN_PASSWORD_LEN};
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

fn normalize_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(ApiError::Validation("a valid email is required".into())),
    }
}

async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    let email = normalize_email(&req.email)?;
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name is required".into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let (hash, salt) = auth::hash_password_blocking(req.password).await?;

    let db = state.db.lock().await;
    let user = users::insert(
        &db,
        &users::NewUser {
            email: &email,
            name,
            role: Role::Member,
            password_hash: &hash,
            password_salt: &salt,
        },
        unix_now(),
    )
    .map_err(|e| match e {
        DbError::Constraint(_) => ApiError::Conflict("email already registered".into()),
        other => other.into(),
    })?;

    info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user.view())))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invalid = || ApiError::Unauthorized("invalid email or password".into());

    let user = {
        let db = state.db.lock().await;
        users::find_by_email(&db, &req.email.trim().to_lowercase())?
    };
    let Some(user) = user else {
        warn!("login for unknown email");
        return Err(invalid());
    };

    let ok = auth::verify_password_blocking(
        req.password,
        user.password_hash.clone(),
        user.password_salt.clone(),
    )
    .await?;
    if !ok {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(invalid());
    }

    let token = auth::new_session_token();
    let now = unix_now();
    let ttl = state.config.session_ttl_secs();
    {
        let db = state.db.lock().await;
        sessions::purge_expired(&db, now)?;
        sessions::insert(&db, &auth::token_hash(&token), &user.id, now, now + ttl)?;
    }

    info!(user_id = %user.id, "login");
    let cookie = auth::session_cookie(&state.config.auth, &token, ttl);
    Ok((
        [(SET_COOKIE, cookie)],
        Json(serde_json::json!({
            "user": user.view(),
            "expiresAt": now + ttl,
        })),
    ))
}

async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    {
        let db = state.db.lock().await;
        sessions::delete(&db, &user.token_hash)?;
    }
    info!(user_id = %user.id(), "logout");
    Ok((
        [(SET_COOKIE, auth::clear_cookie(&state.config.auth))],
        Json(serde_json::json!({ "success": true })),
    ))
}

async fn me(user: CurrentUser) -> Json<UserView> {
    Json(user.user)
}
