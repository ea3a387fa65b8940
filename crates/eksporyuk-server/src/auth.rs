//! Password hashing and session authentication.
//!
//! Passwords are stretched with Argon2id (m=19 MiB, t=2, p=1) under a
//! random 16-byte salt. A session token is 32 random bytes handed to the
//! client as an `HttpOnly` cookie (or a bearer token); the database only
//! keeps its BLAKE3 hash.

use argon2::{Algorithm, Argon2, Params, Version};
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use eksporyuk_db::queries::sessions;
use eksporyuk_types::user::{Role, UserView};
use eksporyuk_types::unix_now;

use crate::config::AuthConfig;
use crate::error::ApiError;
use crate::state::AppState;

pub const ARGON2_M_COST: u32 = 19 * 1024;
pub const ARGON2_T_COST: u32 = 2;
pub const ARGON2_P_COST: u32 = 1;
pub const HASH_LEN: usize = 32;
pub const SALT_LEN: usize = 16;

/// Shortest accepted password.
pub const MIN_PASSWORD_LEN: usize = 8;

fn derive(password: &[u8], salt: &[u8]) -> Result<[u8; HASH_LEN], ApiError> {
    let params = Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, Some(HASH_LEN))
        .map_err(|e| ApiError::Internal(format!("argon2 params: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = [0u8; HASH_LEN];
    argon2
        .hash_password_into(password, salt, &mut output)
        .map_err(|e| ApiError::Internal(format!("argon2: {e}")))?;
    Ok(output)
}

/// Hash a password under a fresh salt. Returns `(hash_hex, salt_hex)`.
pub fn hash_password(password: &str) -> Result<(String, String), ApiError> {
    let salt: [u8; SALT_LEN] = rand::random();
    let hash = derive(password.as_bytes(), &salt)?;
    Ok((hex::encode(hash), hex::encode(salt)))
}

/// Check a password against a stored hash and salt.
pub fn verify_password(password: &str, hash_hex: &str, salt_hex: &str) -> Result<bool, ApiError> {
    let (Ok(stored), Ok(salt)) = (hex::decode(hash_hex), hex::decode(salt_hex)) else {
        return Ok(false);
    };
    let Ok(stored): Result<[u8; HASH_LEN], _> = stored.try_into() else {
        return Ok(false);
    };
    let candidate = derive(password.as_bytes(), &salt)?;
    // blake3::Hash equality is constant-time.
    Ok(blake3::Hash::from(candidate) == blake3::Hash::from(stored))
}

/// [`hash_password`] off the async runtime.
pub async fn hash_password_blocking(password: String) -> Result<(String, String), ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("hash task: {e}")))?
}

/// [`verify_password`] off the async runtime.
pub async fn verify_password_blocking(
    password: String,
    hash_hex: String,
    salt_hex: String,
) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash_hex, &salt_hex))
        .await
        .map_err(|e| ApiError::Internal(format!("verify task: {e}")))?
}

/// New random session token (hex).
pub fn new_session_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

/// What the database stores for a token.
pub fn token_hash(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}

/// `Set-Cookie` value carrying a session token.
pub fn session_cookie(config: &AuthConfig, token: &str, max_age_secs: u64) -> String {
    let secure = if config.secure_cookie { "; Secure" } else { "" };
    format!(
        "{}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}{secure}",
        config.cookie_name
    )
}

/// `Set-Cookie` value that clears the session cookie.
pub fn clear_cookie(config: &AuthConfig) -> String {
    session_cookie(config, "", 0)
}

/// Session token from the cookie, or from an `Authorization: Bearer` header.
pub fn session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
            .map(str::trim)
    })
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: UserView,
    /// Hash of the session token used for this request.
    pub token_hash: String,
}

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }

    /// Fail with `Forbidden` unless the caller has one of `roles`.
    pub fn require(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.user.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "role {} may not perform this action",
                self.user.role
            )))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        self.require(&[Role::Admin])
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers, &state.config.auth.cookie_name)
            .ok_or_else(ApiError::unauthorized)?;
        let token_hash = token_hash(token);

        let db = state.db.lock().await;
        let row = sessions::find_user(&db, &token_hash, unix_now())?
            .ok_or_else(|| ApiError::Unauthorized("session expired or invalid".into()))?;

        Ok(CurrentUser {
            user: row.view(),
            token_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_password_round_trip() {
        let (hash, salt) = hash_password("correct horse").expect("hash");
        assert_eq!(hash.len(), HASH_LEN * 2);
        assert_eq!(salt.len(), SALT_LEN * 2);
        assert!(verify_password("correct horse", &hash, &salt).expect("verify"));
        assert!(!verify_password("wrong horse", &hash, &salt).expect("verify"));
    }

    #[test]
    fn test_same_password_different_salt() {
        let (a, _) = hash_password("secret-pass").expect("hash");
        let (b, _) = hash_password("secret-pass").expect("hash");
        assert_ne!(a, b);
    }

    #[test]
    fn test_corrupt_stored_hash() {
        assert!(!verify_password("x", "zz", "00").expect("verify"));
        assert!(!verify_password("x", "abcd", "00").expect("verify"));
    }

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; eksporyuk_session=abc123; other=1"),
        );
        assert_eq!(session_token(&headers, "eksporyuk_session"), Some("abc123"));
        assert_eq!(session_token(&headers, "missing"), None);
    }

    #[test]
    fn test_token_from_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(session_token(&headers, "eksporyuk_session"), Some("tok"));
    }

    #[test]
    fn test_cookie_attributes() {
        let mut config = AuthConfig::default();
        let cookie = session_cookie(&config, "t", 60);
        assert!(cookie.starts_with("eksporyuk_session=t;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(!cookie.contains("Secure"));

        config.secure_cookie = true;
        assert!(clear_cookie(&config).contains("Max-Age=0; Secure"));
    }

    #[test]
    fn test_token_hash_is_stable() {
        let token = new_session_token();
        assert_eq!(token.len(), 64);
        assert_eq!(token_hash(&token), token_hash(&token));
        assert_ne!(token_hash(&token), token);
    }
}
