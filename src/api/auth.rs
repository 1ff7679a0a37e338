//! Authentication: OAuth login, session cookies, and request extractors.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query, State},
    http::request::Parts,
    response::Redirect,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::db::{
    users::{get_user_by_open_id, upsert_user},
    FieldPatch, Session, UpsertIdentity, User, UserResponse, UserRole,
};
use crate::AppState;

use super::error::ApiError;

/// Generate a random session token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// URL-encode a string for use in query parameters
fn url_encode(s: &str) -> String {
    let mut encoded = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            _ => {
                encoded.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    encoded
}

/// Create a session row and return the bearer token (only the hash is stored).
async fn create_session(state: &AppState, user_id: &str) -> Result<String, ApiError> {
    let token = generate_token();
    let token_hash = hash_token(&token);

    let now = Utc::now();
    let expires_at = (now + chrono::Duration::days(state.config.auth.session_ttl_days))
        .timestamp_millis();

    sqlx::query(
        "INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(&token_hash)
    .bind(expires_at)
    .bind(now.timestamp_millis())
    .execute(&state.db)
    .await?;

    Ok(token)
}

fn session_cookie<'a>(state: &AppState, token: String) -> Cookie<'a> {
    let mut cookie = Cookie::new(state.config.auth.cookie_name.clone(), token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(state.config.server.public_url.starts_with("https://"));
    cookie
}

/// Extract the session token from cookie or Authorization header
fn extract_token(state: &AppState, parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(&state.config.auth.cookie_name) {
        return Some(cookie.value().to_string());
    }

    parts
        .headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Get the current user from a session token
pub async fn get_current_user(state: &AppState, token: &str) -> Result<User, ApiError> {
    let token_hash = hash_token(token);
    let now = Utc::now().timestamp_millis();

    let session: Option<Session> =
        sqlx::query_as("SELECT * FROM sessions WHERE token_hash = ? AND expires_at > ?")
            .bind(&token_hash)
            .bind(now)
            .fetch_optional(&state.db)
            .await?;

    let session = session.ok_or_else(|| ApiError::unauthorized("Session expired or invalid"))?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&session.user_id)
        .fetch_optional(&state.db)
        .await?;

    user.ok_or_else(|| ApiError::unauthorized("Session expired or invalid"))
}

/// Extractor for the current authenticated user
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(state, parts)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
        get_current_user(state, &token).await
    }
}

/// Extractor for routes that work both logged-in and anonymous
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = match extract_token(state, parts) {
            Some(token) => get_current_user(state, &token).await.ok(),
            None => None,
        };
        Ok(MaybeUser(user))
    }
}

/// Guard for admin-only handlers
pub fn require_admin(user: &User) -> Result<(), ApiError> {
    if user.role != UserRole::Admin {
        return Err(ApiError::forbidden("Admin access required"));
    }
    Ok(())
}

/// Redirect the browser to the OAuth provider's consent screen
pub async fn oauth_login(State(state): State<Arc<AppState>>) -> Result<Redirect, ApiError> {
    let oauth = &state.config.oauth;
    if oauth.client_id.is_empty() {
        return Err(ApiError::service_unavailable("OAuth is not configured"));
    }

    let auth_url = format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
        oauth.auth_url,
        url_encode(&oauth.client_id),
        url_encode(&state.config.oauth_redirect_uri()),
        url_encode(&oauth.scopes),
        generate_token(),
    );

    Ok(Redirect::to(&auth_url))
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ProviderUserInfo {
    /// Stable subject identifier; Google calls it `sub`.
    #[serde(alias = "openId", alias = "open_id")]
    sub: Option<String>,
    name: Option<String>,
    email: Option<String>,
}

/// OAuth callback: exchange the code, reconcile the identity, open a session.
pub async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<OAuthCallbackParams>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let (code, _oauth_state) = match (params.code, params.state) {
        (Some(code), Some(oauth_state)) => (code, oauth_state),
        _ => return Err(ApiError::bad_request("code and state are required")),
    };

    let oauth = &state.config.oauth;
    let client = reqwest::Client::new();

    let token: TokenResponse = client
        .post(&oauth.token_url)
        .form(&[
            ("client_id", oauth.client_id.as_str()),
            ("client_secret", oauth.client_secret.as_str()),
            ("code", code.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", &state.config.oauth_redirect_uri()),
        ])
        .send()
        .await
        .map_err(|e| {
            tracing::error!("OAuth token exchange failed: {}", e);
            ApiError::external("OAuth token exchange failed")
        })?
        .json()
        .await
        .map_err(|e| {
            tracing::error!("Invalid OAuth token response: {}", e);
            ApiError::external("OAuth token exchange failed")
        })?;

    let user_info: ProviderUserInfo = client
        .get(&oauth.userinfo_url)
        .bearer_auth(&token.access_token)
        .send()
        .await
        .map_err(|e| {
            tracing::error!("Userinfo request failed: {}", e);
            ApiError::external("Failed to fetch user info")
        })?
        .json()
        .await
        .map_err(|e| {
            tracing::error!("Invalid userinfo response: {}", e);
            ApiError::external("Failed to fetch user info")
        })?;

    let open_id = user_info
        .sub
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("openId missing from user info"))?;

    // The provider response is authoritative here: an omitted or empty
    // profile field clears the stored one, matching a fresh consent screen.
    let identity = UpsertIdentity {
        open_id: open_id.clone(),
        name: FieldPatch::set_or_clear(user_info.name.filter(|s| !s.is_empty())),
        email: FieldPatch::set_or_clear(user_info.email.filter(|s| !s.is_empty())),
        login_method: FieldPatch::Set(oauth.provider.clone()),
        last_signed_in: Some(Utc::now().timestamp_millis()),
        role: None,
    };

    upsert_user(
        &state.db,
        state.config.auth.owner_open_id.as_deref(),
        &identity,
    )
    .await?;

    let user = get_user_by_open_id(&state.db, &open_id)
        .await?
        .ok_or_else(|| ApiError::internal("User row missing after upsert"))?;

    tracing::info!(user_id = %user.id, "User signed in via {}", oauth.provider);

    let session_token = create_session(&state, &user.id).await?;
    let jar = jar.add(session_cookie(&state, session_token));

    Ok((jar, Redirect::to("/")))
}

/// Current user, or null when anonymous
pub async fn me(MaybeUser(user): MaybeUser) -> Json<Option<UserResponse>> {
    Json(user.map(UserResponse::from))
}

/// Delete the session and clear the cookie
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<serde_json::Value>), ApiError> {
    if let Some(cookie) = jar.get(&state.config.auth.cookie_name) {
        let token_hash = hash_token(cookie.value());
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(&token_hash)
            .execute(&state.db)
            .await?;
    }

    let jar = jar.remove(Cookie::from(state.config.auth.cookie_name.clone()));
    Ok((jar, Json(serde_json::json!({ "success": true }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_hash_is_stable_and_hex() {
        let hash = hash_token("abc");
        assert_eq!(hash, hash_token("abc"));
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(hash, hash_token("abd"));
    }

    #[test]
    fn test_generate_token_is_random() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn test_url_encode() {
        assert_eq!(url_encode("abc-123_~.ok"), "abc-123_~.ok");
        assert_eq!(url_encode("a b"), "a%20b");
        assert_eq!(url_encode("openid email"), "openid%20email");
    }
}
