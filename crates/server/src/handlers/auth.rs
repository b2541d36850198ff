//! Authentication endpoints (passwordless).
//!
//! Registration and login both issue a fresh session and fold any guest cart
//! the client was holding into the user's cart, so items picked before
//! signing in survive the transition.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use bazaar_core::{SESSION_COOKIE, email, session};
use bazaar_store::models::{SessionRow, UserRow};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::auth::{self, CurrentUser, require_user};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Request payload for registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Request payload for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

/// User identity as returned by auth endpoints.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

impl From<&UserRow> for UserResponse {
    fn from(user: &UserRow) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// Create a session row for the user and hand back the raw token.
/// Only the hash hits the datastore.
async fn start_session(
    state: &AppState,
    user_id: Uuid,
    now: OffsetDateTime,
) -> ApiResult<String> {
    let token = session::generate_token();
    let row = SessionRow {
        id: Uuid::new_v4(),
        user_id,
        token_hash: session::hash_token(&token),
        expires_at: now + state.config.session.ttl(),
        created_at: now,
    };
    state.store.create_session(&row).await?;
    Ok(token)
}

/// Fold the guest cart named by the cart cookie into the user's cart.
async fn merge_guest_cart_if_any(
    state: &AppState,
    cookies: &Cookies,
    user_id: Uuid,
    now: OffsetDateTime,
) -> ApiResult<()> {
    if let Some(guest_cart_id) = auth::cart_token(cookies) {
        state
            .store
            .merge_guest_cart(guest_cart_id, user_id, now)
            .await?;
    }
    Ok(())
}

/// POST /auth/register - create an account and sign it in.
pub async fn register(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = email::normalize(&payload.email)?;
    let name = payload
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let now = OffsetDateTime::now_utc();
    let user = UserRow {
        id: Uuid::new_v4(),
        email,
        name,
        created_at: now,
        updated_at: now,
    };
    state.store.create_user(&user).await?;
    tracing::info!(user_id = %user.id, "user registered");

    merge_guest_cart_if_any(&state, &cookies, user.id, now).await?;

    let token = start_session(&state, user.id, now).await?;
    auth::issue_session_cookie(
        &cookies,
        &token,
        state.config.session.ttl_days,
        state.config.server.cookie_secure,
    );

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// POST /auth/login - locate the account and sign it in.
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<UserResponse>> {
    let email = email::normalize(&payload.email)?;

    let user = state
        .store
        .get_user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("no account for this email".to_string()))?;

    let now = OffsetDateTime::now_utc();
    merge_guest_cart_if_any(&state, &cookies, user.id, now).await?;

    let token = start_session(&state, user.id, now).await?;
    auth::issue_session_cookie(
        &cookies,
        &token,
        state.config.session.ttl_days,
        state.config.server.cookie_secure,
    );
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(UserResponse::from(&user)))
}

/// POST /auth/logout - delete the session if one is present. Always 200.
pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
) -> ApiResult<Json<serde_json::Value>> {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        let token_hash = session::hash_token(cookie.value());
        if let Some(sess) = state.store.get_session_by_hash(&token_hash).await? {
            state.store.delete_session(sess.id).await?;
            tracing::debug!(user_id = %sess.user_id, "session deleted at logout");
        }
    }
    auth::clear_session_cookie(&cookies);

    Ok(Json(serde_json::json!({ "ok": true })))
}

/// GET /auth/me - identity of the authenticated caller.
pub async fn me(user: Option<Extension<CurrentUser>>) -> ApiResult<Json<UserResponse>> {
    let current = require_user(user.as_deref())?;
    Ok(Json(UserResponse::from(&current.user)))
}
