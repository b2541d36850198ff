//! Identity resolution middleware and cookie handling.
//!
//! Two opaque cookies drive identity: `sid` names a session through its
//! hash, `cart_id` names the active cart directly. Neither ever fails a
//! request by itself; a missing or stale cookie just means "anonymous" or
//! "no cart yet".

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use bazaar_core::{CART_COOKIE, CART_COOKIE_TTL_DAYS, SESSION_COOKIE, session};
use bazaar_store::models::UserRow;
use time::OffsetDateTime;
use tower_cookies::cookie::SameSite;
use tower_cookies::cookie::time::Duration as CookieDuration;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Authenticated request extension.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    /// The resolved user row.
    pub user: UserRow,
}

/// Identity middleware: resolves the session cookie to an optional user.
///
/// A session found past its expiry is deleted here as a side effect and the
/// request proceeds unauthenticated. Invalid or missing tokens never raise.
pub async fn identity_middleware(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        let token_hash = session::hash_token(cookie.value());
        if let Some(sess) = state.store.get_session_by_hash(&token_hash).await? {
            if sess.expires_at <= OffsetDateTime::now_utc() {
                tracing::debug!(user_id = %sess.user_id, "expired session purged on use");
                state.store.delete_session(sess.id).await?;
            } else if let Some(user) = state.store.get_user(sess.user_id).await? {
                req.extensions_mut().insert(CurrentUser { user });
            }
        }
    }

    Ok(next.run(req).await)
}

/// Require an authenticated user, for endpoints where guest access is not
/// allowed.
pub fn require_user(user: Option<&CurrentUser>) -> ApiResult<&CurrentUser> {
    user.ok_or_else(|| ApiError::Unauthorized("not authenticated".to_string()))
}

/// Read the cart identity token from the request cookies.
///
/// A cookie that does not parse as a cart id is treated as absent, never as
/// an error; resolution will issue a fresh cart and overwrite it.
pub fn cart_token(cookies: &Cookies) -> Option<Uuid> {
    cookies
        .get(CART_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

fn base_cookie(name: &'static str, value: String, max_age: CookieDuration, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookie.set_max_age(max_age);
    if secure {
        cookie.set_secure(true);
    }
    cookie
}

/// Issue (or refresh) the session cookie.
pub fn issue_session_cookie(cookies: &Cookies, token: &str, ttl_days: i64, secure: bool) {
    cookies.add(base_cookie(
        SESSION_COOKIE,
        token.to_string(),
        CookieDuration::days(ttl_days),
        secure,
    ));
}

/// Clear the session cookie.
pub fn clear_session_cookie(cookies: &Cookies) {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookie.set_max_age(CookieDuration::seconds(0));
    cookies.remove(cookie);
}

/// Issue (or refresh) the cart identity cookie.
///
/// Reissued whenever resolution created a cart, and opportunistically on
/// cart reads so the client self-heals after an ownership claim.
pub fn issue_cart_cookie(cookies: &Cookies, cart_id: Uuid, secure: bool) {
    cookies.add(base_cookie(
        CART_COOKIE,
        cart_id.to_string(),
        CookieDuration::days(CART_COOKIE_TTL_DAYS),
        secure,
    ));
}
