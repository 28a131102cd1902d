//! Identity resolution for protected routes.
//!
//! A bearer token is looked for in the `Authorization` header first and in
//! the `access_token` cookie second. The header always wins when it carries
//! a bearer token, even if that token later fails validation.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use blog_db::models::UserRow;
use blog_types::models::Role;

use crate::error::ApiError;
use crate::state::{AppState, db_task};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

const BEARER_PREFIX: &str = "Bearer ";

/// The authenticated caller, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl From<UserRow> for CurrentUser {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            role: row.role,
        }
    }
}

/// Header token if present, otherwise the cookie token with its `Bearer `
/// prefix stripped. Values without the prefix count as absent.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = from_header {
        return Some(token.to_string());
    }

    let jar = CookieJar::from_headers(headers);
    jar.get(ACCESS_TOKEN_COOKIE)
        .and_then(|c| c.value_trimmed().strip_prefix(BEARER_PREFIX).map(str::to_string))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Resolve the caller or refuse the request before any handler runs.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or(ApiError::NoCredential)?;

    let username = state.tokens.validate(&token).map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        ApiError::from(e)
    })?;

    let user = db_task(&state, move |db| Ok(db.get_user_by_username(&username)?))
        .await?
        // A valid token for a user that no longer exists is still an auth failure.
        .ok_or(ApiError::InvalidToken)?;

    req.extensions_mut().insert(CurrentUser::from(user));
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(auth: Option<&str>, cookie: Option<&str>) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(a) = auth {
            h.insert(header::AUTHORIZATION, HeaderValue::from_str(a).unwrap());
        }
        if let Some(c) = cookie {
            h.insert(header::COOKIE, HeaderValue::from_str(c).unwrap());
        }
        h
    }

    #[test]
    fn header_wins_over_cookie() {
        let h = headers(Some("Bearer from-header"), Some("access_token=Bearer from-cookie"));
        assert_eq!(bearer_token(&h).as_deref(), Some("from-header"));
    }

    #[test]
    fn cookie_used_when_header_absent() {
        let h = headers(None, Some("theme=dark; access_token=Bearer from-cookie"));
        assert_eq!(bearer_token(&h).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn non_bearer_header_falls_back_to_cookie() {
        let h = headers(Some("Basic dXNlcjpwdw=="), Some("access_token=Bearer from-cookie"));
        assert_eq!(bearer_token(&h).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn cookie_without_prefix_is_ignored() {
        assert_eq!(bearer_token(&headers(None, Some("access_token=raw-token"))), None);
        assert_eq!(bearer_token(&headers(None, None)), None);
        assert_eq!(bearer_token(&headers(Some("Bearer "), None)), None);
    }
}
