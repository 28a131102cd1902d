use axum::{
    Form, Json,
    extract::State,
    http::{HeaderName, header},
    response::{AppendHeaders, IntoResponse, Redirect},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Duration;
use tracing::info;

use blog_db::Database;
use blog_db::models::UserRow;
use blog_db::queries;
use blog_types::api::{CredentialsForm, MessageResponse, TokenResponse};

use crate::error::ApiError;
use crate::middleware::ACCESS_TOKEN_COOKIE;
use crate::password::{hash_password, verify_password};
use crate::state::{AppState, db_task};
use crate::views::user_response;

/// Where a fresh signup lands.
const AFTER_SIGNUP_PATH: &str = "/cards";

fn session_cookie(token: &str, lifetime: Duration) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, format!("Bearer {}", token)))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(lifetime.num_seconds()))
        .build()
}

/// Set-Cookie header from the cookie's plain form. The value goes out as
/// `Bearer <token>`, not percent-encoded.
fn set_cookie(cookie: Cookie<'_>) -> AppendHeaders<[(HeaderName, String); 1]> {
    AppendHeaders([(header::SET_COOKIE, cookie.to_string())])
}

fn cleared_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((ACCESS_TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    cookie
}

/// Insert a VIEWER account. `hash` only runs once the username and email are
/// known to be free.
fn register<H>(db: &Database, username: &str, email: &str, hash: H) -> Result<(), ApiError>
where
    H: FnOnce() -> anyhow::Result<String>,
{
    db.transaction(|tx| {
        if queries::user_by_username(tx, username)?.is_some() {
            return Err(ApiError::UsernameTaken);
        }
        if queries::email_exists(tx, email)? {
            return Err(ApiError::EmailTaken);
        }
        let hashed = hash()?;
        queries::insert_user(tx, username, email, &hashed, &queries::now_timestamp())?;
        Ok(())
    })
}

/// POST /auth/signup: creates a VIEWER account, sets the session cookie and
/// redirects to the card list. An existing username redirects to the login
/// page without touching storage.
pub async fn signup(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> Result<impl IntoResponse, ApiError> {
    if form.username.trim().is_empty() || form.password.is_empty() {
        return Err(ApiError::BadRequest("username and password are required".into()));
    }

    let username = form.username.clone();
    let email = form
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(&form.username)
        .to_string();
    let password = form.password;

    db_task(&state, move |db| register(db, &username, &email, || hash_password(&password))).await?;

    let token = state.tokens.issue_session(&form.username)?;
    info!("User {} signed up", form.username);

    Ok((
        set_cookie(session_cookie(&token, state.tokens.lifetime())),
        Redirect::to(AFTER_SIGNUP_PATH),
    ))
}

/// Uniform failure for unknown usernames and wrong passwords.
async fn authenticate(state: &AppState, form: CredentialsForm) -> Result<UserRow, ApiError> {
    db_task(state, move |db| {
        let user = db
            .get_user_by_username(&form.username)?
            .ok_or(ApiError::InvalidCredentials)?;

        if !verify_password(&user.hashed_password, &form.password) {
            return Err(ApiError::InvalidCredentials);
        }
        Ok(user)
    })
    .await
}

/// POST /auth/login: verifies credentials and sets the session cookie.
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> Result<impl IntoResponse, ApiError> {
    let user = authenticate(&state, form).await?;
    let token = state.tokens.issue_session(&user.username)?;
    info!("User {} logged in", user.username);

    Ok((
        set_cookie(session_cookie(&token, state.tokens.lifetime())),
        Json(user_response(user)),
    ))
}

/// POST /auth/token: the same check for non-browser clients; returns the raw
/// token and leaves cookies alone.
pub async fn token(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = authenticate(&state, form).await?;
    let token = state.tokens.issue_session(&user.username)?;
    Ok(Json(TokenResponse::bearer(token)))
}

/// GET /auth/logout: always succeeds, with or without a session.
pub async fn logout() -> impl IntoResponse {
    (set_cookie(cleared_cookie()), Json(MessageResponse::new("Logged out")))
}
