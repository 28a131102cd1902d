use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tower_http::services::ServeDir;

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::storage::MEDIA_URL_PREFIX;
use crate::{auth, cards, media, users};

/// Full HTTP surface. Cross-cutting layers (CORS, tracing) are added by the
/// binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/token", post(auth::token))
        .route("/auth/logout", get(auth::logout))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/cards", get(cards::list_cards).post(cards::create_card))
        .route(
            "/cards/{card_id}",
            get(cards::get_card)
                .put(cards::update_card)
                .post(cards::update_card)
                .delete(cards::delete_card),
        )
        .route("/media/upload", post(media::upload_media))
        .route("/media/files", get(media::list_media))
        .route("/media/attach/{card_id}", post(media::attach_media))
        .route("/users", get(users::list_users))
        .route("/users/{user_id}/role", put(users::change_role))
        .layer(DefaultBodyLimit::max(media::MAX_REQUEST_BODY))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service(MEDIA_URL_PREFIX, ServeDir::new(state.media.dir()))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
