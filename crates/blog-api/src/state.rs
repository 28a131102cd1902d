use std::sync::Arc;

use tracing::error;

use blog_db::Database;

use crate::error::ApiError;
use crate::storage::MediaStore;
use crate::token::TokenService;

pub type AppState = Arc<AppStateInner>;

/// Everything a request handler needs, built once at startup.
pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
    pub media: MediaStore,
}

impl AppStateInner {
    pub fn new(db: Database, tokens: TokenService, media: MediaStore) -> AppState {
        Arc::new(Self { db, tokens, media })
    }
}

/// Run blocking database (and password hashing) work off the async runtime.
pub async fn db_task<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("background task failed: {}", e))
        })?
}
