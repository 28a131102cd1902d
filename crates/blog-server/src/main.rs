mod config;

use std::net::SocketAddr;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use blog_api::routes::router;
use blog_api::state::AppStateInner;
use blog_api::storage::MediaStore;
use blog_api::token::TokenService;
use blog_db::Database;
use blog_types::models::Role;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blog=debug,blog_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.uses_default_secret() {
        warn!("BLOG_SECRET_KEY is not set; session tokens are signed with a public placeholder");
    }

    let db = Database::open(&config.db_path)?;
    info!("Database: {}", config.db_path.display());

    if let Some(username) = &config.bootstrap_admin {
        if db.set_role_by_username(username, Role::Admin)? {
            info!("Promoted {} to ADMIN", username);
        } else {
            warn!("BLOG_BOOTSTRAP_ADMIN names unknown user {}", username);
        }
    }

    let media = MediaStore::new(config.media_dir.clone()).await?;
    let tokens = TokenService::new(&config.secret_key, config.token_ttl);
    let state = AppStateInner::new(db, tokens, media);

    let app = router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Blog server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
