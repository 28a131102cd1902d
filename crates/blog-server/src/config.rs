use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Duration;

/// Used when `BLOG_SECRET_KEY` is unset. Startup warns loudly about it.
pub const DEFAULT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub media_dir: PathBuf,
    pub secret_key: String,
    pub token_ttl: Duration,
    /// Existing username promoted to ADMIN at startup.
    pub bootstrap_admin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match var("BLOG_PORT") {
            Some(raw) => raw.parse().with_context(|| format!("BLOG_PORT is not a port: {}", raw))?,
            None => 8000,
        };

        let ttl_minutes: i64 = match var("BLOG_TOKEN_TTL_MINUTES") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("BLOG_TOKEN_TTL_MINUTES is not a number: {}", raw))?,
            None => 30,
        };
        if ttl_minutes <= 0 {
            anyhow::bail!("BLOG_TOKEN_TTL_MINUTES must be positive, got {}", ttl_minutes);
        }

        Ok(Self {
            host: var("BLOG_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("BLOG_DB_PATH").unwrap_or_else(|| "blog.db".into()).into(),
            media_dir: var("BLOG_MEDIA_DIR").unwrap_or_else(|| "./static/media".into()).into(),
            secret_key: var("BLOG_SECRET_KEY").unwrap_or_else(|| DEFAULT_SECRET.into()),
            token_ttl: Duration::minutes(ttl_minutes),
            bootstrap_admin: var("BLOG_BOOTSTRAP_ADMIN"),
        })
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET
    }
}
