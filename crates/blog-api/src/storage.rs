use anyhow::Result;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Public URL prefix the media directory is served under.
pub const MEDIA_URL_PREFIX: &str = "/static/media";

/// Manages the on-disk media directory.
///
/// Each upload is stored as a single flat file at `{dir}/{stored_name}`.
pub struct MediaStore {
    dir: PathBuf,
}

impl MediaStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Media directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, stored_name: &str) -> PathBuf {
        self.dir.join(stored_name)
    }

    pub fn url_for(&self, stored_name: &str) -> String {
        format!("{}/{}", MEDIA_URL_PREFIX, stored_name)
    }

    /// `<unix seconds>_<16 hex of SHA-256(data)>_<sanitized basename>`.
    pub fn stored_name(original: &str, data: &[u8], now: DateTime<Utc>) -> String {
        let digest = hex::encode(Sha256::digest(data));
        format!("{}_{}_{}", now.timestamp(), &digest[..16], sanitize_basename(original))
    }

    /// Write the whole upload. A partially written file is removed on failure.
    pub async fn write_file(&self, stored_name: &str, data: &[u8]) -> Result<()> {
        let path = self.file_path(stored_name);

        let result = async {
            let mut file = fs::File::create(&path).await?;
            file.write_all(data).await?;
            file.flush().await?;
            Ok::<_, std::io::Error>(())
        }
        .await;

        if let Err(e) = result {
            warn!("Failed to write {}: {}", path.display(), e);
            self.delete_file(stored_name).await.ok();
            return Err(e.into());
        }
        Ok(())
    }

    pub async fn delete_file(&self, stored_name: &str) -> Result<()> {
        let path = self.file_path(stored_name);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted media file {}", stored_name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Last path component of a client-supplied name, restricted to characters
/// that are safe in both a file name and a URL.
fn sanitize_basename(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() { "upload".to_string() } else { cleaned.to_string() }
}
