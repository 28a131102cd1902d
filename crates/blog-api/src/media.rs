use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State, multipart::MultipartError},
    http::StatusCode,
};
use tracing::{error, info, warn};

use blog_db::queries;
use blog_types::api::{AttachQuery, MediaFileResponse, MessageResponse};

use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::policy::{Action, Resource, authorize};
use crate::state::{AppState, db_task};
use crate::storage::MediaStore;

/// 10 MiB upload limit per file
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Request body ceiling for the protected routes: one full file plus room for
/// multipart framing, so the per-file check is the one that fires.
pub const MAX_REQUEST_BODY: usize = MAX_FILE_SIZE + 1024 * 1024;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogg"];

/// Lower-cased extension without the dot, if it is on the allow-list.
pub fn allowed_extension(filename: &str) -> Result<String, ApiError> {
    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let allowed = [IMAGE_EXTENSIONS, AUDIO_EXTENSIONS, VIDEO_EXTENSIONS]
        .iter()
        .any(|group| group.contains(&ext.as_str()));

    if allowed {
        Ok(ext)
    } else {
        Err(ApiError::UnsupportedType(if ext.is_empty() {
            filename.to_string()
        } else {
            format!(".{}", ext)
        }))
    }
}

/// Append one streamed chunk, refusing as soon as the total passes the limit.
pub fn append_chunk(buf: &mut Vec<u8>, chunk: &[u8]) -> Result<(), ApiError> {
    if buf.len() + chunk.len() > MAX_FILE_SIZE {
        return Err(ApiError::PayloadTooLarge {
            limit_mib: MAX_FILE_SIZE / (1024 * 1024),
        });
    }
    buf.extend_from_slice(chunk);
    Ok(())
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge {
            limit_mib: MAX_FILE_SIZE / (1024 * 1024),
        }
    } else {
        ApiError::BadRequest(e.body_text())
    }
}

/// POST /media/upload: multipart form with a `file` field. Type and size are
/// checked before anything touches the media directory.
pub async fn upload_media(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Json<MediaFileResponse>, ApiError> {
    authorize(&user, Action::Create, Resource::Media).require()?;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::BadRequest("missing filename".into()))?;
        let file_type = allowed_extension(&filename)?;

        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            append_chunk(&mut data, &chunk).inspect_err(|_| {
                warn!("Upload {} from {} rejected: over size limit", filename, user.username);
            })?;
        }

        let stored_name = MediaStore::stored_name(&filename, &data, chrono::Utc::now());
        state
            .media
            .write_file(&stored_name, &data)
            .await
            .map_err(|e| ApiError::StorageWriteFailure(e.to_string()))?;

        let url = state.media.url_for(&stored_name);
        let uploader_id = user.id;
        let (name, ftype, path) = (filename.clone(), file_type.clone(), url.clone());
        let inserted = db_task(&state, move |db| {
            Ok(db.with_conn(|conn| {
                queries::insert_media_file(conn, &name, &path, &ftype, uploader_id, &queries::now_timestamp())
            })?)
        })
        .await;

        let media_id = match inserted {
            Ok(id) => id,
            Err(e) => {
                error!("Media row insert failed, removing {}: {}", stored_name, e);
                state.media.delete_file(&stored_name).await.ok();
                return Err(e);
            }
        };

        info!(
            "Media {} uploaded by {}: {} ({} bytes)",
            media_id,
            user.username,
            stored_name,
            data.len()
        );

        return Ok(Json(MediaFileResponse {
            id: media_id,
            url,
            filename,
            file_type,
        }));
    }

    Err(ApiError::BadRequest("missing file field".into()))
}

/// GET /media/files: URLs of every recorded upload, newest first.
pub async fn list_media(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<String>>, ApiError> {
    authorize(&user, Action::Read, Resource::Media).require()?;

    let rows = db_task(&state, |db| Ok(db.list_media_files()?)).await?;
    Ok(Json(rows.into_iter().map(|r| r.file_path).collect()))
}

/// POST /media/attach/{card_id}?media_id=N. Attaching twice adds a second link.
pub async fn attach_media(
    State(state): State<AppState>,
    Path(card_id): Path<i64>,
    Query(query): Query<AttachQuery>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<MessageResponse>, ApiError> {
    let caller = user.clone();
    let media_id = query.media_id;

    db_task(&state, move |db| {
        db.transaction(|tx| {
            let card = queries::card_by_id(tx, card_id)?;
            let media = queries::media_file_by_id(tx, media_id)?;
            let (Some(card), Some(_)) = (card, media) else {
                return Err(ApiError::NotFound("Card or media file"));
            };

            authorize(&caller, Action::AttachMedia, Resource::Card { author_id: card.author_id })
                .require()?;
            queries::attach_media(tx, card_id, media_id)?;
            Ok(())
        })
    })
    .await?;

    info!("Media {} attached to card {} by {}", media_id, card_id, user.username);
    Ok(Json(MessageResponse::new("Media file attached successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_allow_list() {
        assert_eq!(allowed_extension("photo.JPG").unwrap(), "jpg");
        assert_eq!(allowed_extension("clip.webm").unwrap(), "webm");
        assert_eq!(allowed_extension("song.Mp3").unwrap(), "mp3");
        assert_eq!(allowed_extension("voice.ogg").unwrap(), "ogg");

        assert!(matches!(allowed_extension("setup.exe"), Err(ApiError::UnsupportedType(_))));
        assert!(matches!(allowed_extension("archive.tar.gz"), Err(ApiError::UnsupportedType(_))));
        assert!(matches!(allowed_extension("README"), Err(ApiError::UnsupportedType(_))));
        assert!(matches!(allowed_extension("png"), Err(ApiError::UnsupportedType(_))));
    }

    #[test]
    fn size_limit_is_inclusive() {
        let mut buf = Vec::new();
        append_chunk(&mut buf, &vec![0u8; MAX_FILE_SIZE - 1]).unwrap();
        append_chunk(&mut buf, &[0u8]).unwrap();
        assert_eq!(buf.len(), MAX_FILE_SIZE);

        let err = append_chunk(&mut buf, &[0u8]).unwrap_err();
        assert!(matches!(err, ApiError::PayloadTooLarge { limit_mib: 10 }));
        assert_eq!(buf.len(), MAX_FILE_SIZE);
    }
}
