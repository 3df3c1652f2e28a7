//! # Audio Upload Handler
//!
//! ## Endpoint: `POST /upload-audio` (also `POST /api/v1/upload-audio`)
//!
//! Pipeline for one request: receive → forward → persist → respond.
//! 1. Stream the `audio` multipart field into a temporary file
//! 2. Forward the file to the media host
//! 3. Record the returned URL in the `audios` table
//! 4. Remove the temporary file (on every path, see `SpooledUpload`)
//!
//! ## Response:
//! ```json
//! {
//!   "success": true,
//!   "url": "https://res.cloudinary.com/demo/video/upload/v1/1700000000000-audio.webm",
//!   "id": "6f1c...",
//!   "uploaded_at": "2025-01-01T12:00:00Z"
//! }
//! ```

use crate::config::AppConfig;
use crate::db::{self, AudioRecord};
use crate::error::{AppError, AppResult};
use crate::media::HostedAsset;
use crate::state::{AppState, UploadTracker};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::stream::StreamExt;
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

const FALLBACK_FILE_NAME: &str = "audio.webm";
const MAX_FILE_NAME_LEN: usize = 100;

/// A multipart file spooled to disk.
///
/// Dropping it removes the file, so the temporary copy disappears whether the
/// request succeeds, fails, or is cancelled by a client disconnect.
#[derive(Debug)]
struct SpooledUpload {
    path: PathBuf,
    /// Sanitized client file name, passed on to the media host
    file_name: String,
    size: u64,
}

impl Drop for SpooledUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed temporary upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove temporary upload"),
        }
    }
}

/// Reduce a client supplied file name to something safe to put on disk.
///
/// Directory components are dropped, anything outside `[A-Za-z0-9._-]`
/// becomes `_`, leading dots are stripped and the result is capped at
/// 100 characters. Falls back to `audio.webm`.
pub fn sanitize_file_name(raw: Option<&str>) -> String {
    let base = raw
        .unwrap_or_default()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    let truncated: String = trimmed.chars().take(MAX_FILE_NAME_LEN).collect();

    if truncated.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        truncated
    }
}

/// `<unix-millis>-<short random>-<name>`; the random part keeps two
/// same-millisecond uploads of `audio.webm` apart.
fn spool_path(dir: &Path, file_name: &str) -> PathBuf {
    let millis = chrono::Utc::now().timestamp_millis();
    let token = uuid::Uuid::new_v4().simple().to_string();
    dir.join(format!("{}-{}-{}", millis, &token[..8], file_name))
}

/// Read the multipart stream, spooling the configured field to disk.
///
/// Other fields are drained and ignored. Only the first matching field is
/// kept. The size limit is enforced while streaming, so an oversized upload
/// is rejected without being written out in full.
async fn receive_upload(
    payload: &mut Multipart,
    config: &AppConfig,
    slot: &mut Option<SpooledUpload>,
) -> AppResult<()> {
    let upload_dir = config.uploads.dir_path();
    let max_size = config.uploads.max_file_size_bytes;

    while let Some(item) = payload.next().await {
        let mut field = item?;

        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| AppError::BadRequest("Missing content disposition".to_string()))?;

        let is_audio_field = content_disposition.get_name() == Some(config.uploads.field_name.as_str());

        if !is_audio_field || slot.is_some() {
            while let Some(chunk) = field.next().await {
                chunk?;
            }
            continue;
        }

        let file_name = sanitize_file_name(content_disposition.get_filename());
        let path = spool_path(&upload_dir, &file_name);
        let mut file = tokio::fs::File::create(&path).await?;

        let upload = slot.insert(SpooledUpload {
            path,
            file_name,
            size: 0,
        });

        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            upload.size += chunk.len() as u64;

            if upload.size > max_size {
                return Err(AppError::PayloadTooLarge(format!(
                    "File too large (max: {} bytes)",
                    max_size
                )));
            }

            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        debug!(path = %upload.path.display(), size_bytes = upload.size, "Spooled upload to disk");
    }

    Ok(())
}

/// Forward a spooled file and record the resulting URL.
async fn forward_and_persist(
    state: &AppState,
    upload: &SpooledUpload,
) -> AppResult<(HostedAsset, AudioRecord)> {
    let asset = state.media.upload(&upload.path, &upload.file_name).await?;
    let record = db::audios::insert(&state.db, &asset.secure_url).await?;
    Ok((asset, record))
}

async fn process_upload(
    state: &AppState,
    payload: &mut Multipart,
    slot: &mut Option<SpooledUpload>,
    tracker: &mut UploadTracker,
) -> AppResult<AudioRecord> {
    let config = state.get_config();
    tokio::fs::create_dir_all(config.uploads.dir_path()).await?;

    let received = receive_upload(payload, &config, slot).await;
    tracker.add_bytes(slot.as_ref().map_or(0, |u| u.size));
    received?;

    let upload = slot.as_ref().ok_or_else(|| {
        AppError::BadRequest(format!(
            "No audio file provided in field '{}'",
            config.uploads.field_name
        ))
    })?;

    if upload.size == 0 {
        return Err(AppError::ValidationError("Uploaded audio file is empty".to_string()));
    }

    info!(
        file_name = %upload.file_name,
        size_bytes = upload.size,
        host = state.media.name(),
        "Forwarding audio to media host"
    );

    let (asset, record) = forward_and_persist(state, upload).await?;

    info!(
        id = %record.id,
        public_id = %asset.public_id,
        url = %record.audio_url,
        "Audio reference stored"
    );

    Ok(record)
}

pub async fn upload_audio(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    // Declared before `slot` so the temporary file is gone before the
    // counters settle, including when this future is dropped
    let mut tracker = state.track_upload();
    let mut slot = None;

    let record = process_upload(&state, &mut payload, &mut slot, &mut tracker)
        .await
        .map_err(|e| {
            warn!(error = %e, "Upload failed");
            e
        })?;
    tracker.mark_succeeded();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "url": record.audio_url,
        "id": record.id,
        "uploaded_at": record.uploaded_at.to_rfc3339()
    })))
}
