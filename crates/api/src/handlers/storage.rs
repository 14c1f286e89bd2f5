//! Product image upload and deletion (`/storage`, admin only).

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use vitashop_core::uploads::{
    content_type_from_filename, extension_for, image_dimensions, object_key, sanitize_folder,
    validate_object_key, validate_upload,
};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub key: String,
    pub url: String,
    pub content_type: String,
    pub size_bytes: usize,
    pub width: u32,
    pub height: u32,
}

struct UploadedFile {
    content_type: String,
    bytes: Vec<u8>,
}

/// Declared content type, or a guess from the file name when the client
/// sent none or a generic one.
fn resolve_content_type(declared: Option<&str>, filename: Option<&str>) -> Option<String> {
    match declared {
        Some(ct) if ct != "application/octet-stream" && !ct.is_empty() => {
            Some(ct.to_ascii_lowercase())
        }
        _ => filename
            .and_then(content_type_from_filename)
            .map(str::to_string),
    }
}

/// POST /api/storage/upload
///
/// Multipart fields: `file` (required) and `folder` (optional).
pub async fn upload(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let mut file: Option<UploadedFile> = None;
    let mut folder: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        match field.name() {
            Some("file") => {
                let content_type =
                    resolve_content_type(field.content_type(), field.file_name())
                        .ok_or_else(|| {
                            AppError::BadRequest("Cannot determine file content type".into())
                        })?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                file = Some(UploadedFile {
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("folder") => {
                folder = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?,
                );
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::BadRequest("Missing 'file' field".into()))?;
    let size_bytes = file.bytes.len();
    validate_upload(&file.content_type, size_bytes, state.config.storage.max_upload_bytes)?;
    let (width, height) = image_dimensions(&file.bytes, &file.content_type)?;

    let folder = sanitize_folder(folder.as_deref())?;
    let ext = extension_for(&file.content_type)
        .ok_or_else(|| AppError::BadRequest("Unsupported content type".into()))?;
    let key = object_key(&folder, ext);

    state
        .object_store
        .put(&key, file.bytes, &file.content_type)
        .await?;
    tracing::info!(key = %key, size_bytes, user_id = admin.user_id, "Image uploaded");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url: state.object_store.public_url(&key),
            key,
            content_type: file.content_type,
            size_bytes,
            width,
            height,
        }),
    ))
}

/// DELETE /api/storage/{*key}
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<StatusCode> {
    validate_object_key(&key)?;
    state.object_store.delete(&key).await?;
    tracing::info!(key = %key, user_id = admin.user_id, "Image deleted");
    Ok(StatusCode::NO_CONTENT)
}
