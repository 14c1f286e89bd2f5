//! Upload validation and object key naming.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};

use crate::error::CoreError;

/// Default upload size limit (5 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Folder used when the client does not provide one.
pub const DEFAULT_FOLDER: &str = "uploads";

/// Accepted content types and their canonical file extensions.
const ALLOWED_TYPES: &[(&str, &str, ImageFormat)] = &[
    ("image/jpeg", "jpg", ImageFormat::Jpeg),
    ("image/png", "png", ImageFormat::Png),
    ("image/webp", "webp", ImageFormat::WebP),
];

/// Canonical extension for an accepted content type.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    ALLOWED_TYPES
        .iter()
        .find(|(ct, _, _)| *ct == content_type)
        .map(|(_, ext, _)| *ext)
}

/// Guess a content type from a file name's extension.
pub fn content_type_from_filename(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit('.').next()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Check content type and size before the bytes are inspected.
pub fn validate_upload(content_type: &str, size: usize, max_bytes: usize) -> Result<(), CoreError> {
    if extension_for(content_type).is_none() {
        let allowed: Vec<&str> = ALLOWED_TYPES.iter().map(|(ct, _, _)| *ct).collect();
        return Err(CoreError::Validation(format!(
            "Unsupported content type '{content_type}'. Allowed: {}",
            allowed.join(", ")
        )));
    }
    if size == 0 {
        return Err(CoreError::Validation("Uploaded file is empty".into()));
    }
    if size > max_bytes {
        return Err(CoreError::Validation(format!(
            "File is {size} bytes; the limit is {max_bytes} bytes"
        )));
    }
    Ok(())
}

/// Normalize a client-provided folder name.
///
/// Only lowercase ascii letters, digits, `-`, `_` and `/` separators are
/// kept; empty segments and `.`/`..` are rejected.
pub fn sanitize_folder(folder: Option<&str>) -> Result<String, CoreError> {
    let Some(raw) = folder.map(str::trim).filter(|f| !f.is_empty()) else {
        return Ok(DEFAULT_FOLDER.to_string());
    };

    let lowered = raw.trim_matches('/').to_ascii_lowercase();
    let valid_segment = |seg: &str| {
        !seg.is_empty()
            && seg != "."
            && seg != ".."
            && seg
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    };

    if lowered.is_empty() || !lowered.split('/').all(valid_segment) {
        return Err(CoreError::Validation(format!("Invalid folder '{raw}'")));
    }
    Ok(lowered)
}

/// Build a unique object key inside `folder`.
pub fn object_key(folder: &str, ext: &str) -> String {
    format!("{folder}/{}.{ext}", uuid::Uuid::new_v4())
}

/// Validate that an object key came from [`object_key`]-style naming.
pub fn validate_object_key(key: &str) -> Result<(), CoreError> {
    let Some((folder, file)) = key.rsplit_once('/') else {
        return Err(CoreError::Validation(format!("Invalid object key '{key}'")));
    };
    sanitize_folder(Some(folder))?;
    let valid_file = !file.is_empty()
        && !file.starts_with('.')
        && file
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    if !valid_file {
        return Err(CoreError::Validation(format!("Invalid object key '{key}'")));
    }
    Ok(())
}

/// Read image dimensions from the header, checking the declared format.
pub fn image_dimensions(bytes: &[u8], content_type: &str) -> Result<(u32, u32), CoreError> {
    let expected = ALLOWED_TYPES
        .iter()
        .find(|(ct, _, _)| *ct == content_type)
        .map(|(_, _, fmt)| *fmt)
        .ok_or_else(|| {
            CoreError::Validation(format!("Unsupported content type '{content_type}'"))
        })?;

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CoreError::Validation(format!("Unreadable image: {e}")))?;

    match reader.format() {
        Some(fmt) if fmt == expected => {}
        _ => {
            return Err(CoreError::Validation(format!(
                "File content does not match content type '{content_type}'"
            )))
        }
    }

    reader
        .into_dimensions()
        .map_err(|e| CoreError::Validation(format!("Unreadable image: {e}")))
}
