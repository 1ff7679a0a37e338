//! Image uploads for case-study thumbnails.
//!
//! Payloads arrive base64-encoded and land on local disk under the data
//! directory; tower-http serves them back at `/uploads/...`.

use axum::{extract::State, http::StatusCode, Json};
use base64::Engine;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::User;
use crate::AppState;

use super::error::ApiError;
use super::validation::validate_filename;

/// 5 MiB decoded payload cap.
const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub filename: String,
    pub content_type: String,
    pub base64_data: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub key: String,
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}

/// Store a base64-encoded image and return its public URL and key.
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(payload): Json<UploadRequest>,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    validate_filename(&payload.filename)
        .map_err(|e| ApiError::validation_field("filename", &e))?;

    if !payload.content_type.starts_with("image/") {
        return Err(ApiError::validation_field(
            "content_type",
            "Only image uploads are supported",
        ));
    }

    let data = base64::engine::general_purpose::STANDARD
        .decode(payload.base64_data.trim())
        .map_err(|_| ApiError::validation_field("base64_data", "Invalid base64 payload"))?;

    if data.is_empty() {
        return Err(ApiError::validation_field("base64_data", "Empty upload"));
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::validation_field(
            "base64_data",
            "Upload is too large (max 5 MiB)",
        ));
    }

    let key = format!(
        "case-studies/{}/{}-{}",
        user.id,
        payload.filename,
        random_suffix()
    );

    let path = state.config.server.uploads_dir().join(&key);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            tracing::error!("Failed to create upload directory: {}", e);
            ApiError::internal("Failed to store upload")
        })?;
    }
    tokio::fs::write(&path, &data).await.map_err(|e| {
        tracing::error!("Failed to write upload: {}", e);
        ApiError::internal("Failed to store upload")
    })?;

    tracing::info!(user_id = %user.id, key = %key, bytes = data.len(), "Image uploaded");

    let url = format!(
        "{}/uploads/{}",
        state.config.server.public_url.trim_end_matches('/'),
        key
    );

    Ok((StatusCode::CREATED, Json(UploadResponse { url, key })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_suffix_shape() {
        let a = random_suffix();
        let b = random_suffix();
        assert_eq!(a.len(), 12);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
