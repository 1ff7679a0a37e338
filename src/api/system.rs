//! Health check and the admin-to-owner broadcast.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{NotifyOwnerRequest, NotifyOwnerResponse, OwnerNotification, User};
use crate::AppState;

use super::auth::require_admin;
use super::error::ApiError;
use super::validation::{validate_required_text, validate_title};

pub async fn health() -> &'static str {
    "OK"
}

/// Record an owner broadcast and deliver it to the configured webhook.
pub async fn notify_owner(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(payload): Json<NotifyOwnerRequest>,
) -> Result<(StatusCode, Json<NotifyOwnerResponse>), ApiError> {
    require_admin(&user)?;

    validate_title(&payload.title).map_err(|e| ApiError::validation_field("title", &e))?;
    validate_required_text(&payload.content, "Content")
        .map_err(|e| ApiError::validation_field("content", &e))?;

    if !state.notifier.is_configured() {
        return Err(ApiError::service_unavailable(
            "Owner notifications are not configured",
        ));
    }

    let delivered = match state.notifier.send(&payload.title, &payload.content).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Owner notification delivery failed: {}", e);
            false
        }
    };

    sqlx::query(
        "INSERT INTO owner_notifications (id, sender_id, title, content, delivered, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&user.id)
    .bind(&payload.title)
    .bind(&payload.content)
    .bind(delivered as i64)
    .bind(Utc::now().timestamp_millis())
    .execute(&state.db)
    .await?;

    tracing::info!(sender_id = %user.id, delivered, "Owner notification recorded");

    Ok((StatusCode::CREATED, Json(NotifyOwnerResponse { delivered })))
}

/// Past owner broadcasts, newest first (admin)
pub async fn list_owner_notifications(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<OwnerNotification>>, ApiError> {
    require_admin(&user)?;

    let rows: Vec<OwnerNotification> =
        sqlx::query_as("SELECT * FROM owner_notifications ORDER BY created_at DESC")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(rows))
}
