//! Case study CRUD, favorites, and the personal favorites feed.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    CaseStudy, CaseStudyPayload, CaseStudyResponse, Favorite, FavoriteToggleResponse, User,
    UserRole,
};
use crate::tags::TagInput;
use crate::AppState;

use super::auth::MaybeUser;
use super::error::ApiError;
use super::validation::{
    validate_description, validate_required_text, validate_string_list, validate_title,
};

/// Only identities from this provider may author case studies.
const POSTING_LOGIN_METHOD: &str = "google";

fn validate_payload(payload: &CaseStudyPayload) -> Result<(), ApiError> {
    validate_title(&payload.title).map_err(|e| ApiError::validation_field("title", &e))?;
    validate_description(&payload.description)
        .map_err(|e| ApiError::validation_field("description", &e))?;
    validate_required_text(&payload.challenge, "Challenge")
        .map_err(|e| ApiError::validation_field("challenge", &e))?;
    validate_required_text(&payload.solution, "Solution")
        .map_err(|e| ApiError::validation_field("solution", &e))?;
    validate_string_list(&payload.tools, "tools")
        .map_err(|e| ApiError::validation_field("tools", &e))?;
    validate_string_list(&payload.steps, "steps")
        .map_err(|e| ApiError::validation_field("steps", &e))?;
    Ok(())
}

fn require_posting_login(user: &User) -> Result<(), ApiError> {
    if user.login_method.as_deref() != Some(POSTING_LOGIN_METHOD) {
        return Err(ApiError::forbidden("Google login required to post."));
    }
    Ok(())
}

async fn favorite_ids_for(
    state: &AppState,
    user: &Option<User>,
) -> Result<Vec<String>, ApiError> {
    let Some(user) = user else {
        return Ok(Vec::new());
    };
    let ids: Vec<(String,)> =
        sqlx::query_as("SELECT case_study_id FROM favorites WHERE user_id = ?")
            .bind(&user.id)
            .fetch_all(&state.db)
            .await?;
    Ok(ids.into_iter().map(|(id,)| id).collect())
}

/// List all case studies, newest first
pub async fn list_case_studies(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
) -> Result<Json<Vec<CaseStudyResponse>>, ApiError> {
    let rows: Vec<CaseStudy> =
        sqlx::query_as("SELECT * FROM case_studies ORDER BY created_at DESC")
            .fetch_all(&state.db)
            .await?;

    let favorites = favorite_ids_for(&state, &user).await?;
    let list = rows
        .into_iter()
        .map(|row| {
            let is_favorite = favorites.contains(&row.id);
            row.to_response(is_favorite)
        })
        .collect();

    Ok(Json(list))
}

/// Get a single case study
pub async fn get_case_study(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<CaseStudyResponse>, ApiError> {
    let row: Option<CaseStudy> = sqlx::query_as("SELECT * FROM case_studies WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?;

    let row = row.ok_or_else(|| ApiError::not_found("Case study not found"))?;

    let is_favorite = match &user {
        Some(user) => {
            let hit: Option<(String,)> = sqlx::query_as(
                "SELECT id FROM favorites WHERE user_id = ? AND case_study_id = ?",
            )
            .bind(&user.id)
            .bind(&row.id)
            .fetch_optional(&state.db)
            .await?;
            hit.is_some()
        }
        None => false,
    };

    Ok(Json(row.to_response(is_favorite)))
}

/// Create a case study
pub async fn create_case_study(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(payload): Json<CaseStudyPayload>,
) -> Result<(StatusCode, Json<CaseStudyResponse>), ApiError> {
    require_posting_login(&user)?;
    validate_payload(&payload)?;

    let tags = state
        .tags
        .generate(&TagInput {
            title: &payload.title,
            description: &payload.description,
            tools: &payload.tools,
            category: payload.category,
        })
        .await;

    let id = Uuid::new_v4().to_string();
    let now = Utc::now().timestamp_millis();

    sqlx::query(
        r#"
        INSERT INTO case_studies (
            id, user_id, title, description, category, tools, challenge,
            solution, steps, impact, thumbnail_url, thumbnail_key, tags,
            is_recommended, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&user.id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.category)
    .bind(serde_json::to_string(&payload.tools).unwrap_or_else(|_| "[]".to_string()))
    .bind(&payload.challenge)
    .bind(&payload.solution)
    .bind(serde_json::to_string(&payload.steps).unwrap_or_else(|_| "[]".to_string()))
    .bind(&payload.impact)
    .bind(&payload.thumbnail_url)
    .bind(&payload.thumbnail_key)
    .bind(serde_json::to_string(&tags).unwrap_or_else(|_| "[]".to_string()))
    .bind(now)
    .bind(now)
    .execute(&state.db)
    .await?;

    tracing::info!(case_study_id = %id, user_id = %user.id, "Case study created");

    let row: CaseStudy = sqlx::query_as("SELECT * FROM case_studies WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok((StatusCode::CREATED, Json(row.to_response(false))))
}

/// Update a case study (author only)
pub async fn update_case_study(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(payload): Json<CaseStudyPayload>,
) -> Result<Json<CaseStudyResponse>, ApiError> {
    require_posting_login(&user)?;
    validate_payload(&payload)?;

    let existing: Option<CaseStudy> = sqlx::query_as("SELECT * FROM case_studies WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?;
    let existing = existing.ok_or_else(|| ApiError::not_found("Case study not found"))?;

    if existing.user_id != user.id {
        return Err(ApiError::forbidden("Only the author can edit this case study"));
    }

    let tags = state
        .tags
        .generate(&TagInput {
            title: &payload.title,
            description: &payload.description,
            tools: &payload.tools,
            category: payload.category,
        })
        .await;

    let now = Utc::now().timestamp_millis();

    sqlx::query(
        r#"
        UPDATE case_studies SET
            title = ?, description = ?, category = ?, tools = ?, challenge = ?,
            solution = ?, steps = ?, impact = ?, thumbnail_url = ?,
            thumbnail_key = ?, tags = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.category)
    .bind(serde_json::to_string(&payload.tools).unwrap_or_else(|_| "[]".to_string()))
    .bind(&payload.challenge)
    .bind(&payload.solution)
    .bind(serde_json::to_string(&payload.steps).unwrap_or_else(|_| "[]".to_string()))
    .bind(&payload.impact)
    .bind(&payload.thumbnail_url)
    .bind(&payload.thumbnail_key)
    .bind(serde_json::to_string(&tags).unwrap_or_else(|_| "[]".to_string()))
    .bind(now)
    .bind(&id)
    .execute(&state.db)
    .await?;

    let row: CaseStudy = sqlx::query_as("SELECT * FROM case_studies WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    let is_favorite: Option<(String,)> =
        sqlx::query_as("SELECT id FROM favorites WHERE user_id = ? AND case_study_id = ?")
            .bind(&user.id)
            .bind(&id)
            .fetch_optional(&state.db)
            .await?;

    Ok(Json(row.to_response(is_favorite.is_some())))
}

/// Delete a case study (author or admin); favorites go in the same transaction.
pub async fn delete_case_study(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let existing: Option<CaseStudy> = sqlx::query_as("SELECT * FROM case_studies WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?;
    let existing = existing.ok_or_else(|| ApiError::not_found("Case study not found"))?;

    if existing.user_id != user.id && user.role != UserRole::Admin {
        return Err(ApiError::forbidden("Only the author or an admin can delete this case study"));
    }

    let mut tx = state.db.begin().await?;
    sqlx::query("DELETE FROM favorites WHERE case_study_id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM case_studies WHERE id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(case_study_id = %id, user_id = %user.id, "Case study deleted");

    Ok(Json(serde_json::json!({ "success": true })))
}

/// Toggle a favorite, returning the new state
pub async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<FavoriteToggleResponse>, ApiError> {
    let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM case_studies WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?;
    if exists.is_none() {
        return Err(ApiError::not_found("Case study not found"));
    }

    let current: Option<Favorite> =
        sqlx::query_as("SELECT * FROM favorites WHERE user_id = ? AND case_study_id = ?")
            .bind(&user.id)
            .bind(&id)
            .fetch_optional(&state.db)
            .await?;

    let is_favorite = match current {
        Some(favorite) => {
            sqlx::query("DELETE FROM favorites WHERE id = ?")
                .bind(&favorite.id)
                .execute(&state.db)
                .await?;
            false
        }
        None => {
            sqlx::query(
                "INSERT INTO favorites (id, user_id, case_study_id, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&user.id)
            .bind(&id)
            .bind(Utc::now().timestamp_millis())
            .execute(&state.db)
            .await?;
            true
        }
    };

    Ok(Json(FavoriteToggleResponse { is_favorite }))
}

/// The caller's favorited case studies, most recently favorited first
pub async fn list_favorites(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<CaseStudyResponse>>, ApiError> {
    let rows: Vec<CaseStudy> = sqlx::query_as(
        r#"
        SELECT cs.* FROM case_studies cs
        JOIN favorites f ON f.case_study_id = cs.id
        WHERE f.user_id = ?
        ORDER BY f.created_at DESC
        "#,
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;

    let list = rows.into_iter().map(|row| row.to_response(true)).collect();
    Ok(Json(list))
}
