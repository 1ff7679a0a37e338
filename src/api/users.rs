//! Admin user management.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::db::{
    users::{
        count_user_case_studies, delete_user, get_user_by_id, list_users,
        reassign_case_studies, update_user_role,
    },
    ReassignOwnerRequest, UpdateRoleRequest, User, UserResponse,
};
use crate::AppState;

use super::auth::require_admin;
use super::error::ApiError;
use super::validation::validate_uuid;

/// List all users, newest first (admin)
pub async fn list_all_users(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    require_admin(&user)?;

    let users = list_users(&state.db).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Change a user's role (admin)
pub async fn change_user_role(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    require_admin(&user)?;
    validate_uuid(&id, "user_id").map_err(|e| ApiError::validation_field("user_id", &e))?;

    if !update_user_role(&state.db, &id, payload.role).await? {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(user_id = %id, role = %payload.role, admin_id = %user.id, "User role changed");

    let updated = get_user_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserResponse::from(updated)))
}

/// Move all of a user's case studies to another user (admin)
pub async fn reassign_user_case_studies(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(payload): Json<ReassignOwnerRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&user)?;
    validate_uuid(&id, "user_id").map_err(|e| ApiError::validation_field("user_id", &e))?;
    validate_uuid(&payload.to_user_id, "to_user_id")
        .map_err(|e| ApiError::validation_field("to_user_id", &e))?;

    if id == payload.to_user_id {
        return Err(ApiError::bad_request("Cannot reassign case studies to the same user"));
    }

    if get_user_by_id(&state.db, &id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    if get_user_by_id(&state.db, &payload.to_user_id).await?.is_none() {
        return Err(ApiError::not_found("Target user not found"));
    }

    let moved = reassign_case_studies(&state.db, &id, &payload.to_user_id).await?;

    tracing::info!(
        from = %id,
        to = %payload.to_user_id,
        moved,
        admin_id = %user.id,
        "Case studies reassigned"
    );

    Ok(Json(serde_json::json!({ "success": true, "reassigned": moved })))
}

/// Delete a user (admin). Refused while the user still owns case studies.
pub async fn remove_user(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&user)?;
    validate_uuid(&id, "user_id").map_err(|e| ApiError::validation_field("user_id", &e))?;

    if id == user.id {
        return Err(ApiError::bad_request("Cannot delete your own account"));
    }

    if count_user_case_studies(&state.db, &id).await? > 0 {
        return Err(ApiError::conflict(
            "User still owns case studies; reassign them first",
        ));
    }

    if !delete_user(&state.db, &id).await? {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(user_id = %id, admin_id = %user.id, "User deleted");

    Ok(Json(serde_json::json!({ "success": true })))
}
