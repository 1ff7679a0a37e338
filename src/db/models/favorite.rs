//! Favorite models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Favorite {
    pub id: String,
    pub user_id: String,
    pub case_study_id: String,
    pub created_at: i64,
}

/// Response for the favorite toggle endpoint.
#[derive(Debug, Serialize)]
pub struct FavoriteToggleResponse {
    pub is_favorite: bool,
}
