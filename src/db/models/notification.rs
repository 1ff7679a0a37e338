//! Owner notification models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OwnerNotification {
    pub id: String,
    pub sender_id: String,
    pub title: String,
    pub content: String,
    pub delivered: i64,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct NotifyOwnerRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct NotifyOwnerResponse {
    pub delivered: bool,
}
