//! User, session, and login-identity models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User role. Stored as lowercase TEXT; the upsert path never downgrades it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub last_signed_in: i64,
    pub role: UserRole,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub last_signed_in: i64,
    pub role: UserRole,
    pub created_at: i64,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            open_id: user.open_id,
            name: user.name,
            email: user.email,
            login_method: user.login_method,
            last_signed_in: user.last_signed_in,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: i64,
    pub created_at: i64,
}

/// Tri-state patch for a nullable text field: distinguishes "caller said
/// nothing" from an explicit clear. `Keep` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldPatch<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T: Clone> FieldPatch<T> {
    /// The value this patch writes, or `None` when the field is untouched.
    pub fn to_write(&self) -> Option<Option<T>> {
        match self {
            FieldPatch::Keep => None,
            FieldPatch::Clear => Some(None),
            FieldPatch::Set(v) => Some(Some(v.clone())),
        }
    }
}

impl<T> FieldPatch<T> {
    /// `Some` becomes `Set`, `None` becomes an explicit `Clear`.
    pub fn set_or_clear(value: Option<T>) -> Self {
        match value {
            Some(v) => FieldPatch::Set(v),
            None => FieldPatch::Clear,
        }
    }
}

/// External identity as reported by the OAuth provider, reconciled against
/// the users table by `db::users::upsert_user`.
#[derive(Debug, Clone, Default)]
pub struct UpsertIdentity {
    pub open_id: String,
    pub name: FieldPatch<String>,
    pub email: FieldPatch<String>,
    pub login_method: FieldPatch<String>,
    pub last_signed_in: Option<i64>,
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct ReassignOwnerRequest {
    pub to_user_id: String,
}
