//! User store: login-identity reconciliation and the admin user helpers.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use super::{DbPool, UpsertIdentity, User, UserRole};

#[derive(Debug, Error)]
pub enum UpsertError {
    /// Caller bug: the external identity had no usable key.
    #[error("open_id is required for user upsert")]
    MissingOpenId,
    /// Storage failure, propagated unmodified. The statement is atomic, so
    /// a caller-level retry of the whole upsert is always safe.
    #[error("user store error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Reconcile an external identity against the users table.
///
/// A single `INSERT ... ON CONFLICT(open_id) DO UPDATE` statement creates the
/// row on first login and merges it on every later one. Only fields the
/// caller actually supplied (a `FieldPatch` other than `Keep`) are written;
/// everything else keeps its stored value, so a provider that omits a field
/// on re-login cannot blank previously captured profile data.
///
/// `last_signed_in` is refreshed on every successful call, whether the row
/// is inserted or updated. Role handling: an explicit role is used verbatim;
/// otherwise the configured owner identity is promoted to admin; otherwise
/// the column is left untouched (stored role preserved on conflict, column
/// default `user` on insert).
///
/// If the pool is already closed the call degrades to a logged no-op so a
/// login during shutdown does not fail the whole request.
pub async fn upsert_user(
    pool: &DbPool,
    owner_open_id: Option<&str>,
    identity: &UpsertIdentity,
) -> Result<(), UpsertError> {
    if identity.open_id.trim().is_empty() {
        return Err(UpsertError::MissingOpenId);
    }

    if pool.is_closed() {
        warn!(
            open_id = %identity.open_id,
            "User store unavailable, skipping upsert"
        );
        return Ok(());
    }

    let now = Utc::now().timestamp_millis();

    let name = identity.name.to_write();
    let email = identity.email.to_write();
    let login_method = identity.login_method.to_write();
    let role = identity.role.or_else(|| {
        (owner_open_id == Some(identity.open_id.as_str())).then_some(UserRole::Admin)
    });

    let name_set = name.is_some();
    let email_set = email.is_some();
    let login_method_set = login_method.is_some();
    let role_set = role.is_some();

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO users (id, open_id, created_at, last_signed_in");
    if name_set {
        qb.push(", name");
    }
    if email_set {
        qb.push(", email");
    }
    if login_method_set {
        qb.push(", login_method");
    }
    if role_set {
        qb.push(", role");
    }
    qb.push(") VALUES (");
    {
        let mut values = qb.separated(", ");
        values.push_bind(Uuid::new_v4().to_string());
        values.push_bind(identity.open_id.clone());
        values.push_bind(now);
        values.push_bind(identity.last_signed_in.unwrap_or(now));
        if let Some(v) = name {
            values.push_bind(v);
        }
        if let Some(v) = email {
            values.push_bind(v);
        }
        if let Some(v) = login_method {
            values.push_bind(v);
        }
        if let Some(r) = role {
            values.push_bind(r);
        }
    }
    qb.push(") ON CONFLICT(open_id) DO UPDATE SET last_signed_in = excluded.last_signed_in");
    if name_set {
        qb.push(", name = excluded.name");
    }
    if email_set {
        qb.push(", email = excluded.email");
    }
    if login_method_set {
        qb.push(", login_method = excluded.login_method");
    }
    if role_set {
        qb.push(", role = excluded.role");
    }

    qb.build().execute(pool).await?;
    Ok(())
}

pub async fn get_user_by_open_id(pool: &DbPool, open_id: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as("SELECT * FROM users WHERE open_id = ?")
        .bind(open_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_user_by_id(pool: &DbPool, id: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_users(pool: &DbPool) -> sqlx::Result<Vec<User>> {
    sqlx::query_as("SELECT * FROM users ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

/// Administrative role change. Returns false when no such user exists.
pub async fn update_user_role(pool: &DbPool, id: &str, role: UserRole) -> sqlx::Result<bool> {
    let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Move every case study owned by one user to another, bumping updated_at.
pub async fn reassign_case_studies(
    pool: &DbPool,
    from_user_id: &str,
    to_user_id: &str,
) -> sqlx::Result<u64> {
    let now = Utc::now().timestamp_millis();
    let result = sqlx::query("UPDATE case_studies SET user_id = ?, updated_at = ? WHERE user_id = ?")
        .bind(to_user_id)
        .bind(now)
        .bind(from_user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn count_user_case_studies(pool: &DbPool, user_id: &str) -> sqlx::Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM case_studies WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}

/// Delete a user row. Sessions and favorites cascade; case studies must be
/// reassigned first (the foreign key would reject the delete otherwise).
pub async fn delete_user(pool: &DbPool, id: &str) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::FieldPatch;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DB_SEQ: AtomicUsize = AtomicUsize::new(0);

    /// Named shared-cache memory database so every pool connection sees the
    /// same data.
    async fn test_pool() -> DbPool {
        let n = DB_SEQ.fetch_add(1, Ordering::SeqCst);
        let url = format!("sqlite:file:users_test_{}?mode=memory&cache=shared", n);
        crate::db::init_with_url(&url).await.unwrap()
    }

    fn identity(open_id: &str) -> UpsertIdentity {
        UpsertIdentity {
            open_id: open_id.to_string(),
            ..Default::default()
        }
    }

    async fn user_count(pool: &DbPool) -> i64 {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
            .unwrap();
        count.0
    }

    #[tokio::test]
    async fn upsert_twice_keeps_one_row_and_advances_last_signed_in() {
        let pool = test_pool().await;

        let mut id = identity("abc");
        id.last_signed_in = Some(1_000);
        upsert_user(&pool, None, &id).await.unwrap();

        id.last_signed_in = Some(2_000);
        upsert_user(&pool, None, &id).await.unwrap();

        assert_eq!(user_count(&pool).await, 1);
        let user = get_user_by_open_id(&pool, "abc").await.unwrap().unwrap();
        assert_eq!(user.last_signed_in, 2_000);
        assert!(user.name.is_none());
        assert!(user.email.is_none());
    }

    #[tokio::test]
    async fn last_signed_in_advances_even_when_only_profile_fields_change() {
        let pool = test_pool().await;

        let mut id = identity("abc");
        id.last_signed_in = Some(1_000);
        upsert_user(&pool, None, &id).await.unwrap();

        // Re-login that only carries a profile field: the last-seen marker
        // must still move forward.
        let relog = UpsertIdentity {
            open_id: "abc".to_string(),
            name: FieldPatch::Set("Alice".to_string()),
            ..Default::default()
        };
        upsert_user(&pool, None, &relog).await.unwrap();

        let user = get_user_by_open_id(&pool, "abc").await.unwrap().unwrap();
        assert_eq!(user.name.as_deref(), Some("Alice"));
        assert!(user.last_signed_in > 1_000);
    }

    #[tokio::test]
    async fn first_login_defaults_role_to_user() {
        let pool = test_pool().await;

        let mut id = identity("abc");
        id.name = FieldPatch::Set("Alice".to_string());
        upsert_user(&pool, None, &id).await.unwrap();

        let user = get_user_by_open_id(&pool, "abc").await.unwrap().unwrap();
        assert_eq!(user.role, UserRole::User);
        assert_eq!(user.name.as_deref(), Some("Alice"));
        assert!(user.created_at > 0);
        assert!(user.last_signed_in > 0);
    }

    #[tokio::test]
    async fn explicit_null_clears_but_absence_preserves() {
        let pool = test_pool().await;

        let mut id = identity("abc");
        id.email = FieldPatch::Set("a@example.com".to_string());
        upsert_user(&pool, None, &id).await.unwrap();

        // Omitting the field leaves the stored value intact.
        upsert_user(&pool, None, &identity("abc")).await.unwrap();
        let user = get_user_by_open_id(&pool, "abc").await.unwrap().unwrap();
        assert_eq!(user.email.as_deref(), Some("a@example.com"));

        // An explicit clear wipes it.
        let mut clear = identity("abc");
        clear.email = FieldPatch::Clear;
        upsert_user(&pool, None, &clear).await.unwrap();
        let user = get_user_by_open_id(&pool, "abc").await.unwrap().unwrap();
        assert!(user.email.is_none());
    }

    #[tokio::test]
    async fn concurrent_upserts_for_new_open_id_produce_one_row() {
        let pool = test_pool().await;

        let mut a = identity("newbie");
        a.name = FieldPatch::Set("A".to_string());
        let mut b = identity("newbie");
        b.name = FieldPatch::Set("B".to_string());

        let (ra, rb) = tokio::join!(
            upsert_user(&pool, None, &a),
            upsert_user(&pool, None, &b)
        );
        ra.unwrap();
        rb.unwrap();

        assert_eq!(user_count(&pool).await, 1);
        let user = get_user_by_open_id(&pool, "newbie").await.unwrap().unwrap();
        assert!(matches!(user.name.as_deref(), Some("A") | Some("B")));
    }

    #[tokio::test]
    async fn owner_identity_is_always_promoted_to_admin() {
        let pool = test_pool().await;

        upsert_user(&pool, Some("owner-1"), &identity("owner-1"))
            .await
            .unwrap();
        let user = get_user_by_open_id(&pool, "owner-1").await.unwrap().unwrap();
        assert_eq!(user.role, UserRole::Admin);

        // Repeated logins with other fields present keep the promotion.
        let mut relog = identity("owner-1");
        relog.name = FieldPatch::Set("Owner".to_string());
        upsert_user(&pool, Some("owner-1"), &relog).await.unwrap();
        let user = get_user_by_open_id(&pool, "owner-1").await.unwrap().unwrap();
        assert_eq!(user.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn relogin_never_downgrades_a_stored_role() {
        let pool = test_pool().await;

        upsert_user(&pool, None, &identity("abc")).await.unwrap();
        let user = get_user_by_open_id(&pool, "abc").await.unwrap().unwrap();
        assert!(update_user_role(&pool, &user.id, UserRole::Admin)
            .await
            .unwrap());

        // A plain re-login leaves role out of the update set entirely.
        upsert_user(&pool, None, &identity("abc")).await.unwrap();
        let user = get_user_by_open_id(&pool, "abc").await.unwrap().unwrap();
        assert_eq!(user.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn explicit_role_is_used_verbatim() {
        let pool = test_pool().await;

        let mut id = identity("abc");
        id.role = Some(UserRole::Admin);
        upsert_user(&pool, None, &id).await.unwrap();

        let user = get_user_by_open_id(&pool, "abc").await.unwrap().unwrap();
        assert_eq!(user.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn empty_open_id_is_rejected_without_writing() {
        let pool = test_pool().await;

        let err = upsert_user(&pool, None, &identity("")).await.unwrap_err();
        assert!(matches!(err, UpsertError::MissingOpenId));
        assert_eq!(user_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn closed_pool_degrades_to_noop() {
        let pool = test_pool().await;
        pool.close().await;

        let result = upsert_user(&pool, None, &identity("abc")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn reassign_moves_case_studies_between_users() {
        let pool = test_pool().await;

        upsert_user(&pool, None, &identity("author")).await.unwrap();
        upsert_user(&pool, None, &identity("heir")).await.unwrap();
        let author = get_user_by_open_id(&pool, "author").await.unwrap().unwrap();
        let heir = get_user_by_open_id(&pool, "heir").await.unwrap().unwrap();

        sqlx::query(
            "INSERT INTO case_studies (id, user_id, title, description, category, challenge, solution, created_at, updated_at)
             VALUES ('cs-1', ?, 't', 'd', 'prompt', 'c', 's', 1, 1)",
        )
        .bind(&author.id)
        .execute(&pool)
        .await
        .unwrap();

        assert_eq!(count_user_case_studies(&pool, &author.id).await.unwrap(), 1);
        let moved = reassign_case_studies(&pool, &author.id, &heir.id)
            .await
            .unwrap();
        assert_eq!(moved, 1);
        assert_eq!(count_user_case_studies(&pool, &author.id).await.unwrap(), 0);
        assert_eq!(count_user_case_studies(&pool, &heir.id).await.unwrap(), 1);

        // Author no longer owns anything, so deletion goes through.
        assert!(delete_user(&pool, &author.id).await.unwrap());
    }
}
