//! List registry: named collections with visibility and a shared owner set.
//!
//! Ownership gates writes, visibility gates reads. These helpers never see the
//! acting user beyond an explicit id to compare against the owner relation;
//! deciding who the actor is belongs to the HTTP layer.

use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};

use crate::error::{AppError, AppResult};
use crate::models::{List, ListSummary, User, Visibility};

/// Creates a list and its initial ownership row in one transaction
pub async fn create(
    pool: &SqlitePool,
    user_id: i64,
    name: &str,
    description: &str,
    visibility: Visibility,
) -> AppResult<i64> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("List name is required".to_string()));
    }

    let mut tx = pool.begin().await?;

    let now = Utc::now();
    let list_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO lists (name, description, visibility, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(description)
    .bind(visibility)
    .bind(user_id)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO list_owners (list_id, user_id) VALUES (?, ?)")
        .bind(list_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(list_id)
}

/// Looks up a list by id
pub async fn find(executor: impl SqliteExecutor<'_>, list_id: i64) -> AppResult<Option<List>> {
    let list = sqlx::query_as::<_, List>("SELECT * FROM lists WHERE id = ?")
        .bind(list_id)
        .fetch_optional(executor)
        .await?;

    Ok(list)
}

/// All lists owned by the user, default list first, then newest first
pub async fn for_user(pool: &SqlitePool, user_id: i64) -> AppResult<Vec<ListSummary>> {
    let lists = sqlx::query_as::<_, ListSummary>(
        r#"
        SELECT l.id, l.name, l.description, l.visibility, l.created_by, l.created_at,
               (SELECT COUNT(*) FROM list_items li WHERE li.list_id = l.id) AS item_count,
               (l.id IS (SELECT default_list_id FROM users WHERE id = ?)) AS is_default
        FROM lists l
        JOIN list_owners lo ON lo.list_id = l.id
        WHERE lo.user_id = ?
        ORDER BY is_default DESC, l.created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(lists)
}

/// Exact-match test against the ownership relation; gates all list writes
pub async fn is_owner(
    executor: impl SqliteExecutor<'_>,
    list_id: i64,
    user_id: i64,
) -> AppResult<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT id FROM list_owners WHERE list_id = ? AND user_id = ?")
            .bind(list_id)
            .bind(user_id)
            .fetch_optional(executor)
            .await?;

    Ok(found.is_some())
}

/// True when the list is public or the user is an owner; gates reads.
/// Strictly wider than `is_owner`. A missing list is `NotFound`.
pub async fn can_access(pool: &SqlitePool, list_id: i64, user_id: i64) -> AppResult<bool> {
    let visibility: Option<Visibility> =
        sqlx::query_scalar("SELECT visibility FROM lists WHERE id = ?")
            .bind(list_id)
            .fetch_optional(pool)
            .await?;

    match visibility {
        None => Err(AppError::NotFound("List not found".to_string())),
        Some(Visibility::Public) => Ok(true),
        Some(Visibility::Private) => is_owner(pool, list_id, user_id).await,
    }
}

/// Renames a list and replaces its description
pub async fn update(
    pool: &SqlitePool,
    list_id: i64,
    name: &str,
    description: &str,
) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("List name is required".to_string()));
    }

    let result =
        sqlx::query("UPDATE lists SET name = ?, description = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(description)
            .bind(Utc::now())
            .bind(list_id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("List not found".to_string()));
    }

    Ok(())
}

/// Switches a list between private and public
pub async fn set_visibility(
    pool: &SqlitePool,
    list_id: i64,
    visibility: Visibility,
) -> AppResult<()> {
    let result = sqlx::query("UPDATE lists SET visibility = ?, updated_at = ? WHERE id = ?")
        .bind(visibility)
        .bind(Utc::now())
        .bind(list_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("List not found".to_string()));
    }

    Ok(())
}

/// Deletes a list. Memberships cascade; title records are shared across lists
/// and are left untouched.
pub async fn delete(pool: &SqlitePool, list_id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM lists WHERE id = ?")
        .bind(list_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("List not found".to_string()));
    }

    Ok(())
}

/// Adds a co-owner; idempotent
pub async fn add_owner(pool: &SqlitePool, list_id: i64, user_id: i64) -> AppResult<()> {
    sqlx::query("INSERT OR IGNORE INTO list_owners (list_id, user_id) VALUES (?, ?)")
        .bind(list_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Removes a co-owner; no-op when not an owner
pub async fn remove_owner(pool: &SqlitePool, list_id: i64, user_id: i64) -> AppResult<()> {
    sqlx::query("DELETE FROM list_owners WHERE list_id = ? AND user_id = ?")
        .bind(list_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// All owners of a list, ordered by name
pub async fn owners(pool: &SqlitePool, list_id: i64) -> AppResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT u.*
        FROM users u
        JOIN list_owners lo ON lo.user_id = u.id
        WHERE lo.list_id = ?
        ORDER BY u.name
        "#,
    )
    .bind(list_id)
    .fetch_all(pool)
    .await?;

    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::store::users;

    async fn user(pool: &SqlitePool, email: &str) -> i64 {
        users::create(pool, email, "Test User").await.unwrap().id
    }

    #[tokio::test]
    async fn creating_a_list_records_ownership() {
        let pool = create_test_pool().await;
        let alice = user(&pool, "alice@example.com").await;

        let list_id = create(&pool, alice, "Sci-fi", "", Visibility::Private)
            .await
            .unwrap();

        assert!(is_owner(&pool, list_id, alice).await.unwrap());
    }

    #[tokio::test]
    async fn empty_name_is_rejected() {
        let pool = create_test_pool().await;
        let alice = user(&pool, "alice@example.com").await;

        let err = create(&pool, alice, "  ", "", Visibility::Private)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn access_control_matrix() {
        let pool = create_test_pool().await;
        let alice = user(&pool, "alice@example.com").await;
        let bob = user(&pool, "bob@example.com").await;

        let private = create(&pool, alice, "Private", "", Visibility::Private)
            .await
            .unwrap();
        let public = create(&pool, alice, "Public", "", Visibility::Public)
            .await
            .unwrap();

        // Public: readable by anyone, including non-owners.
        assert!(can_access(&pool, public, bob).await.unwrap());
        assert!(can_access(&pool, public, alice).await.unwrap());

        // Private: owner only.
        assert!(can_access(&pool, private, alice).await.unwrap());
        assert!(!can_access(&pool, private, bob).await.unwrap());

        // is_owner is strictly narrower than can_access.
        assert!(!is_owner(&pool, public, bob).await.unwrap());

        let err = can_access(&pool, 9999, alice).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn co_owner_gets_full_rights() {
        let pool = create_test_pool().await;
        let alice = user(&pool, "alice@example.com").await;
        let bob = user(&pool, "bob@example.com").await;

        let list_id = create(&pool, alice, "Shared", "", Visibility::Private)
            .await
            .unwrap();
        add_owner(&pool, list_id, bob).await.unwrap();
        // Idempotent.
        add_owner(&pool, list_id, bob).await.unwrap();

        assert!(is_owner(&pool, list_id, bob).await.unwrap());
        assert_eq!(owners(&pool, list_id).await.unwrap().len(), 2);

        remove_owner(&pool, list_id, bob).await.unwrap();
        assert!(!is_owner(&pool, list_id, bob).await.unwrap());
    }

    #[tokio::test]
    async fn user_lists_put_the_default_list_first() {
        let pool = create_test_pool().await;
        // Registration seeds a default list.
        let alice = users::create(&pool, "alice@example.com", "Alice")
            .await
            .unwrap();
        let default_id = alice.default_list_id.unwrap();

        create(&pool, alice.id, "Later", "", Visibility::Private)
            .await
            .unwrap();

        let lists = for_user(&pool, alice.id).await.unwrap();
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].id, default_id);
        assert!(lists[0].is_default);
        assert!(!lists[1].is_default);
    }

    #[tokio::test]
    async fn deleting_a_list_keeps_title_records() {
        let pool = create_test_pool().await;
        let alice = user(&pool, "alice@example.com").await;

        let list_id = create(&pool, alice, "Doomed", "", Visibility::Private)
            .await
            .unwrap();

        let title_id = crate::store::titles::resolve_or_create(
            &pool,
            603,
            crate::models::MediaKind::Movie,
            &crate::models::TitleMetadata {
                name: "The Matrix".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        crate::store::items::add(&pool, list_id, title_id)
            .await
            .unwrap();

        delete(&pool, list_id).await.unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM titles")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 1);

        let memberships: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM list_items")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(memberships, 0);
    }
}
