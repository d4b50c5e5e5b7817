//! User records.
//!
//! Credentials and sessions live with the external identity provider; this
//! store only knows who exists and which list is their default. The default
//! list is a nullable foreign key on the user, so "at most one default" holds
//! by construction instead of by an application-level flag.

use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};

use crate::error::{AppError, AppResult};
use crate::models::{User, Visibility};

/// Name given to the list seeded at registration
const DEFAULT_LIST_NAME: &str = "Watchlist";

/// Registers a user and seeds their default private list, in one transaction
pub async fn create(pool: &SqlitePool, email: &str, name: &str) -> AppResult<User> {
    if email.trim().is_empty() || name.trim().is_empty() {
        return Err(AppError::Validation(
            "Email and name are required".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let now = Utc::now();
    let user_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (email, name, created_at) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(email)
    .bind(name)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Validation("Email is already registered".to_string())
        }
        _ => AppError::Storage(e),
    })?;

    let list_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO lists (name, description, visibility, created_by, created_at, updated_at)
        VALUES (?, '', ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(DEFAULT_LIST_NAME)
    .bind(Visibility::Private)
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

    sqlx::query("UPDATE users SET default_list_id = ? WHERE id = ?")
        .bind(list_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(user_id, default_list_id = list_id, "User registered");

    Ok(user)
}

/// Points the user's default list at another list they own
pub async fn set_default_list(pool: &SqlitePool, user_id: i64, list_id: i64) -> AppResult<()> {
    let result = sqlx::query("UPDATE users SET default_list_id = ? WHERE id = ?")
        .bind(list_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(())
}

/// Looks up a user by id
pub async fn find(executor: impl SqliteExecutor<'_>, id: i64) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(user)
}

/// Looks up a user by email
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::store::lists;

    #[tokio::test]
    async fn registration_seeds_one_default_private_list() {
        let pool = create_test_pool().await;

        let user = create(&pool, "alice@example.com", "Alice").await.unwrap();
        let default_id = user.default_list_id.expect("default list seeded");

        let list = lists::find(&pool, default_id).await.unwrap().unwrap();
        assert_eq!(list.name, DEFAULT_LIST_NAME);
        assert_eq!(list.visibility, Visibility::Private);
        assert!(lists::is_owner(&pool, default_id, user.id).await.unwrap());

        let summaries = lists::for_user(&pool, user.id).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].is_default);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_without_residue() {
        let pool = create_test_pool().await;

        create(&pool, "alice@example.com", "Alice").await.unwrap();
        let err = create(&pool, "alice@example.com", "Imposter")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // The failed registration left no extra list behind.
        let lists_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lists")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(lists_count, 1);
    }

    #[tokio::test]
    async fn blank_fields_are_rejected() {
        let pool = create_test_pool().await;

        assert!(matches!(
            create(&pool, "", "Alice").await.unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            create(&pool, "alice@example.com", " ").await.unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn lookup_by_id_and_email() {
        let pool = create_test_pool().await;

        let user = create(&pool, "alice@example.com", "Alice").await.unwrap();
        assert_eq!(find(&pool, user.id).await.unwrap().unwrap().name, "Alice");
        assert_eq!(
            find_by_email(&pool, "alice@example.com")
                .await
                .unwrap()
                .unwrap()
                .id,
            user.id
        );
        assert!(find(&pool, 9999).await.unwrap().is_none());
    }
}
