//! Membership ledger: the (list, title) existence relation.
//!
//! This layer never sees the acting user. Authorization happens at the HTTP
//! boundary before any mutation lands here, which keeps the ledger testable
//! without an identity fixture.

use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};

use crate::error::AppResult;
use crate::models::{ListEntry, WatchState};

/// Adds a title to a list. Re-adding an existing membership is a no-op.
pub async fn add(executor: impl SqliteExecutor<'_>, list_id: i64, title_id: i64) -> AppResult<()> {
    sqlx::query("INSERT OR IGNORE INTO list_items (list_id, title_id, created_at) VALUES (?, ?, ?)")
        .bind(list_id)
        .bind(title_id)
        .bind(Utc::now())
        .execute(executor)
        .await?;

    Ok(())
}

/// Removes a title from a list; no-op when not a member
pub async fn remove(
    executor: impl SqliteExecutor<'_>,
    list_id: i64,
    title_id: i64,
) -> AppResult<()> {
    sqlx::query("DELETE FROM list_items WHERE list_id = ? AND title_id = ?")
        .bind(list_id)
        .bind(title_id)
        .execute(executor)
        .await?;

    Ok(())
}

/// Whether the (list, title) pair exists
pub async fn contains(
    executor: impl SqliteExecutor<'_>,
    list_id: i64,
    title_id: i64,
) -> AppResult<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT id FROM list_items WHERE list_id = ? AND title_id = ?")
            .bind(list_id)
            .bind(title_id)
            .fetch_optional(executor)
            .await?;

    Ok(found.is_some())
}

/// Titles in a list, most recently added first.
///
/// With a `user_id`, each entry is annotated with that user's viewing state
/// via a left join; titles the user has never stated carry null state fields.
/// With both `user_id` and `state`, entries are filtered to that state, but
/// titles with NO viewing state at all remain included. That inclusion rule is
/// deliberate: an unstated title has not been ruled out of any state yet.
pub async fn entries(
    pool: &SqlitePool,
    list_id: i64,
    state: Option<WatchState>,
    user_id: Option<i64>,
) -> AppResult<Vec<ListEntry>> {
    let base = r#"
        SELECT t.id AS title_id, t.tmdb_id, t.media_kind, t.name, t.original_name,
               t.release_date, t.poster_path, t.overview,
               li.created_at AS added_at,
               ut.state, ut.rating, ut.comment, ut.updated_at AS state_updated_at
        FROM list_items li
        JOIN titles t ON t.id = li.title_id
        LEFT JOIN user_titles ut ON ut.title_id = t.id AND ut.user_id = ?
        WHERE li.list_id = ?
    "#;

    let rows = match (user_id, state) {
        (Some(user_id), Some(state)) => {
            let sql = format!(
                "{base} AND (ut.state = ? OR ut.state IS NULL) ORDER BY li.created_at DESC"
            );
            sqlx::query_as::<_, ListEntry>(&sql)
                .bind(user_id)
                .bind(list_id)
                .bind(state)
                .fetch_all(pool)
                .await?
        }
        (Some(user_id), None) => {
            let sql = format!("{base} ORDER BY li.created_at DESC");
            sqlx::query_as::<_, ListEntry>(&sql)
                .bind(user_id)
                .bind(list_id)
                .fetch_all(pool)
                .await?
        }
        // Without a user there is no viewing state to join or filter on.
        (None, _) => {
            let sql = format!("{base} ORDER BY li.created_at DESC");
            sqlx::query_as::<_, ListEntry>(&sql)
                .bind(Option::<i64>::None)
                .bind(list_id)
                .fetch_all(pool)
                .await?
        }
    };

    Ok(rows)
}
