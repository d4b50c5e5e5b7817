//! Viewing-state ledger: one record per (user, title), independent of lists.
//!
//! A title can sit in several of a user's lists at once, but the user has
//! exactly one opinion about it. Everything list-facing reads that single
//! record; nothing here knows which lists contain the title.

use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};

use crate::error::AppResult;
use crate::models::{HistoryEntry, StateStats, TitleStatus, ViewingState, WatchState};

/// Upserts the user's state for a title.
///
/// A full overwrite: state, rating and comment are all replaced, so passing
/// `rating = None` clears a previously set rating. Callers that want a
/// partial update must read-modify-write.
pub async fn set_state(
    executor: impl SqliteExecutor<'_>,
    user_id: i64,
    title_id: i64,
    state: WatchState,
    rating: Option<i64>,
    comment: &str,
) -> AppResult<()> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO user_titles (user_id, title_id, state, rating, comment, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (user_id, title_id) DO UPDATE SET
            state = excluded.state,
            rating = excluded.rating,
            comment = excluded.comment,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id)
    .bind(title_id)
    .bind(state)
    .bind(rating)
    .bind(comment)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(())
}

/// Exact lookup of the user's record for a title
pub async fn get(
    executor: impl SqliteExecutor<'_>,
    user_id: i64,
    title_id: i64,
) -> AppResult<Option<ViewingState>> {
    let state = sqlx::query_as::<_, ViewingState>(
        r#"
        SELECT user_id, title_id, state, rating, comment, updated_at
        FROM user_titles
        WHERE user_id = ? AND title_id = ?
        "#,
    )
    .bind(user_id)
    .bind(title_id)
    .fetch_optional(executor)
    .await?;

    Ok(state)
}

/// Explicitly drops the user's record for a title; no-op when absent
pub async fn clear(pool: &SqlitePool, user_id: i64, title_id: i64) -> AppResult<()> {
    sqlx::query("DELETE FROM user_titles WHERE user_id = ? AND title_id = ?")
        .bind(user_id)
        .bind(title_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Paginated history of the user's titles in one state, most recently
/// updated first. Spans all lists; a title needs no membership to appear.
pub async fn by_state(
    pool: &SqlitePool,
    user_id: i64,
    state: WatchState,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<HistoryEntry>> {
    let entries = sqlx::query_as::<_, HistoryEntry>(
        r#"
        SELECT t.id AS title_id, t.tmdb_id, t.media_kind, t.name, t.poster_path,
               ut.state, ut.rating, ut.comment, ut.updated_at
        FROM user_titles ut
        JOIN titles t ON t.id = ut.title_id
        WHERE ut.user_id = ? AND ut.state = ?
        ORDER BY ut.updated_at DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_id)
    .bind(state)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// The user's most recently touched titles across all states
pub async fn recent(pool: &SqlitePool, user_id: i64, limit: i64) -> AppResult<Vec<HistoryEntry>> {
    let entries = sqlx::query_as::<_, HistoryEntry>(
        r#"
        SELECT t.id AS title_id, t.tmdb_id, t.media_kind, t.name, t.poster_path,
               ut.state, ut.rating, ut.comment, ut.updated_at
        FROM user_titles ut
        JOIN titles t ON t.id = ut.title_id
        WHERE ut.user_id = ?
        ORDER BY ut.updated_at DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Per-state counts and average rating for the user's whole ledger
pub async fn stats(pool: &SqlitePool, user_id: i64) -> AppResult<Vec<StateStats>> {
    let stats = sqlx::query_as::<_, StateStats>(
        r#"
        SELECT state, COUNT(*) AS count, AVG(rating) AS avg_rating
        FROM user_titles
        WHERE user_id = ?
        GROUP BY state
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(stats)
}

/// The detail-view read model: every list owned by the user that contains the
/// title, each row carrying the user's single viewing-state record.
///
/// The broadcast is the point of the decoupled model: the same state, rating
/// and comment show up identically in every containing list. With no record
/// yet, rows fall back to `want` with no rating, matching what a fresh
/// add-to-list would create.
pub async fn title_status(
    pool: &SqlitePool,
    user_id: i64,
    title_id: i64,
) -> AppResult<Vec<TitleStatus>> {
    let record = get(pool, user_id, title_id).await?;

    let lists: Vec<(i64, String)> = sqlx::query_as(
        r#"
        SELECT l.id, l.name
        FROM list_items li
        JOIN lists l ON l.id = li.list_id
        JOIN list_owners lo ON lo.list_id = l.id
        WHERE li.title_id = ? AND lo.user_id = ?
        ORDER BY l.name
        "#,
    )
    .bind(title_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let status = lists
        .into_iter()
        .map(|(list_id, list_name)| TitleStatus {
            list_id,
            list_name,
            state: record.as_ref().map(|r| r.state).unwrap_or(WatchState::Want),
            rating: record.as_ref().and_then(|r| r.rating),
            comment: record
                .as_ref()
                .map(|r| r.comment.clone())
                .unwrap_or_default(),
        })
        .collect();

    Ok(status)
}
