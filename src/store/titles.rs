//! Title registry: deduplicated local cache of catalog entries.
//!
//! Titles are created lazily on first reference and shared across lists and
//! users; nothing in the normal flow deletes them.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{SqliteExecutor, SqlitePool};

use crate::error::{AppError, AppResult};
use crate::models::{MediaKind, Title, TitleMetadata};

/// Partial update of a title's descriptive fields. The identity pair
/// (tmdb_id, media_kind) is never updatable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitlePatch {
    pub name: Option<String>,
    pub original_name: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
}

/// Returns the local id for a catalog item, inserting it first if unseen.
///
/// The upsert is a single statement, so concurrent duplicate calls converge on
/// one row. An existing row keeps its stored metadata; re-resolving does not
/// refresh it.
pub async fn resolve_or_create(
    executor: impl SqliteExecutor<'_>,
    tmdb_id: i64,
    kind: MediaKind,
    metadata: &TitleMetadata,
) -> AppResult<i64> {
    if metadata.name.trim().is_empty() {
        return Err(AppError::Validation("Title name is required".to_string()));
    }

    let now = Utc::now();
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO titles (tmdb_id, media_kind, name, original_name,
                            release_date, poster_path, overview,
                            created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (tmdb_id, media_kind) DO UPDATE SET tmdb_id = excluded.tmdb_id
        RETURNING id
        "#,
    )
    .bind(tmdb_id)
    .bind(kind)
    .bind(&metadata.name)
    .bind(&metadata.original_name)
    .bind(metadata.release_date)
    .bind(&metadata.poster_path)
    .bind(&metadata.overview)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// Looks up a title by local id
pub async fn find(executor: impl SqliteExecutor<'_>, id: i64) -> AppResult<Option<Title>> {
    let title = sqlx::query_as::<_, Title>("SELECT * FROM titles WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(title)
}

/// Updates descriptive fields only; absent patch fields keep their value
pub async fn update_metadata(pool: &SqlitePool, id: i64, patch: &TitlePatch) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE titles SET
            name = COALESCE(?, name),
            original_name = COALESCE(?, original_name),
            release_date = COALESCE(?, release_date),
            poster_path = COALESCE(?, poster_path),
            overview = COALESCE(?, overview),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&patch.name)
    .bind(&patch.original_name)
    .bind(patch.release_date)
    .bind(&patch.poster_path)
    .bind(&patch.overview)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Title not found".to_string()));
    }

    Ok(())
}

/// Administrative removal of a title record
pub async fn delete(pool: &SqlitePool, id: i64) -> AppResult<()> {
    sqlx::query("DELETE FROM titles WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Case-insensitive substring search over locally cached titles.
///
/// This only sees titles someone has already referenced; discovery of new
/// titles goes through the catalog provider.
pub async fn search(pool: &SqlitePool, query: &str, limit: i64) -> AppResult<Vec<Title>> {
    let pattern = format!("%{}%", query.trim());
    let titles = sqlx::query_as::<_, Title>(
        r#"
        SELECT * FROM titles
        WHERE name LIKE ? OR original_name LIKE ?
        ORDER BY name
        LIMIT ?
        "#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(titles)
}

/// Titles ordered by how many lists reference them, newest first on ties
pub async fn popular(pool: &SqlitePool, limit: i64) -> AppResult<Vec<Title>> {
    let titles = sqlx::query_as::<_, Title>(
        r#"
        SELECT t.*
        FROM titles t
        LEFT JOIN list_items li ON li.title_id = t.id
        GROUP BY t.id
        ORDER BY COUNT(li.id) DESC, t.created_at DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(titles)
}
