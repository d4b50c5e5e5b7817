//! Watch-tracking flows that span the catalog and several relations.
//!
//! The add-to-list flow writes the title cache, the membership ledger and the
//! viewing-state ledger. All three land in one transaction: a failure at any
//! step rolls back the others, so a half-applied add cannot exist.

use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::{MediaKind, WatchState};
use crate::services::catalog::CatalogProvider;
use crate::store::{items, titles, viewing};

/// Ratings are a 1-5 scale; out-of-range values are rejected rather than
/// clamped
fn validate_rating(rating: Option<i64>) -> AppResult<()> {
    match rating {
        Some(r) if !(1..=5).contains(&r) => Err(AppError::Validation(format!(
            "Rating must be between 1 and 5, got {}",
            r
        ))),
        _ => Ok(()),
    }
}

/// Resolves a catalog item into the local title cache, adds it to the list
/// and records the user's initial viewing state. Returns the local title id.
///
/// The caller must have verified list ownership already; this flow never
/// checks the actor. A catalog miss or failure surfaces as "title not found".
pub async fn add_title_to_list(
    pool: &SqlitePool,
    catalog: &dyn CatalogProvider,
    user_id: i64,
    list_id: i64,
    tmdb_id: i64,
    kind: MediaKind,
    state: WatchState,
    rating: Option<i64>,
    comment: &str,
) -> AppResult<i64> {
    validate_rating(rating)?;

    let metadata = catalog
        .details(tmdb_id, kind)
        .await?
        .ok_or_else(|| AppError::NotFound("Title not found".to_string()))?;

    let mut tx = pool.begin().await?;

    let title_id = titles::resolve_or_create(&mut *tx, tmdb_id, kind, &metadata).await?;
    items::add(&mut *tx, list_id, title_id).await?;
    viewing::set_state(&mut *tx, user_id, title_id, state, rating, comment).await?;

    tx.commit().await?;

    tracing::info!(
        user_id,
        list_id,
        title_id,
        tmdb_id,
        state = %state,
        "Title added to list"
    );

    Ok(title_id)
}

/// Overwrites the user's viewing state for an already-known title.
///
/// Per-user, not per-list: no list ownership is involved. The title must
/// exist locally.
pub async fn update_state(
    pool: &SqlitePool,
    user_id: i64,
    title_id: i64,
    state: WatchState,
    rating: Option<i64>,
    comment: &str,
) -> AppResult<()> {
    validate_rating(rating)?;

    if titles::find(pool, title_id).await?.is_none() {
        return Err(AppError::NotFound("Title not found".to_string()));
    }

    viewing::set_state(pool, user_id, title_id, state, rating, comment).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::{TitleMetadata, Visibility};
    use crate::services::catalog::CatalogHit;
    use crate::store::{lists, users};

    /// Canned catalog: knows one movie, nothing else
    struct StubCatalog;

    #[async_trait::async_trait]
    impl CatalogProvider for StubCatalog {
        async fn search(&self, _query: &str, _page: u32) -> AppResult<Vec<CatalogHit>> {
            Ok(Vec::new())
        }

        async fn details(
            &self,
            tmdb_id: i64,
            kind: MediaKind,
        ) -> AppResult<Option<TitleMetadata>> {
            if tmdb_id == 438631 && kind == MediaKind::Movie {
                Ok(Some(TitleMetadata {
                    name: "Dune".to_string(),
                    original_name: "Dune".to_string(),
                    release_date: "2021-09-15".parse().ok(),
                    poster_path: Some("/dune.jpg".to_string()),
                    overview: "Spice.".to_string(),
                }))
            } else {
                Ok(None)
            }
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    /// Catalog that always fails at the transport level
    struct BrokenCatalog;

    #[async_trait::async_trait]
    impl CatalogProvider for BrokenCatalog {
        async fn search(&self, _query: &str, _page: u32) -> AppResult<Vec<CatalogHit>> {
            Err(AppError::Collaborator("connection refused".to_string()))
        }

        async fn details(
            &self,
            _tmdb_id: i64,
            _kind: MediaKind,
        ) -> AppResult<Option<TitleMetadata>> {
            Err(AppError::Collaborator("connection refused".to_string()))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    async fn fixture(pool: &SqlitePool) -> (i64, i64) {
        let user = users::create(pool, "alice@example.com", "Alice")
            .await
            .unwrap();
        let list_id = lists::create(pool, user.id, "Queue", "", Visibility::Private)
            .await
            .unwrap();
        (user.id, list_id)
    }

    #[tokio::test]
    async fn add_flow_writes_title_membership_and_state() {
        let pool = create_test_pool().await;
        let (user_id, list_id) = fixture(&pool).await;

        let title_id = add_title_to_list(
            &pool,
            &StubCatalog,
            user_id,
            list_id,
            438631,
            MediaKind::Movie,
            WatchState::Want,
            None,
            "",
        )
        .await
        .unwrap();

        assert!(items::contains(&pool, list_id, title_id).await.unwrap());
        let record = viewing::get(&pool, user_id, title_id).await.unwrap().unwrap();
        assert_eq!(record.state, WatchState::Want);
        assert_eq!(record.rating, None);
    }

    #[tokio::test]
    async fn adding_twice_converges_on_one_of_everything() {
        let pool = create_test_pool().await;
        let (user_id, list_id) = fixture(&pool).await;

        let first = add_title_to_list(
            &pool,
            &StubCatalog,
            user_id,
            list_id,
            438631,
            MediaKind::Movie,
            WatchState::Want,
            None,
            "",
        )
        .await
        .unwrap();
        let second = add_title_to_list(
            &pool,
            &StubCatalog,
            user_id,
            list_id,
            438631,
            MediaKind::Movie,
            WatchState::Watched,
            Some(5),
            "rewatched",
        )
        .await
        .unwrap();
        assert_eq!(first, second);

        for (table, expected) in [("titles", 1), ("list_items", 1), ("user_titles", 1)] {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(count, expected, "{}", table);
        }

        // The second add overwrote the state record.
        let record = viewing::get(&pool, user_id, first).await.unwrap().unwrap();
        assert_eq!(record.state, WatchState::Watched);
    }

    #[tokio::test]
    async fn unknown_catalog_id_is_not_found() {
        let pool = create_test_pool().await;
        let (user_id, list_id) = fixture(&pool).await;

        let err = add_title_to_list(
            &pool,
            &StubCatalog,
            user_id,
            list_id,
            999999,
            MediaKind::Movie,
            WatchState::Want,
            None,
            "",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn catalog_failure_propagates_without_writes() {
        let pool = create_test_pool().await;
        let (user_id, list_id) = fixture(&pool).await;

        let err = add_title_to_list(
            &pool,
            &BrokenCatalog,
            user_id,
            list_id,
            438631,
            MediaKind::Movie,
            WatchState::Want,
            None,
            "",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Collaborator(_)));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM titles")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn failed_membership_insert_rolls_back_the_title() {
        let pool = create_test_pool().await;
        let (user_id, _) = fixture(&pool).await;

        // Nonexistent list: the membership insert violates its foreign key
        // after the title insert already succeeded inside the transaction.
        let err = add_title_to_list(
            &pool,
            &StubCatalog,
            user_id,
            9999,
            438631,
            MediaKind::Movie,
            WatchState::Want,
            None,
            "",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));

        for table in ["titles", "list_items", "user_titles"] {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(count, 0, "{} should be empty after rollback", table);
        }
    }

    #[tokio::test]
    async fn out_of_range_rating_is_rejected() {
        let pool = create_test_pool().await;
        let (user_id, list_id) = fixture(&pool).await;

        for bad in [0, 6, -1] {
            let err = add_title_to_list(
                &pool,
                &StubCatalog,
                user_id,
                list_id,
                438631,
                MediaKind::Movie,
                WatchState::Watched,
                Some(bad),
                "",
            )
            .await
            .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn update_state_requires_a_known_title() {
        let pool = create_test_pool().await;
        let (user_id, _) = fixture(&pool).await;

        let err = update_state(&pool, user_id, 42, WatchState::Watched, Some(5), "")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
