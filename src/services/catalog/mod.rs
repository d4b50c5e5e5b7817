//! Catalog lookup abstraction.
//!
//! The catalog is an external, unreliable collaborator: it resolves free-text
//! queries and external ids to title metadata and holds no local state. The
//! trait seam keeps the rest of the crate independent of the concrete
//! provider, and lets tests substitute a canned one.

use serde::Serialize;

use crate::error::AppResult;
use crate::models::{MediaKind, TitleMetadata};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// One search result from the catalog, keyed by the provider's external id
#[derive(Debug, Clone, Serialize)]
pub struct CatalogHit {
    pub tmdb_id: i64,
    pub media_kind: MediaKind,
    pub name: String,
    pub release_date: Option<chrono::NaiveDate>,
    pub poster_path: Option<String>,
    pub overview: String,
}

/// Trait for catalog metadata providers
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Free-text search across movies and series
    async fn search(&self, query: &str, page: u32) -> AppResult<Vec<CatalogHit>>;

    /// Full metadata for one catalog entry; `None` when the catalog does not
    /// know the id
    async fn details(&self, tmdb_id: i64, kind: MediaKind) -> AppResult<Option<TitleMetadata>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
