use std::sync::Arc;

use sqlx::SqlitePool;

use crate::services::catalog::CatalogProvider;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub catalog: Arc<dyn CatalogProvider>,
}

impl AppState {
    pub fn new(pool: SqlitePool, catalog: Arc<dyn CatalogProvider>) -> Self {
        Self { pool, catalog }
    }
}
