//! TMDB catalog provider.
//!
//! API flow:
//! 1. Search: `GET /search/multi` with the configured language, mixing movie,
//!    series and person results; person rows are dropped.
//! 2. Details: `GET /movie/{id}` or `GET /tv/{id}` depending on media kind.
//!
//! TMDB uses different field names for movies (`title`, `release_date`) and
//! series (`name`, `first_air_date`); both shapes normalize into the same
//! local metadata.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::{MediaKind, TitleMetadata};
use crate::services::catalog::{CatalogHit, CatalogProvider};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    language: String,
}

/// One row of a `search/multi` response
#[derive(Debug, Deserialize)]
pub struct TmdbSearchItem {
    pub id: i64,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse {
    #[serde(default)]
    results: Vec<TmdbSearchItem>,
}

/// A movie or TV details response; the two shapes share this struct
#[derive(Debug, Deserialize)]
pub struct TmdbDetails {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
}

/// TMDB sends empty strings for unknown dates
fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<NaiveDate>().ok())
}

impl From<TmdbDetails> for TitleMetadata {
    fn from(details: TmdbDetails) -> Self {
        let release_date = parse_date(
            details
                .release_date
                .as_deref()
                .or(details.first_air_date.as_deref()),
        );

        TitleMetadata {
            name: details.title.or(details.name).unwrap_or_default(),
            original_name: details
                .original_title
                .or(details.original_name)
                .unwrap_or_default(),
            release_date,
            poster_path: details.poster_path,
            overview: details.overview.unwrap_or_default(),
        }
    }
}

impl TmdbProvider {
    pub fn new(api_key: String, api_url: String, language: String) -> Self {
        let http_client = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http_client,
            api_key,
            api_url,
            language,
        }
    }

    /// Maps a multi-search row to a hit; `None` drops it (persons, rows
    /// without a usable name)
    fn convert_search_item(item: TmdbSearchItem) -> Option<CatalogHit> {
        let media_kind = match item.media_type.as_deref() {
            Some("movie") => MediaKind::Movie,
            Some("tv") => MediaKind::Series,
            _ => return None,
        };

        let name = item.title.or(item.name).filter(|n| !n.is_empty())?;

        Some(CatalogHit {
            tmdb_id: item.id,
            media_kind,
            name,
            release_date: parse_date(
                item.release_date
                    .as_deref()
                    .or(item.first_air_date.as_deref()),
            ),
            poster_path: item.poster_path,
            overview: item.overview.unwrap_or_default(),
        })
    }

    fn details_path(kind: MediaKind) -> &'static str {
        match kind {
            MediaKind::Movie => "movie",
            MediaKind::Series => "tv",
        }
    }
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbProvider {
    async fn search(&self, query: &str, page: u32) -> AppResult<Vec<CatalogHit>> {
        if query.trim().is_empty() {
            return Err(AppError::Validation(
                "Search query cannot be empty".to_string(),
            ));
        }

        let url = format!("{}/search/multi", self.api_url);
        let page = page.to_string();
        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("query", query),
                ("page", page.as_str()),
                ("language", self.language.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Collaborator(format!(
                "TMDB search returned status {}: {}",
                status, body
            )));
        }

        let search: TmdbSearchResponse = response.json().await?;
        let hits: Vec<CatalogHit> = search
            .results
            .into_iter()
            .filter_map(Self::convert_search_item)
            .collect();

        tracing::info!(
            query = %query,
            results = hits.len(),
            provider = self.name(),
            "Catalog search completed"
        );

        Ok(hits)
    }

    async fn details(&self, tmdb_id: i64, kind: MediaKind) -> AppResult<Option<TitleMetadata>> {
        let url = format!(
            "{}/{}/{}",
            self.api_url,
            Self::details_path(kind),
            tmdb_id
        );

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Collaborator(format!(
                "TMDB details returned status {}: {}",
                status, body
            )));
        }

        let details: TmdbDetails = response.json().await?;

        tracing::debug!(
            tmdb_id,
            kind = %kind,
            provider = self.name(),
            "Catalog details fetched"
        );

        Ok(Some(details.into()))
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
