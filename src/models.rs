use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Discriminator between movie and TV series catalog entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::Series => write!(f, "series"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaKind::Movie),
            "series" => Ok(MediaKind::Series),
            other => Err(AppError::Validation(format!(
                "Unknown media kind: {}",
                other
            ))),
        }
    }
}

/// A user's viewing state for a title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum WatchState {
    Want,
    Watching,
    Watched,
    Stopped,
}

impl Display for WatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WatchState::Want => "want",
            WatchState::Watching => "watching",
            WatchState::Watched => "watched",
            WatchState::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for WatchState {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "want" => Ok(WatchState::Want),
            "watching" => Ok(WatchState::Watching),
            "watched" => Ok(WatchState::Watched),
            "stopped" => Ok(WatchState::Stopped),
            other => Err(AppError::Validation(format!(
                "Unknown viewing state: {}",
                other
            ))),
        }
    }
}

/// List visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Public,
}

impl FromStr for Visibility {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Visibility::Private),
            "public" => Ok(Visibility::Public),
            other => Err(AppError::Validation(format!(
                "Unknown visibility: {}",
                other
            ))),
        }
    }
}

/// A deduplicated local record of a catalog item
///
/// Unique on (tmdb_id, media_kind); descriptive fields may drift from the
/// catalog since they are not refreshed on re-reference.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Title {
    pub id: i64,
    pub tmdb_id: i64,
    pub media_kind: MediaKind,
    pub name: String,
    pub original_name: String,
    pub release_date: Option<NaiveDate>,
    pub poster_path: Option<String>,
    pub overview: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Descriptive metadata used when caching a catalog item locally
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TitleMetadata {
    pub name: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: String,
}

/// A named, owned collection of titles
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct List {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A list annotated with its item count, for overview pages
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ListSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub item_count: i64,
    /// Whether this is the requesting user's default list
    pub is_default: bool,
}

/// One user's state/rating/comment for one title
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ViewingState {
    pub user_id: i64,
    pub title_id: i64,
    pub state: WatchState,
    pub rating: Option<i64>,
    pub comment: String,
    pub updated_at: DateTime<Utc>,
}

/// A title inside a list, annotated with the requesting user's viewing state
/// where one exists (left-join semantics)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ListEntry {
    pub title_id: i64,
    pub tmdb_id: i64,
    pub media_kind: MediaKind,
    pub name: String,
    pub original_name: String,
    pub release_date: Option<NaiveDate>,
    pub poster_path: Option<String>,
    pub overview: String,
    /// When the title was added to the list
    pub added_at: DateTime<Utc>,
    pub state: Option<WatchState>,
    pub rating: Option<i64>,
    pub comment: Option<String>,
    pub state_updated_at: Option<DateTime<Utc>>,
}

/// One row of the title-status view: a list containing the title, carrying the
/// user's single viewing-state record broadcast to every containing list
#[derive(Debug, Clone, Serialize)]
pub struct TitleStatus {
    pub list_id: i64,
    pub list_name: String,
    pub state: WatchState,
    pub rating: Option<i64>,
    pub comment: String,
}

/// An entry in a user's cross-list history view
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HistoryEntry {
    pub title_id: i64,
    pub tmdb_id: i64,
    pub media_kind: MediaKind,
    pub name: String,
    pub poster_path: Option<String>,
    pub state: WatchState,
    pub rating: Option<i64>,
    pub comment: String,
    pub updated_at: DateTime<Utc>,
}

/// Per-state count and average rating for a user's ledger
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StateStats {
    pub state: WatchState,
    pub count: i64,
    pub avg_rating: Option<f64>,
}

/// A registered user
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub default_list_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}
