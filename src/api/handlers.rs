use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::{MediaKind, Visibility, WatchState};
use crate::services::tracker;
use crate::store::{items, lists, titles, users, viewing};

use super::extract::{AuthUser, MaybeUser};
use super::AppState;

// Request types
//
// Required fields are Options validated by hand so a missing field surfaces
// as a 400 with a readable message instead of a body-rejection status.

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct CreateListRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    pub visibility: Option<String>,
    /// Make the new list the user's default
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateListRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub visibility: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddOwnerRequest {
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddToListRequest {
    pub list_id: Option<i64>,
    pub state: Option<String>,
    pub rating: Option<i64>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct StateRequest {
    pub state: Option<String>,
    pub rating: Option<i64>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub state: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn require<T>(value: Option<T>, field: &str) -> AppResult<T> {
    value.ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

/// Verifies the acting user may mutate the list. Distinguishes a missing
/// list (404) from a list owned by someone else (403).
async fn require_owner(state: &AppState, list_id: i64, user_id: i64) -> AppResult<()> {
    if lists::find(&state.pool, list_id).await?.is_none() {
        return Err(AppError::NotFound("List not found".to_string()));
    }
    if !lists::is_owner(&state.pool, list_id, user_id).await? {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Registers a user; their default private list is seeded in the same
/// transaction
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let email = require(request.email, "email")?;
    let name = require(request.name, "name")?;

    let user = users::create(&state.pool, &email, &name).await?;

    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

/// Proxies a catalog search; open to anonymous visitors
pub async fn search(
    State(state): State<AppState>,
    MaybeUser(_): MaybeUser,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Value>> {
    if params.q.trim().is_empty() {
        return Err(AppError::Validation("Search query is required".to_string()));
    }

    let results = state.catalog.search(&params.q, params.page).await?;

    Ok(Json(json!({ "results": results })))
}

/// Locally cached titles ordered by how many lists reference them
pub async fn popular_titles(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<Value>> {
    let titles = titles::popular(&state.pool, params.limit).await?;
    Ok(Json(json!({ "titles": titles })))
}

/// All lists owned by the requesting user
pub async fn my_lists(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Value>> {
    let lists = lists::for_user(&state.pool, user_id).await?;
    Ok(Json(json!({ "lists": lists })))
}

/// Creates a list owned by the requesting user
pub async fn create_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<CreateListRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let name = require(request.name, "name")?;
    let visibility = match request.visibility.as_deref() {
        Some(raw) => raw.parse()?,
        None => Visibility::Private,
    };

    let list_id = lists::create(
        &state.pool,
        user_id,
        &name,
        &request.description,
        visibility,
    )
    .await?;

    if request.is_default {
        users::set_default_list(&state.pool, user_id, list_id).await?;
    }

    Ok((StatusCode::CREATED, Json(json!({ "list_id": list_id }))))
}

/// Renames a list; owner only
pub async fn update_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(list_id): Path<i64>,
    Json(request): Json<UpdateListRequest>,
) -> AppResult<Json<Value>> {
    let name = require(request.name, "name")?;
    require_owner(&state, list_id, user_id).await?;

    lists::update(&state.pool, list_id, &name, &request.description).await?;

    Ok(Json(json!({ "success": true })))
}

/// Switches a list between private and public; owner only
pub async fn set_list_visibility(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(list_id): Path<i64>,
    Json(request): Json<VisibilityRequest>,
) -> AppResult<Json<Value>> {
    let visibility: Visibility = require(request.visibility, "visibility")?.parse()?;
    require_owner(&state, list_id, user_id).await?;

    lists::set_visibility(&state.pool, list_id, visibility).await?;

    Ok(Json(json!({ "success": true })))
}

/// Deletes a list; owner only. Title records survive.
pub async fn delete_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(list_id): Path<i64>,
) -> AppResult<Json<Value>> {
    require_owner(&state, list_id, user_id).await?;

    lists::delete(&state.pool, list_id).await?;

    Ok(Json(json!({ "success": true })))
}

/// Owners of a list; readable by anyone who may read the list
pub async fn list_owners(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(list_id): Path<i64>,
) -> AppResult<Json<Value>> {
    if !lists::can_access(&state.pool, list_id, user_id).await? {
        return Err(AppError::Forbidden);
    }

    let owners = lists::owners(&state.pool, list_id).await?;
    Ok(Json(json!({ "owners": owners })))
}

/// Grants co-ownership; owner only
pub async fn add_list_owner(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(list_id): Path<i64>,
    Json(request): Json<AddOwnerRequest>,
) -> AppResult<Json<Value>> {
    let new_owner = require(request.user_id, "user_id")?;
    require_owner(&state, list_id, user_id).await?;

    if users::find(&state.pool, new_owner).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    lists::add_owner(&state.pool, list_id, new_owner).await?;

    Ok(Json(json!({ "success": true })))
}

/// Revokes co-ownership; owner only
pub async fn remove_list_owner(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((list_id, owner_id)): Path<(i64, i64)>,
) -> AppResult<Json<Value>> {
    require_owner(&state, list_id, user_id).await?;

    lists::remove_owner(&state.pool, list_id, owner_id).await?;

    Ok(Json(json!({ "success": true })))
}

/// Titles in a list, annotated with the requesting user's viewing state.
/// With `?state=`, filters to that state while keeping never-stated titles.
pub async fn list_items(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(list_id): Path<i64>,
    Query(params): Query<ListItemsQuery>,
) -> AppResult<Json<Value>> {
    let filter = params
        .state
        .as_deref()
        .map(str::parse::<WatchState>)
        .transpose()?;

    if !lists::can_access(&state.pool, list_id, user_id).await? {
        return Err(AppError::Forbidden);
    }

    let entries = items::entries(&state.pool, list_id, filter, Some(user_id)).await?;

    Ok(Json(json!({ "items": entries })))
}

/// Resolves a catalog item and adds it to a list the user owns, recording
/// the user's initial viewing state in the same transaction
pub async fn add_to_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((tmdb_id, media_kind)): Path<(i64, String)>,
    Json(request): Json<AddToListRequest>,
) -> AppResult<Json<Value>> {
    let kind: MediaKind = media_kind.parse()?;
    let list_id = require(request.list_id, "list_id")?;
    let watch_state = match request.state.as_deref() {
        Some(raw) => raw.parse()?,
        None => WatchState::Want,
    };

    require_owner(&state, list_id, user_id).await?;

    let title_id = tracker::add_title_to_list(
        &state.pool,
        state.catalog.as_ref(),
        user_id,
        list_id,
        tmdb_id,
        kind,
        watch_state,
        request.rating,
        &request.comment,
    )
    .await?;

    Ok(Json(json!({ "success": true, "title_id": title_id })))
}

/// Overwrites the user's viewing state for a title. Per-user, so no list
/// ownership is involved.
pub async fn update_title_state(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(title_id): Path<i64>,
    Json(request): Json<StateRequest>,
) -> AppResult<Json<Value>> {
    let watch_state: WatchState = require(request.state, "state")?.parse()?;

    tracker::update_state(
        &state.pool,
        user_id,
        title_id,
        watch_state,
        request.rating,
        &request.comment,
    )
    .await?;

    Ok(Json(json!({ "success": true })))
}

/// The user's viewing state for a title; null when never stated
pub async fn get_title_state(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(title_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let record = viewing::get(&state.pool, user_id, title_id).await?;
    Ok(Json(json!({ "state": record })))
}

/// Drops the user's viewing state for a title; idempotent
pub async fn clear_title_state(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(title_id): Path<i64>,
) -> AppResult<Json<Value>> {
    viewing::clear(&state.pool, user_id, title_id).await?;
    Ok(Json(json!({ "success": true })))
}

/// Which of the user's lists contain the title, each carrying the user's
/// single state/rating/comment record
pub async fn title_status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(title_id): Path<i64>,
) -> AppResult<Json<Value>> {
    if titles::find(&state.pool, title_id).await?.is_none() {
        return Err(AppError::NotFound("Title not found".to_string()));
    }

    let status = viewing::title_status(&state.pool, user_id, title_id).await?;

    Ok(Json(json!({ "status": status })))
}

/// Removes a title from one list; the viewing state and other memberships
/// are untouched
pub async fn remove_from_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((title_id, list_id)): Path<(i64, i64)>,
) -> AppResult<Json<Value>> {
    require_owner(&state, list_id, user_id).await?;

    items::remove(&state.pool, list_id, title_id).await?;

    Ok(Json(json!({ "success": true })))
}

/// Paginated history of the user's titles in one state, across all lists
pub async fn user_titles(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<HistoryQuery>,
) -> AppResult<Json<Value>> {
    let watch_state: WatchState = require(params.state, "state")?.parse()?;

    let entries = viewing::by_state(
        &state.pool,
        user_id,
        watch_state,
        params.limit,
        params.offset,
    )
    .await?;

    Ok(Json(json!({ "items": entries })))
}

/// The user's most recently touched titles across all states
pub async fn user_activity(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<Value>> {
    let entries = viewing::recent(&state.pool, user_id, params.limit).await?;
    Ok(Json(json!({ "items": entries })))
}

/// Per-state counts and average ratings for the user's ledger
pub async fn user_stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Value>> {
    let stats = viewing::stats(&state.pool, user_id).await?;
    Ok(Json(json!({ "stats": stats })))
}
