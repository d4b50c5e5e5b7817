use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Registration (identity itself lives with the session provider)
        .route("/api/users", post(handlers::register))
        // Catalog search proxy
        .route("/api/search", get(handlers::search))
        // Lists
        .route("/api/lists", get(handlers::my_lists))
        .route("/api/lists", post(handlers::create_list))
        .route("/api/lists/:list_id", put(handlers::update_list))
        .route("/api/lists/:list_id", delete(handlers::delete_list))
        .route(
            "/api/lists/:list_id/visibility",
            put(handlers::set_list_visibility),
        )
        .route("/api/lists/:list_id/items", get(handlers::list_items))
        .route("/api/lists/:list_id/owners", get(handlers::list_owners))
        .route("/api/lists/:list_id/owners", post(handlers::add_list_owner))
        .route(
            "/api/lists/:list_id/owners/:user_id",
            delete(handlers::remove_list_owner),
        )
        // Titles and viewing state
        .route("/api/titles/popular", get(handlers::popular_titles))
        // The first segment here is the catalog id, not a local title id; the
        // param name matches the sibling routes because the router requires
        // consistent names at the same position.
        .route(
            "/api/titles/:title_id/:media_kind/add-to-list",
            post(handlers::add_to_list),
        )
        .route(
            "/api/titles/:title_id/state",
            put(handlers::update_title_state),
        )
        .route(
            "/api/titles/:title_id/state",
            get(handlers::get_title_state),
        )
        .route(
            "/api/titles/:title_id/state",
            delete(handlers::clear_title_state),
        )
        .route("/api/titles/:title_id/status", get(handlers::title_status))
        .route(
            "/api/titles/:title_id/lists/:list_id",
            delete(handlers::remove_from_list),
        )
        // Cross-list views
        .route("/api/user/titles", get(handlers::user_titles))
        .route("/api/user/activity", get(handlers::user_activity))
        .route("/api/user/stats", get(handlers::user_stats))
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
