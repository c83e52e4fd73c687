use crate::stub::{StubState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Everything the console manages. Moderators reach content, comments,
/// categories and the dashboard; users, settings and maintenance are
/// admin-only.
pub fn admin_routes() -> Router<StubState> {
    Router::new()
        // --- Dashboard ---
        .route("/stats", get(handlers::get_stats))
        .route("/activity", get(handlers::get_activity))
        .route("/system-status", get(handlers::get_system_status))
        // --- Users ---
        .route("/users", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/users/{id}",
            put(handlers::update_user).delete(handlers::delete_user),
        )
        .route("/users/{id}/status", put(handlers::set_user_status))
        // --- Content ---
        .route(
            "/content",
            get(handlers::list_content).post(handlers::create_content),
        )
        .route(
            "/content/{id}",
            get(handlers::get_content)
                .put(handlers::update_content)
                .delete(handlers::delete_content),
        )
        // --- Comments ---
        .route("/comments", get(handlers::list_comments))
        .route("/comments/{id}", axum::routing::delete(handlers::delete_comment))
        .route("/comments/{id}/approve", put(handlers::approve_comment))
        .route("/comments/{id}/reject", put(handlers::reject_comment))
        // --- Categories ---
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/categories/{id}",
            put(handlers::update_category).delete(handlers::delete_category),
        )
        // --- Settings & Maintenance ---
        .route(
            "/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        .route("/cleanup", post(handlers::cleanup))
        .route("/export", post(handlers::export))
}
