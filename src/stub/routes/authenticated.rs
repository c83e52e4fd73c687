use crate::{
    stub::{StubState, handlers},
    validation::MAX_IMAGE_BYTES,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Endpoints for any signed-in account. The article editor saves and uploads
/// through here rather than through `/admin`.
pub fn authenticated_routes() -> Router<StubState> {
    Router::<StubState>::new()
        // GET /auth/profile
        .route("/auth/profile", get(handlers::profile))
        // POST /content, PUT /content/{id}
        .route("/content", post(handlers::create_content))
        .route("/content/{id}", put(handlers::update_content))
        // POST /upload/image (multipart, field `image`)
        // Body cap sits above MAX_IMAGE_BYTES; the handler enforces the real limit.
        .route(
            "/upload/image",
            post(handlers::upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES * 2)),
        )
}
