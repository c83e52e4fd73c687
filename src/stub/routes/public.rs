use crate::stub::{StubState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token.
pub fn public_routes() -> Router<StubState> {
    Router::new()
        // GET /health
        .route("/health", get(|| async { "ok" }))
        // POST /auth/login
        .route("/auth/login", post(handlers::login))
}
