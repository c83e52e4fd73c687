//! In-process stand-in for the content platform's REST API.
//!
//! Serves every endpoint the console calls, backed by a seeded in-memory
//! store. Used by the integration tests and for local development
//! (`stub-backend` binary).

use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use axum::{
    Router,
    Json,
    extract::{FromRef, Request, State},
    http::{HeaderName, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

use crate::models::ApiEnvelope;

pub mod auth;
pub mod handlers;
pub mod repository;
pub mod routes;

use auth::AuthUser;
use repository::{InMemoryRepository, RepositoryState};
use routes::{admin, authenticated, public};

// --- Configuration ---

/// StubConfig
///
/// Token signing settings.
#[derive(Clone, Debug)]
pub struct StubConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "stub-backend-secret".to_string(),
            token_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl StubConfig {
    /// load
    ///
    /// `STUB_JWT_SECRET` and `STUB_TOKEN_TTL_SECS`, both optional.
    pub fn load() -> Self {
        let defaults = Self::default();
        Self {
            jwt_secret: env::var("STUB_JWT_SECRET").unwrap_or(defaults.jwt_secret),
            token_ttl: env::var("STUB_TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.token_ttl),
        }
    }
}

// --- Test Controls ---

struct ControlInner {
    requests: AtomicUsize,
    generation: AtomicU64,
    search_delays: Mutex<HashMap<String, Duration>>,
    failures: Mutex<HashMap<String, StatusCode>>,
    route_delays: Mutex<HashMap<(Method, String), Duration>>,
    started: Instant,
}

/// StubControl
///
/// Knobs and counters for driving the stub from a test: a request counter,
/// token revocation, per-search-term and per-route latency, and injected route
/// failures.
/// Clones share state.
#[derive(Clone)]
pub struct StubControl {
    inner: Arc<ControlInner>,
}

impl Default for StubControl {
    fn default() -> Self {
        Self {
            inner: Arc::new(ControlInner {
                requests: AtomicUsize::new(0),
                generation: AtomicU64::new(1),
                search_delays: Mutex::new(HashMap::new()),
                failures: Mutex::new(HashMap::new()),
                route_delays: Mutex::new(HashMap::new()),
                started: Instant::now(),
            }),
        }
    }
}

impl StubControl {
    /// Requests received so far, any route.
    pub fn request_count(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Invalidates every token issued so far.
    pub fn revoke_tokens(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Delays list responses whose search term equals `term`.
    pub fn delay_search(&self, term: &str, delay: Duration) {
        self.inner
            .search_delays
            .lock()
            .insert(term.trim().to_lowercase(), delay);
    }

    pub fn search_delay(&self, term: &str) -> Option<Duration> {
        self.inner.search_delays.lock().get(term).copied()
    }

    /// Answers every request to `path` (e.g. `/api/admin/activity`) with
    /// `status` and a failure envelope.
    pub fn fail_route(&self, path: &str, status: StatusCode) {
        self.inner.failures.lock().insert(path.to_string(), status);
    }

    /// Holds the response to every `method` request on `path` for `delay`.
    /// The handler runs first, so the response reflects state at arrival.
    pub fn delay_route(&self, method: Method, path: &str, delay: Duration) {
        self.inner
            .route_delays
            .lock()
            .insert((method, path.to_string()), delay);
    }

    fn route_delay(&self, method: &Method, path: &str) -> Option<Duration> {
        self.inner
            .route_delays
            .lock()
            .get(&(method.clone(), path.to_string()))
            .copied()
    }

    pub fn clear_failures(&self) {
        self.inner.failures.lock().clear();
    }

    fn injected_failure(&self, path: &str) -> Option<StatusCode> {
        self.inner.failures.lock().get(path).copied()
    }

    pub fn uptime(&self) -> Duration {
        self.inner.started.elapsed()
    }

    fn record_request(&self) {
        self.inner.requests.fetch_add(1, Ordering::SeqCst);
    }
}

// --- State ---

/// StubState
///
/// Shared state of the stub router: repository, signing config and controls.
#[derive(Clone)]
pub struct StubState {
    pub repo: RepositoryState,
    pub config: StubConfig,
    pub control: StubControl,
}

impl StubState {
    /// A fresh, seeded stub.
    pub fn seeded() -> Self {
        Self {
            repo: Arc::new(InMemoryRepository::seeded()) as RepositoryState,
            config: StubConfig::default(),
            control: StubControl::default(),
        }
    }
}

impl FromRef<StubState> for RepositoryState {
    fn from_ref(state: &StubState) -> RepositoryState {
        state.repo.clone()
    }
}

impl FromRef<StubState> for StubConfig {
    fn from_ref(state: &StubState) -> StubConfig {
        state.config.clone()
    }
}

impl FromRef<StubState> for StubControl {
    fn from_ref(state: &StubState) -> StubControl {
        state.control.clone()
    }
}

// --- Middleware ---

/// Rejects the request with 401 before the handler runs when there is no
/// valid token.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

async fn count_requests(State(control): State<StubControl>, request: Request, next: Next) -> Response {
    control.record_request();
    if let Some(status) = control.injected_failure(request.uri().path()) {
        tracing::debug!(path = %request.uri().path(), "Injected failure");
        return (status, Json(ApiEnvelope::<()>::failure("Injected failure"))).into_response();
    }
    let delay = control.route_delay(request.method(), request.uri().path());
    let response = next.run(request).await;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    response
}

// --- Router ---

/// create_router
///
/// The full API under `/api`, with request counting, request ids and tracing.
pub fn create_router(state: StubState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let protected = authenticated::authenticated_routes()
        .route_layer(require_auth.clone())
        .nest("/admin", admin::admin_routes().route_layer(require_auth));

    let api = Router::new()
        .merge(public::public_routes())
        .merge(protected)
        .with_state(state.clone());

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(state.control.clone(), count_requests))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "stub_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
