use std::env;
use std::sync::Arc;

use admin_console::{
    config::{ConsoleConfig, Env},
    stub::{
        StubConfig, StubControl, StubState, create_router,
        repository::{InMemoryRepository, RepositoryState, SEED_ADMIN, SEED_MODERATOR},
    },
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Serves the seeded stub API for local development. Binds `STUB_ADDR`
/// (default `127.0.0.1:5000`), which matches the console's local default
/// `API_BASE_URL`.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let config = ConsoleConfig::load();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "admin_console=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    let state = StubState {
        repo: Arc::new(InMemoryRepository::seeded()) as RepositoryState,
        config: StubConfig::load(),
        control: StubControl::default(),
    };
    let app = create_router(state);

    let addr = env::var("STUB_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .expect("FATAL: Failed to bind the stub backend address. Check STUB_ADDR.");

    tracing::info!("Stub backend listening on http://{}/api", addr);
    tracing::info!("Seeded admin: {} / {}", SEED_ADMIN.0, SEED_ADMIN.1);
    tracing::info!("Seeded moderator: {} / {}", SEED_MODERATOR.0, SEED_MODERATOR.1);

    axum::serve(listener, app)
        .await
        .expect("FATAL: Stub backend stopped unexpectedly.");
}
