use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Quiet period after the last keystroke before a search reload fires.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);
/// Lifetime of a toast before it removes itself.
pub const TOAST_TTL: Duration = Duration::from_secs(5);
/// Period of the article editor's auto-save tick.
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

/// ConsoleConfig
///
/// Holds the console's configuration. Immutable once loaded and cloned into
/// every component that needs it (session, controllers, editor).
#[derive(Clone, Debug)]
pub struct ConsoleConfig {
    // Base URL of the REST API, without a trailing slash (e.g. http://localhost:5000/api).
    pub api_base_url: String,
    // File backing the durable token storage.
    pub token_path: PathBuf,
    // Rows requested per page by every table.
    pub page_size: u32,
    // Per-request timeout for the HTTP client.
    pub request_timeout: Duration,
    pub search_debounce: Duration,
    pub toast_ttl: Duration,
    pub autosave_interval: Duration,
    // Runtime environment marker. Selects log format and fail-fast rules.
    pub env: Env,
}

/// Env
///
/// Runtime context: a local developer setup (stub backend, pretty logs) or a
/// production deployment (explicit API URL, JSON logs).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for ConsoleConfig {
    /// default
    ///
    /// Safe, non-panicking values for tests and local scaffolding.
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            token_path: PathBuf::from(".admin-console/storage.json"),
            page_size: 20,
            request_timeout: Duration::from_secs(30),
            search_debounce: SEARCH_DEBOUNCE,
            toast_ttl: TOAST_TTL,
            autosave_interval: AUTOSAVE_INTERVAL,
            env: Env::Local,
        }
    }
}

impl ConsoleConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in production when `API_BASE_URL` is missing, so the console never
    /// silently talks to a developer backend.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let api_base_url = match env {
            Env::Production => {
                env::var("API_BASE_URL").expect("FATAL: API_BASE_URL must be set in production.")
            }
            Env::Local => env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5000/api".to_string()),
        };

        let defaults = Self::default();

        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            token_path: env::var("ADMIN_TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.token_path),
            page_size: env::var("ADMIN_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.page_size),
            request_timeout: env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            env,
            ..defaults
        }
    }

    /// Joins an API path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }
}
