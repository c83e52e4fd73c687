use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use reqwest::{Method, RequestBuilder, StatusCode, multipart::Form};
use serde_json::{Map, Value};

use crate::{
    config::ConsoleConfig,
    error::{ConsoleError, Result},
    models::{ApiEnvelope, LoginRequest, LoginResponse, SessionUser},
};

/// Storage key the bearer token lives under.
pub const TOKEN_KEY: &str = "adminToken";

// --- Durable Token Storage ---

/// TokenStore
///
/// Durable, key-value token storage that survives restarts of the console.
/// Only `AuthSession` writes to it: on login, logout and 401.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// FileTokenStore
///
/// Keeps a small JSON object on disk and stores the token under `TOKEN_KEY`.
/// Other keys in the file are preserved.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Map<String, Value> {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str::<Map<String, Value>>(&raw).ok())
            .unwrap_or_default()
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(map)?)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        self.read_map()
            .get(TOKEN_KEY)
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    }

    fn save(&self, token: &str) -> Result<()> {
        let mut map = self.read_map();
        map.insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
        self.write_map(&map)
    }

    fn clear(&self) -> Result<()> {
        let mut map = self.read_map();
        if map.remove(TOKEN_KEY).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// MemoryTokenStore
///
/// Process-local store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.lock().clone()
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.token.lock() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.lock() = None;
        Ok(())
    }
}

pub type TokenStoreState = Arc<dyn TokenStore>;

// --- Forced Logout ---

/// Navigator
///
/// The side effect of a forced logout: sending the user back to the login
/// entry point. Called after the token has already been cleared.
pub trait Navigator: Send + Sync {
    fn to_login(&self);
}

/// LoggingNavigator
///
/// Headless navigator: there is no page to redirect, so it tells the operator
/// to sign in again.
#[derive(Debug, Default, Clone)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn to_login(&self) {
        tracing::warn!("Session ended. Run `admin-console login` to sign in again.");
    }
}

pub type NavigatorState = Arc<dyn Navigator>;

// --- Session ---

/// Session
///
/// A verified login: the bearer token plus the identity it resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
}

struct SessionInner {
    http: reqwest::Client,
    config: ConsoleConfig,
    store: TokenStoreState,
    navigator: NavigatorState,
    token: RwLock<Option<String>>,
    user: RwLock<Option<SessionUser>>,
}

/// AuthSession
///
/// The single owner of the bearer token. Every authenticated request goes
/// through here, so this is also the one place a 401 is turned into a forced
/// logout. Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<SessionInner>,
}

impl AuthSession {
    /// new
    ///
    /// Builds the session and picks up any token left in durable storage. The
    /// token is not trusted until `restore` has verified it.
    pub fn new(config: ConsoleConfig, store: TokenStoreState, navigator: NavigatorState) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let token = store.load();

        Ok(Self {
            inner: Arc::new(SessionInner {
                http,
                config,
                store,
                navigator,
                token: RwLock::new(token),
                user: RwLock::new(None),
            }),
        })
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.inner.config
    }

    pub fn token(&self) -> Option<String> {
        self.inner.token.read().clone()
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.inner.user.read().clone()
    }

    pub fn current(&self) -> Option<Session> {
        let token = self.token()?;
        let user = self.user()?;
        Some(Session { token, user })
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.token.read().is_some()
    }

    /// login
    ///
    /// Exchanges credentials for a token at `POST /auth/login`. A rejected
    /// login is a `RequestFailed` (wrong password), not a forced logout.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let body = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };

        let response = self
            .inner
            .http
            .post(self.inner.config.url("/auth/login"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let data = read_envelope(status, response).await?;
        let login: LoginResponse = serde_json::from_value(data)?;

        if !login.user.role.can_access_console() {
            return Err(ConsoleError::RequestFailed {
                status: StatusCode::FORBIDDEN.as_u16(),
                message: "Access denied. Admin privileges required.".to_string(),
            });
        }

        self.inner.store.save(&login.token)?;
        *self.inner.token.write() = Some(login.token.clone());
        *self.inner.user.write() = Some(login.user.clone());

        tracing::info!(user_id = %login.user.id, role = login.user.role.as_str(), "Signed in");

        Ok(Session {
            token: login.token,
            user: login.user,
        })
    }

    /// restore
    ///
    /// Verifies a stored token against `GET /auth/profile`. Returns `Ok(None)`
    /// when there is nothing to restore. A valid token whose user may not use
    /// the console is logged out like a 401.
    pub async fn restore(&self) -> Result<Option<Session>> {
        if self.token().is_none() {
            return Ok(None);
        }

        let data = self
            .authenticated_request(Method::GET, "/auth/profile", None)
            .await?;
        let user: SessionUser = serde_json::from_value(unwrap_key(data, "user"))?;

        if !user.role.can_access_console() {
            tracing::warn!(user_id = %user.id, role = user.role.as_str(), "Account lacks console access");
            self.force_logout();
            return Err(ConsoleError::Unauthorized);
        }

        *self.inner.user.write() = Some(user);
        Ok(self.current())
    }

    /// logout
    ///
    /// Voluntary sign-out. Clears memory and storage, then navigates to login.
    pub fn logout(&self) {
        tracing::info!("Signing out");
        self.force_logout();
    }

    /// Sends the user to the login entry point; the session is left as is.
    pub fn to_login(&self) {
        self.inner.navigator.to_login();
    }

    fn force_logout(&self) {
        self.inner.token.write().take();
        self.inner.user.write().take();
        if let Err(e) = self.inner.store.clear() {
            tracing::error!("Failed to clear stored token: {}", e);
        }
        self.inner.navigator.to_login();
    }

    /// authenticated_request
    ///
    /// Sends `method path` with an optional JSON body and the bearer token.
    /// Returns the envelope's `data` (or `Null` when absent).
    pub async fn authenticated_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let mut builder = self.inner.http.request(method, self.inner.config.url(path));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.dispatch(builder).await
    }

    /// authenticated_get
    ///
    /// GET with query parameters, used by every list call.
    pub async fn authenticated_get(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        let builder = self
            .inner
            .http
            .get(self.inner.config.url(path))
            .query(query);
        self.dispatch(builder).await
    }

    /// authenticated_upload
    ///
    /// Multipart POST (media upload).
    pub async fn authenticated_upload(&self, path: &str, form: Form) -> Result<Value> {
        let builder = self
            .inner
            .http
            .post(self.inner.config.url(path))
            .multipart(form);
        self.dispatch(builder).await
    }

    async fn dispatch(&self, builder: RequestBuilder) -> Result<Value> {
        let Some(token) = self.token() else {
            tracing::warn!("Authenticated request attempted without a session");
            self.force_logout();
            return Err(ConsoleError::Unauthorized);
        };

        let response = builder.bearer_auth(&token).send().await?;
        let status = response.status();
        tracing::debug!(status = status.as_u16(), url = %response.url(), "Response received");

        if status == StatusCode::UNAUTHORIZED {
            // A late 401 for a token that has since been replaced must not
            // destroy the newer session.
            if self.token().as_deref() == Some(token.as_str()) {
                tracing::warn!("Server rejected the session token; forcing logout");
                self.force_logout();
            }
            return Err(ConsoleError::Unauthorized);
        }

        read_envelope(status, response).await
    }
}

/// read_envelope
///
/// Applies the envelope rules to a non-401 response: non-2xx or
/// `success: false` fail with the server's message when it sent one.
async fn read_envelope(status: StatusCode, response: reqwest::Response) -> Result<Value> {
    let raw = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiEnvelope<Value>>(&raw)
            .ok()
            .and_then(|envelope| envelope.message)
            .unwrap_or_default();
        return Err(ConsoleError::RequestFailed {
            status: status.as_u16(),
            message,
        });
    }

    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }

    let envelope: ApiEnvelope<Value> = serde_json::from_str(&raw)?;
    if !envelope.success {
        return Err(ConsoleError::RequestFailed {
            status: status.as_u16(),
            message: envelope.message.unwrap_or_default(),
        });
    }

    Ok(envelope.data.unwrap_or(Value::Null))
}

/// unwrap_key
///
/// Backends wrap single objects as `{ "<key>": {...} }`; accept both the
/// wrapped and the bare form.
pub(crate) fn unwrap_key(data: Value, key: &str) -> Value {
    match data {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    }
}
