use std::collections::HashMap;

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    models::{
        ApiEnvelope, AppSettings, ArticlePayload, CleanupReport, CommentStatus, ContentStatus,
        LoginRequest, SessionUser, SystemStatus, UserStatus,
    },
    stub::{
        StubState,
        auth::{AuthUser, issue_token},
        repository::{CategoryInput, ContentPatch, Listing, ListQuery, NewUser, RepoError, UserPatch},
    },
    validation::{ALLOWED_IMAGE_TYPES, MAX_IMAGE_BYTES, MIN_PASSWORD_LEN},
};

// --- Envelope Responses ---

/// ApiError
///
/// A failed request, answered as `{ success: false, message }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Access denied. Admin privileges required.")
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiEnvelope::<Value>::failure(self.message))).into_response()
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        let status = match err {
            RepoError::NotFound(_) => StatusCode::NOT_FOUND,
            RepoError::Conflict(_) => StatusCode::CONFLICT,
            RepoError::Invalid(_) => StatusCode::BAD_REQUEST,
        };
        Self::new(status, err.to_string())
    }
}

pub type ApiResult = Result<Json<ApiEnvelope<Value>>, ApiError>;

fn to_json<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::internal(e.to_string()))
}

/// `{ "<key>": value }`
fn keyed<T: Serialize>(key: &str, value: &T) -> Result<Value, ApiError> {
    let mut map = Map::new();
    map.insert(key.to_string(), to_json(value)?);
    Ok(Value::Object(map))
}

fn ok(data: Value) -> ApiResult {
    Ok(Json(ApiEnvelope::ok(data)))
}

fn ok_with_message(data: Value, message: &str) -> ApiResult {
    Ok(Json(ApiEnvelope::ok_with_message(data, message)))
}

fn listing<T: Serialize>(key: &str, listing: Listing<T>) -> ApiResult {
    let mut map = Map::new();
    map.insert(key.to_string(), to_json(&listing.items)?);
    map.insert("pagination".to_string(), to_json(&listing.pagination)?);
    ok(Value::Object(map))
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))
}

// --- Role Guards ---

fn require_console(user: &AuthUser) -> Result<(), ApiError> {
    if user.can_moderate() {
        Ok(())
    } else {
        Err(ApiError::forbidden())
    }
}

fn require_admin(user: &AuthUser) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden())
    }
}

/// Applies any latency registered for this search term.
async fn simulate_latency(state: &StubState, query: &ListQuery) {
    if let Some(delay) = query
        .search
        .as_deref()
        .and_then(|term| state.control.search_delay(term))
    {
        tokio::time::sleep(delay).await;
    }
}

// --- Auth ---

/// login
///
/// [Public Route] Exchanges email and password for a token.
pub async fn login(State(state): State<StubState>, Json(body): Json<LoginRequest>) -> ApiResult {
    let user = state
        .repo
        .authenticate(&body.email, &body.password)
        .await
        .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "Invalid email or password"))?;

    if user.status != UserStatus::Active {
        return Err(ApiError::new(StatusCode::FORBIDDEN, "Account is not active"));
    }

    let token = issue_token(&state.config, &user, state.control.generation())
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let session_user = SessionUser {
        id: user.id,
        username: user.username,
        email: user.email,
        role: user.role,
    };

    let mut map = Map::new();
    map.insert("token".to_string(), Value::String(token));
    map.insert("user".to_string(), to_json(&session_user)?);
    ok_with_message(Value::Object(map), "Login successful")
}

/// profile
///
/// [Authenticated Route] The caller's identity.
pub async fn profile(user: AuthUser, State(state): State<StubState>) -> ApiResult {
    let stored = state
        .repo
        .get_user(&user.id)
        .await
        .ok_or(ApiError::new(StatusCode::UNAUTHORIZED, "User no longer exists"))?;

    let session_user = SessionUser {
        id: stored.id,
        username: stored.username,
        email: stored.email,
        role: stored.role,
    };
    ok(keyed("user", &session_user)?)
}

// --- Dashboard ---

pub async fn get_stats(
    user: AuthUser,
    State(state): State<StubState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult {
    require_console(&user)?;
    let period_days = match params.get("period").map(String::as_str) {
        None | Some("") => None,
        Some("7d") => Some(7),
        Some("30d") => Some(30),
        Some("90d") => Some(90),
        Some(other) => return Err(ApiError::bad_request(format!("Unknown period '{}'", other))),
    };
    ok(keyed("stats", &state.repo.stats(period_days).await)?)
}

pub async fn get_activity(user: AuthUser, State(state): State<StubState>) -> ApiResult {
    require_console(&user)?;
    ok(keyed("activities", &state.repo.activity(10).await)?)
}

pub async fn get_system_status(user: AuthUser, State(state): State<StubState>) -> ApiResult {
    require_console(&user)?;
    let status = SystemStatus {
        database: "connected".to_string(),
        uptime_seconds: state.control.uptime().as_secs(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    ok(keyed("status", &status)?)
}

// --- Users (admin only) ---

/// Form-only fields that must never reach the server.
fn reject_form_only_fields(body: &Value) -> Result<(), ApiError> {
    if body.get("confirmPassword").is_some() {
        return Err(ApiError::bad_request("Unexpected field: confirmPassword"));
    }
    Ok(())
}

fn check_password(password: Option<&str>) -> Result<(), ApiError> {
    match password {
        Some(p) if !p.is_empty() && p.chars().count() < MIN_PASSWORD_LEN => Err(ApiError::bad_request(
            format!("Password must be at least {} characters long", MIN_PASSWORD_LEN),
        )),
        _ => Ok(()),
    }
}

pub async fn list_users(
    user: AuthUser,
    State(state): State<StubState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult {
    require_admin(&user)?;
    let query = ListQuery::from_params(params);
    simulate_latency(&state, &query).await;
    listing("users", state.repo.list_users(&query).await)
}

pub async fn create_user(
    user: AuthUser,
    State(state): State<StubState>,
    Json(body): Json<Value>,
) -> ApiResult {
    require_admin(&user)?;
    reject_form_only_fields(&body)?;
    let new_user: NewUser = parse_body(body)?;
    if new_user.password.is_empty() {
        return Err(ApiError::bad_request("Password is required"));
    }
    check_password(Some(&new_user.password))?;

    let created = state.repo.create_user(new_user).await?;
    ok_with_message(keyed("user", &created)?, "User created successfully")
}

pub async fn update_user(
    user: AuthUser,
    State(state): State<StubState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult {
    require_admin(&user)?;
    reject_form_only_fields(&body)?;
    let patch: UserPatch = parse_body(body)?;
    check_password(patch.password.as_deref())?;

    let updated = state.repo.update_user(&id, patch).await?;
    ok_with_message(keyed("user", &updated)?, "User updated successfully")
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: UserStatus,
}

pub async fn set_user_status(
    user: AuthUser,
    State(state): State<StubState>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> ApiResult {
    require_admin(&user)?;
    if id == user.id && body.status != UserStatus::Active {
        return Err(ApiError::bad_request("You cannot deactivate your own account"));
    }
    let patch = UserPatch {
        status: Some(body.status),
        ..UserPatch::default()
    };
    let updated = state.repo.update_user(&id, patch).await?;
    ok_with_message(keyed("user", &updated)?, "User status updated")
}

pub async fn delete_user(
    user: AuthUser,
    State(state): State<StubState>,
    Path(id): Path<String>,
) -> ApiResult {
    require_admin(&user)?;
    if id == user.id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }
    state.repo.delete_user(&id).await?;
    ok_with_message(Value::Null, "User deleted successfully")
}

// --- Content ---

pub async fn list_content(
    user: AuthUser,
    State(state): State<StubState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult {
    require_console(&user)?;
    let query = ListQuery::from_params(params);
    simulate_latency(&state, &query).await;
    listing("content", state.repo.list_content(&query).await)
}

pub async fn get_content(
    user: AuthUser,
    State(state): State<StubState>,
    Path(id): Path<String>,
) -> ApiResult {
    require_console(&user)?;
    let article = state.repo.get_article(&id).await?;
    ok(keyed("content", &article)?)
}

fn article_from_patch(patch: ContentPatch) -> Result<ArticlePayload, ApiError> {
    let title = patch
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("Title is required"))?;
    Ok(ArticlePayload {
        title,
        content: patch.content.unwrap_or_default(),
        excerpt: patch.excerpt,
        category: patch.category,
        tags: patch.tags.unwrap_or_default(),
        status: patch.status.unwrap_or(ContentStatus::Draft),
    })
}

/// create_content
///
/// [Authenticated Route] `POST /content` (editor) and `POST /admin/content`
/// (table form) share this handler.
pub async fn create_content(
    user: AuthUser,
    State(state): State<StubState>,
    Json(body): Json<Value>,
) -> ApiResult {
    require_console(&user)?;
    let article = article_from_patch(parse_body(body)?)?;
    let created = state.repo.create_article(article, &user.username).await;
    ok_with_message(keyed("content", &created)?, "Content created successfully")
}

pub async fn update_content(
    user: AuthUser,
    State(state): State<StubState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult {
    require_console(&user)?;
    let patch: ContentPatch = parse_body(body)?;
    let updated = state.repo.update_article(&id, patch).await?;
    ok_with_message(keyed("content", &updated)?, "Content updated successfully")
}

pub async fn delete_content(
    user: AuthUser,
    State(state): State<StubState>,
    Path(id): Path<String>,
) -> ApiResult {
    require_console(&user)?;
    state.repo.delete_article(&id).await?;
    ok_with_message(Value::Null, "Content deleted successfully")
}

// --- Comments ---

pub async fn list_comments(
    user: AuthUser,
    State(state): State<StubState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult {
    require_console(&user)?;
    let query = ListQuery::from_params(params);
    simulate_latency(&state, &query).await;
    listing("comments", state.repo.list_comments(&query).await)
}

pub async fn approve_comment(
    user: AuthUser,
    State(state): State<StubState>,
    Path(id): Path<String>,
) -> ApiResult {
    require_console(&user)?;
    let comment = state.repo.set_comment_status(&id, CommentStatus::Approved).await?;
    ok_with_message(keyed("comment", &comment)?, "Comment approved")
}

pub async fn reject_comment(
    user: AuthUser,
    State(state): State<StubState>,
    Path(id): Path<String>,
) -> ApiResult {
    require_console(&user)?;
    let comment = state.repo.set_comment_status(&id, CommentStatus::Rejected).await?;
    ok_with_message(keyed("comment", &comment)?, "Comment rejected")
}

pub async fn delete_comment(
    user: AuthUser,
    State(state): State<StubState>,
    Path(id): Path<String>,
) -> ApiResult {
    require_console(&user)?;
    state.repo.delete_comment(&id).await?;
    ok_with_message(Value::Null, "Comment deleted successfully")
}

// --- Categories ---

/// list_categories
///
/// Not paginated: the whole collection in one response.
pub async fn list_categories(
    user: AuthUser,
    State(state): State<StubState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult {
    require_console(&user)?;
    let query = ListQuery::from_params(params);
    ok(keyed("categories", &state.repo.list_categories(&query).await)?)
}

pub async fn create_category(
    user: AuthUser,
    State(state): State<StubState>,
    Json(body): Json<CategoryInput>,
) -> ApiResult {
    require_console(&user)?;
    let created = state.repo.create_category(body).await?;
    ok_with_message(keyed("category", &created)?, "Category created successfully")
}

pub async fn update_category(
    user: AuthUser,
    State(state): State<StubState>,
    Path(id): Path<String>,
    Json(body): Json<CategoryInput>,
) -> ApiResult {
    require_console(&user)?;
    let updated = state.repo.update_category(&id, body).await?;
    ok_with_message(keyed("category", &updated)?, "Category updated successfully")
}

pub async fn delete_category(
    user: AuthUser,
    State(state): State<StubState>,
    Path(id): Path<String>,
) -> ApiResult {
    require_console(&user)?;
    state.repo.delete_category(&id).await?;
    ok_with_message(Value::Null, "Category deleted successfully")
}

// --- Settings & Maintenance (admin only) ---

pub async fn get_settings(user: AuthUser, State(state): State<StubState>) -> ApiResult {
    require_admin(&user)?;
    ok(keyed("settings", &state.repo.settings().await)?)
}

pub async fn update_settings(
    user: AuthUser,
    State(state): State<StubState>,
    Json(settings): Json<AppSettings>,
) -> ApiResult {
    require_admin(&user)?;
    if settings.site_name.trim().is_empty() {
        return Err(ApiError::bad_request("Site name is required"));
    }
    if !(1..=100).contains(&settings.posts_per_page) {
        return Err(ApiError::bad_request("Posts per page must be between 1 and 100"));
    }
    let saved = state.repo.save_settings(settings).await;
    ok_with_message(keyed("settings", &saved)?, "Settings saved successfully")
}

pub async fn cleanup(user: AuthUser, State(state): State<StubState>) -> ApiResult {
    require_admin(&user)?;
    let removed = state.repo.cleanup().await;
    ok(keyed("cleanup", &CleanupReport { removed })?)
}

pub async fn export(user: AuthUser, State(state): State<StubState>) -> ApiResult {
    require_admin(&user)?;
    ok(keyed("export", &state.repo.export().await)?)
}

// --- Media ---

/// upload_image
///
/// [Authenticated Route] Multipart upload; the file travels in the `image`
/// field. Type and size are checked again here.
pub async fn upload_image(
    user: AuthUser,
    State(state): State<StubState>,
    mut multipart: Multipart,
) -> ApiResult {
    require_console(&user)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
            return Err(ApiError::bad_request("Only image files are allowed"));
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        if bytes.is_empty() {
            return Err(ApiError::bad_request("Uploaded file is empty"));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "Image size must be less than 5MB"));
        }

        let image = state.repo.store_image(&filename).await;
        tracing::info!(user = %user.username, file = %image.filename, size = bytes.len(), "Image stored");
        return ok_with_message(keyed("image", &image)?, "Image uploaded successfully");
    }

    Err(ApiError::bad_request("No image provided"))
}
