use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

// --- Response Envelope ---

/// ApiEnvelope
///
/// The envelope every endpoint answers with:
/// `{ success, data?, message?, errors? }`. A 2xx status with `success: false`
/// is still a failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Value>>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            errors: None,
        }
    }
}

// --- Pagination ---

/// WirePagination
///
/// The `pagination` block of a list response. Backends are inconsistent about
/// which fields they fill in, so everything defaults.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default, PartialEq)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WirePagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub limit: u32,
}

/// total_pages
///
/// `ceil(total_items / page_size)`, saturating at `u32::MAX`. A zero page
/// size yields zero pages.
pub fn total_pages(total_items: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    u32::try_from(total_items.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX)
}

/// Page
///
/// One fetched page of a resource collection. Produced fresh by every list
/// request and replaced wholesale, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    pub page: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Builds a page from decoded items and the optional wire pagination block.
    /// Missing totals are derived from what is known: the item count and the
    /// requested page size.
    pub fn from_wire(
        items: Vec<T>,
        pagination: Option<WirePagination>,
        requested_page: u32,
        page_size: u32,
    ) -> Self {
        match pagination {
            Some(p) => {
                let total_items = if p.total == 0 && p.pages > 0 {
                    items.len() as u64
                } else {
                    p.total
                };
                let limit = if p.limit > 0 { p.limit } else { page_size };
                let pages = if p.pages > 0 {
                    p.pages
                } else {
                    total_pages(total_items, limit)
                };
                Self {
                    items,
                    total_items,
                    page: if p.page > 0 { p.page } else { requested_page.max(1) },
                    total_pages: pages,
                }
            }
            // Unpaginated collections (categories) arrive as one page.
            None => {
                let total_items = items.len() as u64;
                Self {
                    items,
                    total_items,
                    page: 1,
                    total_pages: u32::from(total_items > 0),
                }
            }
        }
    }
}

// --- Identity ---

/// Role
///
/// RBAC role of the signed-in user. Only `admin` and `moderator` may use the console.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, Default, PartialEq, Eq)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn can_access_console(self) -> bool {
        matches!(self, Role::Admin | Role::Moderator)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

/// SessionUser
///
/// The identity returned by `/auth/profile` and the login exchange.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default, PartialEq)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
}

/// LoginRequest
///
/// Body of `POST /auth/login`. The password is passed straight through and
/// never stored or logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// LoginResponse
///
/// `data` of a successful login exchange.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub user: SessionUser,
}

// --- Managed Resources ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, Default, PartialEq, Eq)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
    Banned,
}

impl UserStatus {
    /// The status the row's toggle button switches to.
    pub fn toggled(self) -> Self {
        match self {
            UserStatus::Active => UserStatus::Inactive,
            UserStatus::Inactive | UserStatus::Banned => UserStatus::Active,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Banned => "banned",
        }
    }
}

/// AdminUser
///
/// A row of the users table (`GET /admin/users`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default, PartialEq)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    #[serde(alias = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, Default, PartialEq, Eq)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl ContentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Published => "published",
            ContentStatus::Archived => "archived",
        }
    }
}

/// ContentItem
///
/// A row of the content table (`GET /admin/content`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default, PartialEq)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: ContentStatus,
    #[serde(default)]
    pub views: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, Default, PartialEq, Eq)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl CommentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CommentStatus::Pending => "pending",
            CommentStatus::Approved => "approved",
            CommentStatus::Rejected => "rejected",
        }
    }
}

/// CommentItem
///
/// A row of the moderation queue (`GET /admin/comments`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default, PartialEq)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CommentItem {
    #[serde(alias = "_id")]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub author: Option<String>,
    // Title of the article the comment was posted on.
    #[serde(default)]
    pub article: Option<String>,
    #[serde(default)]
    pub status: CommentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Category
///
/// A content category (`GET /admin/categories`). Not paginated.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default, PartialEq)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub post_count: u64,
}

// --- Dashboard Widgets ---

/// DashboardStats
///
/// `GET /admin/stats`. Also used by the analytics section with a `period`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default, PartialEq)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub total_content: u64,
    #[serde(default)]
    pub total_comments: u64,
    #[serde(default)]
    pub pending_comments: u64,
    #[serde(default)]
    pub total_views: u64,
    #[serde(default)]
    pub new_users: u64,
}

/// ActivityEntry
///
/// One line of the recent-activity feed (`GET /admin/activity`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(default)]
    pub user: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// SystemStatus
///
/// `GET /admin/system-status`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default, PartialEq)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub database: String,
    #[serde(default)]
    pub uptime_seconds: u64,
    #[serde(default)]
    pub version: String,
}

/// AppSettings
///
/// Site-wide settings (`GET/PUT /admin/settings`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub site_name: String,
    pub allow_registration: bool,
    pub comments_require_approval: bool,
    pub posts_per_page: u32,
    pub maintenance_mode: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            site_name: "Content Platform".to_string(),
            allow_registration: true,
            comments_require_approval: true,
            posts_per_page: 10,
            maintenance_mode: false,
        }
    }
}

/// CleanupReport
///
/// `data` of `POST /admin/cleanup`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default, PartialEq)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    #[serde(default)]
    pub removed: u64,
}

/// ExportReport
///
/// `data` of `POST /admin/export`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default, PartialEq)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ExportReport {
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub records: u64,
}

// --- Article Editor ---

/// ArticlePayload
///
/// Body of `POST /content` and `PUT /content/{id}`.
///
/// `excerpt` and `category` use `skip_serializing_if` so an untouched field is
/// left alone by the server on update.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default, PartialEq)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePayload {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: ContentStatus,
}

/// UploadedImage
///
/// `data` of `POST /upload/image`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default, PartialEq)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub url: String,
    #[serde(default)]
    pub filename: String,
}
