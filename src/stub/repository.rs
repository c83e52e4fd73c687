use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::{
    models::{
        ActivityEntry, AdminUser, AppSettings, ArticlePayload, Category, CommentItem,
        CommentStatus, ContentItem, ContentStatus, DashboardStats, ExportReport, Role,
        UploadedImage, UserStatus, WirePagination, total_pages,
    },
    validation::slugify,
};

/// RepoError
///
/// Failures the handlers translate into HTTP statuses.
#[derive(Debug, Error, PartialEq)]
pub enum RepoError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Invalid(String),
}

// --- Query & Listing ---

/// ListQuery
///
/// Parsed list query: `page`, `limit`, `search`, and every other parameter as
/// an exact-match field filter.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub filters: BTreeMap<String, String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            search: None,
            filters: BTreeMap::new(),
        }
    }
}

impl ListQuery {
    pub fn from_params(mut params: HashMap<String, String>) -> Self {
        let defaults = Self::default();
        let page = params
            .remove("page")
            .and_then(|p| p.parse::<u32>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(defaults.page);
        let limit = params
            .remove("limit")
            .and_then(|l| l.parse::<u32>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(defaults.limit);
        let search = params
            .remove("search")
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        Self {
            page,
            limit,
            search,
            filters: params
                .into_iter()
                .filter(|(_, v)| !v.is_empty())
                .collect(),
        }
    }

    fn matches_text(&self, haystacks: &[&str]) -> bool {
        match &self.search {
            None => true,
            Some(needle) => haystacks.iter().any(|h| h.to_lowercase().contains(needle)),
        }
    }

    fn matches_field(&self, name: &str, value: &str) -> bool {
        self.filters.get(name).is_none_or(|wanted| wanted == value)
    }
}

/// Listing
///
/// One page of rows plus the pagination block.
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub pagination: WirePagination,
}

fn paginate<T>(rows: Vec<T>, query: &ListQuery) -> Listing<T> {
    let total = rows.len() as u64;
    let start = (query.page.saturating_sub(1) as usize).saturating_mul(query.limit as usize);
    let items = rows
        .into_iter()
        .skip(start)
        .take(query.limit as usize)
        .collect();

    Listing {
        items,
        pagination: WirePagination {
            page: query.page,
            pages: total_pages(total, query.limit),
            total,
            limit: query.limit,
        },
    }
}

// --- Request Bodies ---

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<ContentStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
}

// --- Repository Trait ---

/// Repository
///
/// Everything the stub handlers need from storage.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity ---
    async fn authenticate(&self, email: &str, password: &str) -> Option<AdminUser>;
    async fn get_user(&self, id: &str) -> Option<AdminUser>;

    // --- Users ---
    async fn list_users(&self, query: &ListQuery) -> Listing<AdminUser>;
    async fn create_user(&self, user: NewUser) -> Result<AdminUser, RepoError>;
    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<AdminUser, RepoError>;
    async fn delete_user(&self, id: &str) -> Result<(), RepoError>;

    // --- Content ---
    async fn list_content(&self, query: &ListQuery) -> Listing<ContentItem>;
    /// The full article: row fields plus body, excerpt and tags.
    async fn get_article(&self, id: &str) -> Result<Value, RepoError>;
    async fn create_article(&self, article: ArticlePayload, author: &str) -> ContentItem;
    async fn update_article(&self, id: &str, patch: ContentPatch) -> Result<ContentItem, RepoError>;
    async fn delete_article(&self, id: &str) -> Result<(), RepoError>;

    // --- Comments ---
    async fn list_comments(&self, query: &ListQuery) -> Listing<CommentItem>;
    async fn set_comment_status(&self, id: &str, status: CommentStatus) -> Result<CommentItem, RepoError>;
    async fn delete_comment(&self, id: &str) -> Result<(), RepoError>;

    // --- Categories ---
    async fn list_categories(&self, query: &ListQuery) -> Vec<Category>;
    async fn create_category(&self, input: CategoryInput) -> Result<Category, RepoError>;
    async fn update_category(&self, id: &str, input: CategoryInput) -> Result<Category, RepoError>;
    async fn delete_category(&self, id: &str) -> Result<(), RepoError>;

    // --- Dashboard & Maintenance ---
    async fn stats(&self, period_days: Option<i64>) -> DashboardStats;
    async fn activity(&self, limit: usize) -> Vec<ActivityEntry>;
    async fn settings(&self) -> AppSettings;
    async fn save_settings(&self, settings: AppSettings) -> AppSettings;
    /// Removes rejected comments; returns how many went.
    async fn cleanup(&self) -> u64;
    async fn export(&self) -> ExportReport;
    async fn store_image(&self, filename: &str) -> UploadedImage;
}

/// RepositoryState
///
/// The shared handle the router state carries.
pub type RepositoryState = Arc<dyn Repository>;

// --- In-Memory Implementation ---

#[derive(Debug, Clone)]
struct StoredUser {
    user: AdminUser,
    password: String,
}

#[derive(Debug, Clone)]
struct StoredArticle {
    item: ContentItem,
    body: String,
    excerpt: Option<String>,
    tags: Vec<String>,
}

#[derive(Default)]
struct StubData {
    next_id: u64,
    users: Vec<StoredUser>,
    articles: Vec<StoredArticle>,
    comments: Vec<CommentItem>,
    categories: Vec<Category>,
    activity: Vec<ActivityEntry>,
    settings: AppSettings,
}

impl StubData {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn record(&mut self, kind: &str, description: String, user: Option<String>) {
        self.activity.push(ActivityEntry {
            kind: kind.to_string(),
            description,
            user,
            created_at: Utc::now(),
        });
    }

    fn email_taken(&self, email: &str, except: Option<&str>) -> bool {
        self.users.iter().any(|u| {
            u.user.email.eq_ignore_ascii_case(email) && Some(u.user.id.as_str()) != except
        })
    }

    fn add_user(&mut self, username: &str, email: &str, password: &str, role: Role) -> AdminUser {
        let user = AdminUser {
            id: self.next_id("user"),
            username: username.to_string(),
            email: email.to_string(),
            role,
            status: UserStatus::Active,
            created_at: Some(Utc::now()),
        };
        self.users.push(StoredUser {
            user: user.clone(),
            password: password.to_string(),
        });
        user
    }

    fn add_category(&mut self, name: &str, description: Option<&str>) -> Category {
        let category = Category {
            id: self.next_id("category"),
            name: name.to_string(),
            slug: slugify(name),
            description: description.map(str::to_string),
            post_count: 0,
        };
        self.categories.push(category.clone());
        category
    }

    fn add_article(&mut self, payload: ArticlePayload, author: &str) -> ContentItem {
        let item = ContentItem {
            id: self.next_id("content"),
            title: payload.title,
            author: Some(author.to_string()),
            category: payload.category,
            status: payload.status,
            views: 0,
            created_at: Some(Utc::now()),
        };
        self.articles.push(StoredArticle {
            item: item.clone(),
            body: payload.content,
            excerpt: payload.excerpt,
            tags: payload.tags,
        });
        self.recount_categories();
        item
    }

    fn add_comment(&mut self, text: &str, author: &str, article: &str, status: CommentStatus) {
        let comment = CommentItem {
            id: self.next_id("comment"),
            text: text.to_string(),
            author: Some(author.to_string()),
            article: Some(article.to_string()),
            status,
            created_at: Some(Utc::now()),
        };
        self.comments.push(comment);
    }

    fn recount_categories(&mut self) {
        for category in &mut self.categories {
            category.post_count = self
                .articles
                .iter()
                .filter(|a| {
                    a.item.category.as_deref() == Some(category.name.as_str())
                        || a.item.category.as_deref() == Some(category.slug.as_str())
                })
                .count() as u64;
        }
    }
}

/// InMemoryRepository
///
/// A seeded, process-local data set. State lives as long as the repository.
pub struct InMemoryRepository {
    data: Mutex<StubData>,
}

/// Credentials of the seeded accounts.
pub const SEED_ADMIN: (&str, &str) = ("admin@example.com", "admin123");
pub const SEED_MODERATOR: (&str, &str) = ("moderator@example.com", "moderator123");
pub const SEED_READER: (&str, &str) = ("reader@example.com", "reader123");

/// Generated member accounts on top of the three named ones.
pub const SEED_MEMBER_COUNT: usize = 22;

impl InMemoryRepository {
    pub fn empty() -> Self {
        Self {
            data: Mutex::new(StubData::default()),
        }
    }

    /// seeded
    ///
    /// Three named accounts (admin, moderator, reader), `SEED_MEMBER_COUNT`
    /// members, a handful of categories, articles and comments.
    pub fn seeded() -> Self {
        let mut data = StubData::default();

        data.add_user("admin", SEED_ADMIN.0, SEED_ADMIN.1, Role::Admin);
        data.add_user("moderator", SEED_MODERATOR.0, SEED_MODERATOR.1, Role::Moderator);
        data.add_user("reader", SEED_READER.0, SEED_READER.1, Role::User);
        for n in 1..=SEED_MEMBER_COUNT {
            data.add_user(
                &format!("member{:02}", n),
                &format!("member{:02}@example.com", n),
                "password",
                Role::User,
            );
        }

        data.add_category("Technology", Some("Gadgets, software and the web"));
        data.add_category("Travel", None);
        data.add_category("Food", Some("Recipes and reviews"));

        let seeded_articles = [
            ("Getting Started with Rust", "Technology", ContentStatus::Published),
            ("A Week in Lisbon", "Travel", ContentStatus::Published),
            ("Sourdough Basics", "Food", ContentStatus::Draft),
            ("Async I/O Explained", "Technology", ContentStatus::Published),
            ("Old Announcements", "Technology", ContentStatus::Archived),
        ];
        for (title, category, status) in seeded_articles {
            data.add_article(
                ArticlePayload {
                    title: title.to_string(),
                    content: format!("<p>{}</p>", title),
                    excerpt: None,
                    category: Some(category.to_string()),
                    tags: Vec::new(),
                    status,
                },
                "admin",
            );
        }

        data.add_comment("Great introduction!", "member01", "Getting Started with Rust", CommentStatus::Pending);
        data.add_comment("Lisbon is lovely in spring.", "member02", "A Week in Lisbon", CommentStatus::Pending);
        data.add_comment("Could you cover tokio next?", "member03", "Async I/O Explained", CommentStatus::Pending);
        data.add_comment("Thanks, this helped.", "member04", "Getting Started with Rust", CommentStatus::Approved);
        data.add_comment("BUY CHEAP WATCHES", "member05", "A Week in Lisbon", CommentStatus::Rejected);
        data.add_comment("Visit my site!!!", "member06", "Sourdough Basics", CommentStatus::Rejected);

        data.record("system", "Stub backend seeded".to_string(), None);

        Self {
            data: Mutex::new(data),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::seeded()
    }
}

fn article_json(article: &StoredArticle) -> Value {
    let mut value = serde_json::to_value(&article.item).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        map.insert("content".to_string(), Value::String(article.body.clone()));
        map.insert(
            "excerpt".to_string(),
            article.excerpt.clone().map(Value::String).unwrap_or(Value::Null),
        );
        map.insert(
            "tags".to_string(),
            Value::Array(article.tags.iter().cloned().map(Value::String).collect()),
        );
    }
    value
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn authenticate(&self, email: &str, password: &str) -> Option<AdminUser> {
        let data = self.data.lock();
        data.users
            .iter()
            .find(|u| u.user.email.eq_ignore_ascii_case(email.trim()) && u.password == password)
            .map(|u| u.user.clone())
    }

    async fn get_user(&self, id: &str) -> Option<AdminUser> {
        let data = self.data.lock();
        data.users.iter().find(|u| u.user.id == id).map(|u| u.user.clone())
    }

    async fn list_users(&self, query: &ListQuery) -> Listing<AdminUser> {
        let data = self.data.lock();
        let rows = data
            .users
            .iter()
            .map(|u| &u.user)
            .filter(|u| query.matches_text(&[&u.username, &u.email]))
            .filter(|u| query.matches_field("role", u.role.as_str()))
            .filter(|u| query.matches_field("status", u.status.as_str()))
            .cloned()
            .collect();
        paginate(rows, query)
    }

    async fn create_user(&self, user: NewUser) -> Result<AdminUser, RepoError> {
        let mut data = self.data.lock();
        if data.email_taken(&user.email, None) {
            return Err(RepoError::Conflict("User with this email already exists".to_string()));
        }
        let created = data.add_user(user.username.trim(), user.email.trim(), &user.password, user.role);
        data.record(
            "user_created",
            format!("New user {} registered", created.username),
            Some(created.username.clone()),
        );
        Ok(created)
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<AdminUser, RepoError> {
        let mut data = self.data.lock();
        if let Some(email) = patch.email.as_deref() {
            if data.email_taken(email, Some(id)) {
                return Err(RepoError::Conflict("User with this email already exists".to_string()));
            }
        }

        let stored = data
            .users
            .iter_mut()
            .find(|u| u.user.id == id)
            .ok_or(RepoError::NotFound("User"))?;

        if let Some(username) = non_blank(patch.username) {
            stored.user.username = username;
        }
        if let Some(email) = non_blank(patch.email) {
            stored.user.email = email;
        }
        if let Some(password) = non_blank(patch.password) {
            stored.password = password;
        }
        if let Some(role) = patch.role {
            stored.user.role = role;
        }
        if let Some(status) = patch.status {
            stored.user.status = status;
        }

        let updated = stored.user.clone();
        data.record(
            "user_updated",
            format!("User {} updated", updated.username),
            Some(updated.username.clone()),
        );
        Ok(updated)
    }

    async fn delete_user(&self, id: &str) -> Result<(), RepoError> {
        let mut data = self.data.lock();
        let before = data.users.len();
        data.users.retain(|u| u.user.id != id);
        if data.users.len() == before {
            return Err(RepoError::NotFound("User"));
        }
        data.record("user_deleted", format!("User {} deleted", id), None);
        Ok(())
    }

    async fn list_content(&self, query: &ListQuery) -> Listing<ContentItem> {
        let data = self.data.lock();
        let rows = data
            .articles
            .iter()
            .map(|a| &a.item)
            .filter(|c| query.matches_text(&[&c.title]))
            .filter(|c| query.matches_field("status", c.status.as_str()))
            .filter(|c| query.matches_field("category", c.category.as_deref().unwrap_or_default()))
            .cloned()
            .collect();
        paginate(rows, query)
    }

    async fn get_article(&self, id: &str) -> Result<Value, RepoError> {
        let data = self.data.lock();
        data.articles
            .iter()
            .find(|a| a.item.id == id)
            .map(article_json)
            .ok_or(RepoError::NotFound("Content"))
    }

    async fn create_article(&self, article: ArticlePayload, author: &str) -> ContentItem {
        let mut data = self.data.lock();
        let created = data.add_article(article, author);
        data.record(
            "content_created",
            format!("\"{}\" created", created.title),
            Some(author.to_string()),
        );
        created
    }

    async fn update_article(&self, id: &str, patch: ContentPatch) -> Result<ContentItem, RepoError> {
        let mut data = self.data.lock();
        let stored = data
            .articles
            .iter_mut()
            .find(|a| a.item.id == id)
            .ok_or(RepoError::NotFound("Content"))?;

        if let Some(title) = patch.title {
            if title.trim().is_empty() {
                return Err(RepoError::Invalid("Title is required".to_string()));
            }
            stored.item.title = title.trim().to_string();
        }
        if let Some(body) = patch.content {
            stored.body = body;
        }
        if patch.excerpt.is_some() {
            stored.excerpt = non_blank(patch.excerpt);
        }
        if patch.category.is_some() {
            stored.item.category = non_blank(patch.category);
        }
        if let Some(tags) = patch.tags {
            stored.tags = tags;
        }
        if let Some(status) = patch.status {
            stored.item.status = status;
        }

        let updated = stored.item.clone();
        data.recount_categories();
        data.record("content_updated", format!("\"{}\" updated", updated.title), None);
        Ok(updated)
    }

    async fn delete_article(&self, id: &str) -> Result<(), RepoError> {
        let mut data = self.data.lock();
        let before = data.articles.len();
        data.articles.retain(|a| a.item.id != id);
        if data.articles.len() == before {
            return Err(RepoError::NotFound("Content"));
        }
        data.recount_categories();
        Ok(())
    }

    async fn list_comments(&self, query: &ListQuery) -> Listing<CommentItem> {
        let data = self.data.lock();
        let rows = data
            .comments
            .iter()
            .filter(|c| query.matches_text(&[&c.text]))
            .filter(|c| query.matches_field("status", c.status.as_str()))
            .cloned()
            .collect();
        paginate(rows, query)
    }

    async fn set_comment_status(&self, id: &str, status: CommentStatus) -> Result<CommentItem, RepoError> {
        let mut data = self.data.lock();
        let comment = data
            .comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepoError::NotFound("Comment"))?;
        comment.status = status;
        let updated = comment.clone();
        data.record(
            &format!("comment_{}", status.as_str()),
            format!("Comment {} {}", id, status.as_str()),
            None,
        );
        Ok(updated)
    }

    async fn delete_comment(&self, id: &str) -> Result<(), RepoError> {
        let mut data = self.data.lock();
        let before = data.comments.len();
        data.comments.retain(|c| c.id != id);
        if data.comments.len() == before {
            return Err(RepoError::NotFound("Comment"));
        }
        Ok(())
    }

    async fn list_categories(&self, query: &ListQuery) -> Vec<Category> {
        let data = self.data.lock();
        data.categories
            .iter()
            .filter(|c| query.matches_text(&[&c.name, &c.slug]))
            .cloned()
            .collect()
    }

    async fn create_category(&self, input: CategoryInput) -> Result<Category, RepoError> {
        let mut data = self.data.lock();
        let name = non_blank(input.name)
            .ok_or_else(|| RepoError::Invalid("Category name is required".to_string()))?;
        let slug = non_blank(input.slug).unwrap_or_else(|| slugify(&name));
        if data.categories.iter().any(|c| c.slug == slug) {
            return Err(RepoError::Conflict("Category already exists".to_string()));
        }

        let mut category = data.add_category(&name, input.description.as_deref());
        if category.slug != slug {
            category.slug = slug;
            if let Some(stored) = data.categories.iter_mut().find(|c| c.id == category.id) {
                stored.slug = category.slug.clone();
            }
        }
        data.recount_categories();
        Ok(category)
    }

    async fn update_category(&self, id: &str, input: CategoryInput) -> Result<Category, RepoError> {
        let mut data = self.data.lock();
        let category = data
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepoError::NotFound("Category"))?;

        if let Some(name) = non_blank(input.name) {
            category.name = name;
        }
        if let Some(slug) = non_blank(input.slug) {
            category.slug = slug;
        }
        if input.description.is_some() {
            category.description = non_blank(input.description);
        }
        let updated = category.clone();
        data.recount_categories();
        Ok(updated)
    }

    async fn delete_category(&self, id: &str) -> Result<(), RepoError> {
        let mut data = self.data.lock();
        let before = data.categories.len();
        data.categories.retain(|c| c.id != id);
        if data.categories.len() == before {
            return Err(RepoError::NotFound("Category"));
        }
        Ok(())
    }

    async fn stats(&self, period_days: Option<i64>) -> DashboardStats {
        let data = self.data.lock();
        let since = period_days.map(|days| Utc::now() - ChronoDuration::days(days));
        let in_period = |created: Option<chrono::DateTime<Utc>>| match (since, created) {
            (Some(since), Some(created)) => created >= since,
            (Some(_), None) => false,
            (None, _) => true,
        };

        DashboardStats {
            total_users: data.users.len() as u64,
            total_content: data.articles.len() as u64,
            total_comments: data.comments.len() as u64,
            pending_comments: data
                .comments
                .iter()
                .filter(|c| c.status == CommentStatus::Pending)
                .count() as u64,
            total_views: data.articles.iter().map(|a| a.item.views).sum(),
            new_users: data.users.iter().filter(|u| in_period(u.user.created_at)).count() as u64,
        }
    }

    async fn activity(&self, limit: usize) -> Vec<ActivityEntry> {
        let data = self.data.lock();
        data.activity.iter().rev().take(limit).cloned().collect()
    }

    async fn settings(&self) -> AppSettings {
        self.data.lock().settings.clone()
    }

    async fn save_settings(&self, settings: AppSettings) -> AppSettings {
        let mut data = self.data.lock();
        data.settings = settings.clone();
        data.record("settings_updated", "Site settings updated".to_string(), None);
        settings
    }

    async fn cleanup(&self) -> u64 {
        let mut data = self.data.lock();
        let before = data.comments.len();
        data.comments.retain(|c| c.status != CommentStatus::Rejected);
        let removed = (before - data.comments.len()) as u64;
        data.record("cleanup", format!("Cleanup removed {} records", removed), None);
        removed
    }

    async fn export(&self) -> ExportReport {
        let data = self.data.lock();
        let records = data.users.len() + data.articles.len() + data.comments.len() + data.categories.len();
        ExportReport {
            download_url: format!("/exports/export-{}.json", Utc::now().format("%Y%m%d%H%M%S")),
            records: records as u64,
        }
    }

    async fn store_image(&self, filename: &str) -> UploadedImage {
        let mut data = self.data.lock();
        let id = data.next_id("image");
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(std::ffi::OsStr::to_str)
            .unwrap_or("bin");
        let stored = format!("{}.{}", id, extension);
        UploadedImage {
            url: format!("/uploads/{}", stored),
            filename: stored,
        }
    }
}
