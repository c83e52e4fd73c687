use std::marker::PhantomData;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::{
    auth::{AuthSession, unwrap_key},
    error::{ConsoleError, Result},
    filter::FilterState,
    models::{AdminUser, Category, CommentItem, ContentItem, Page, WirePagination},
    validation::{self, PayloadMode},
};

/// ResourceDescriptor
///
/// Static description of one managed collection: where it lives, how its
/// responses are keyed, which filters and transitions it supports, and how a
/// row is projected into table cells. Defined once at startup.
pub struct ResourceDescriptor<T> {
    /// Section id and log label, e.g. `users`.
    pub name: &'static str,
    /// Human name used in toasts, e.g. `User`.
    pub singular: &'static str,
    pub collection_path: &'static str,
    /// Key of the item array in a list response.
    pub list_key: &'static str,
    /// Key of the object in a single-item response.
    pub item_key: &'static str,
    pub paginated: bool,
    pub filter_fields: &'static [&'static str],
    pub transitions: &'static [&'static str],
    pub columns: &'static [&'static str],
    pub id_of: fn(&T) -> String,
    pub project_row: fn(&T) -> Vec<String>,
    /// Target status for the row's toggle button, when the resource has one.
    pub next_status: Option<fn(&T) -> String>,
    /// Client-side checks run before create/edit payloads leave the console.
    pub prepare: fn(&Value, PayloadMode) -> Result<Value>,
}

impl<T> Clone for ResourceDescriptor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ResourceDescriptor<T> {}

impl<T> ResourceDescriptor<T> {
    pub fn item_path(&self, id: &str) -> String {
        format!("{}/{}", self.collection_path, id)
    }

    pub fn supports_filter(&self, name: &str) -> bool {
        self.filter_fields.contains(&name)
    }

    pub fn supports_transition(&self, action: &str) -> bool {
        self.transitions.contains(&action)
    }
}

// --- Built-in Descriptors ---

fn date_cell<D: std::fmt::Display>(value: Option<D>) -> String {
    value.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}

fn toggled_user_status(user: &AdminUser) -> String {
    user.status.toggled().as_str().to_string()
}

pub fn users() -> ResourceDescriptor<AdminUser> {
    ResourceDescriptor {
        name: "users",
        singular: "User",
        collection_path: "/admin/users",
        list_key: "users",
        item_key: "user",
        paginated: true,
        filter_fields: &["role", "status"],
        transitions: &["status"],
        columns: &["Username", "Email", "Role", "Status", "Joined"],
        id_of: |u| u.id.clone(),
        project_row: |u| {
            vec![
                u.username.clone(),
                u.email.clone(),
                u.role.as_str().to_string(),
                u.status.as_str().to_string(),
                date_cell(u.created_at.map(|d| d.format("%Y-%m-%d"))),
            ]
        },
        next_status: Some(toggled_user_status),
        prepare: validation::prepare_user_payload,
    }
}

pub fn content() -> ResourceDescriptor<ContentItem> {
    ResourceDescriptor {
        name: "content",
        singular: "Content",
        collection_path: "/admin/content",
        list_key: "content",
        item_key: "content",
        paginated: true,
        filter_fields: &["status", "category"],
        transitions: &[],
        columns: &["Title", "Author", "Category", "Status", "Views", "Created"],
        id_of: |c| c.id.clone(),
        project_row: |c| {
            vec![
                c.title.clone(),
                c.author.clone().unwrap_or_else(|| "Unknown".to_string()),
                c.category.clone().unwrap_or_else(|| "-".to_string()),
                c.status.as_str().to_string(),
                c.views.to_string(),
                date_cell(c.created_at.map(|d| d.format("%Y-%m-%d"))),
            ]
        },
        next_status: None,
        prepare: validation::prepare_content_payload,
    }
}

pub fn comments() -> ResourceDescriptor<CommentItem> {
    ResourceDescriptor {
        name: "comments",
        singular: "Comment",
        collection_path: "/admin/comments",
        list_key: "comments",
        item_key: "comment",
        paginated: true,
        filter_fields: &["status"],
        transitions: &["approve", "reject"],
        columns: &["Comment", "Author", "Article", "Status", "Posted"],
        id_of: |c| c.id.clone(),
        project_row: |c| {
            let mut excerpt: String = c.text.chars().take(80).collect();
            if c.text.chars().count() > 80 {
                excerpt.push_str("...");
            }
            vec![
                excerpt,
                c.author.clone().unwrap_or_else(|| "Anonymous".to_string()),
                c.article.clone().unwrap_or_else(|| "-".to_string()),
                c.status.as_str().to_string(),
                date_cell(c.created_at.map(|d| d.format("%Y-%m-%d %H:%M"))),
            ]
        },
        next_status: None,
        prepare: validation::accept_payload,
    }
}

pub fn categories() -> ResourceDescriptor<Category> {
    ResourceDescriptor {
        name: "categories",
        singular: "Category",
        collection_path: "/admin/categories",
        list_key: "categories",
        item_key: "category",
        paginated: false,
        filter_fields: &[],
        transitions: &[],
        columns: &["Name", "Slug", "Description", "Posts"],
        id_of: |c| c.id.clone(),
        project_row: |c| {
            vec![
                c.name.clone(),
                c.slug.clone(),
                c.description.clone().unwrap_or_default(),
                c.post_count.to_string(),
            ]
        },
        next_status: None,
        prepare: validation::prepare_category_payload,
    }
}

// --- Client ---

/// Transition
///
/// A state change that is not a full update: `PUT {item}/{segment}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Approve,
    Reject,
    Status(String),
}

impl Transition {
    pub fn segment(&self) -> &'static str {
        match self {
            Transition::Approve => "approve",
            Transition::Reject => "reject",
            Transition::Status(_) => "status",
        }
    }

    fn body(&self) -> Option<Value> {
        match self {
            Transition::Status(status) => Some(json!({ "status": status })),
            _ => None,
        }
    }
}

/// ResourceClient
///
/// Typed CRUD over one collection endpoint. Every call is a fresh round trip
/// through the `AuthSession`; nothing is cached here.
pub struct ResourceClient<T> {
    session: AuthSession,
    descriptor: ResourceDescriptor<T>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            descriptor: self.descriptor,
            _marker: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> ResourceClient<T> {
    pub fn new(session: AuthSession, descriptor: ResourceDescriptor<T>) -> Self {
        Self {
            session,
            descriptor,
            _marker: PhantomData,
        }
    }

    pub fn descriptor(&self) -> &ResourceDescriptor<T> {
        &self.descriptor
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    /// list
    ///
    /// `GET collection?page&limit&search&<fields>`. Unpaginated collections
    /// only send the search text.
    pub async fn list(&self, filter: &FilterState) -> Result<Page<T>> {
        let params = if self.descriptor.paginated {
            filter.to_query_params()
        } else {
            filter
                .to_query_params()
                .into_iter()
                .filter(|(key, _)| key != "page" && key != "limit")
                .collect()
        };

        let data = self
            .session
            .authenticated_get(self.descriptor.collection_path, &params)
            .await?;

        let (items, pagination) = split_list(data, self.descriptor.list_key)?;
        let items: Vec<T> = serde_json::from_value(items)?;
        let pagination = if self.descriptor.paginated {
            Some(pagination.unwrap_or_default())
        } else {
            None
        };

        Ok(Page::from_wire(
            items,
            pagination,
            filter.page(),
            filter.page_size(),
        ))
    }

    pub async fn get(&self, id: &str) -> Result<T> {
        let data = self
            .session
            .authenticated_request(Method::GET, &self.item_path(id)?, None)
            .await?;
        self.decode_item(data)?
            .ok_or_else(|| ConsoleError::Parse(format!("{} response had no data", self.descriptor.singular)))
    }

    pub async fn create(&self, payload: &Value) -> Result<Option<T>> {
        let data = self
            .session
            .authenticated_request(Method::POST, self.descriptor.collection_path, Some(payload))
            .await?;
        self.decode_item(data)
    }

    pub async fn update(&self, id: &str, payload: &Value) -> Result<Option<T>> {
        let data = self
            .session
            .authenticated_request(Method::PUT, &self.item_path(id)?, Some(payload))
            .await?;
        self.decode_item(data)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.session
            .authenticated_request(Method::DELETE, &self.item_path(id)?, None)
            .await?;
        Ok(())
    }

    /// transition
    ///
    /// `PUT {item}/{approve|reject|status}`. Servers often answer with a bare
    /// `{ success: true }`, hence the optional item.
    pub async fn transition(&self, id: &str, transition: &Transition) -> Result<Option<T>> {
        let path = format!("{}/{}", self.item_path(id)?, transition.segment());
        let body = transition.body();
        let data = self
            .session
            .authenticated_request(Method::PUT, &path, body.as_ref())
            .await?;
        self.decode_item(data)
    }

    fn item_path(&self, id: &str) -> Result<String> {
        let id = id.trim();
        if id.is_empty() || id.contains('/') {
            return Err(ConsoleError::validation(format!(
                "Invalid {} id",
                self.descriptor.singular.to_lowercase()
            )));
        }
        Ok(self.descriptor.item_path(id))
    }

    fn decode_item(&self, data: Value) -> Result<Option<T>> {
        match unwrap_key(data, self.descriptor.item_key) {
            Value::Null => Ok(None),
            Value::Object(map) if map.is_empty() => Ok(None),
            item => Ok(Some(serde_json::from_value(item)?)),
        }
    }
}

/// split_list
///
/// Pulls the item array and the optional pagination block out of a list
/// response. Accepts `{ <key>: [...], pagination }`, `{ items: [...] }` and a
/// bare array.
fn split_list(data: Value, list_key: &str) -> Result<(Value, Option<WirePagination>)> {
    match data {
        Value::Array(_) => Ok((data, None)),
        Value::Object(mut map) => {
            let pagination = map
                .remove("pagination")
                .map(serde_json::from_value::<WirePagination>)
                .transpose()?;
            let items = map
                .remove(list_key)
                .or_else(|| map.remove("items"))
                .unwrap_or(Value::Array(Vec::new()));
            Ok((items, pagination))
        }
        Value::Null => Ok((Value::Array(Vec::new()), None)),
        other => Err(ConsoleError::Parse(format!(
            "Unexpected list payload: {}",
            other
        ))),
    }
}
