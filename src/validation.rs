use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::{
    error::{ConsoleError, Result},
    models::{AppSettings, ArticlePayload},
};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// PayloadMode
///
/// Create forms must fill every required field; edit forms only check what
/// they send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    Create,
    Update,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

fn text<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}

fn require(payload: &Value, key: &str, label: &str, errors: &mut Vec<String>) {
    if text(payload, key).is_none_or(|v| v.trim().is_empty()) {
        errors.push(format!("{} is required", label));
    }
}

fn finish(payload: Value, errors: Vec<String>) -> Result<Value> {
    if errors.is_empty() {
        Ok(payload)
    } else {
        Err(ConsoleError::ValidationFailed(errors))
    }
}

/// accept_payload
///
/// Used by resources without client-side rules.
pub fn accept_payload(payload: &Value, _mode: PayloadMode) -> Result<Value> {
    if !payload.is_object() {
        return Err(ConsoleError::validation("Form data must be an object"));
    }
    Ok(payload.clone())
}

/// prepare_user_payload
///
/// Required fields, email format, password length and confirmation. The
/// confirmation field is checked and then dropped; an empty password on edit
/// means "leave unchanged" and is dropped too.
pub fn prepare_user_payload(payload: &Value, mode: PayloadMode) -> Result<Value> {
    let mut payload = accept_payload(payload, mode)?;
    let mut errors = Vec::new();

    if mode == PayloadMode::Create {
        require(&payload, "username", "Username", &mut errors);
        require(&payload, "email", "Email", &mut errors);
        require(&payload, "password", "Password", &mut errors);
    }

    if let Some(email) = text(&payload, "email") {
        if !email.trim().is_empty() && !is_valid_email(email) {
            errors.push("Please enter a valid email address".to_string());
        }
    }

    let password = text(&payload, "password").unwrap_or_default().to_string();
    let confirm = text(&payload, "confirmPassword").map(str::to_string);

    if !password.is_empty() {
        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LEN
            ));
        }
        if confirm.as_deref() != Some(password.as_str()) {
            errors.push("Passwords do not match".to_string());
        }
    }

    if let Some(map) = payload.as_object_mut() {
        map.remove("confirmPassword");
        if password.is_empty() {
            map.remove("password");
        }
    }

    finish(payload, errors)
}

/// prepare_category_payload
///
/// A name is required; a missing slug is derived from it.
pub fn prepare_category_payload(payload: &Value, mode: PayloadMode) -> Result<Value> {
    let mut payload = accept_payload(payload, mode)?;
    let mut errors = Vec::new();
    require(&payload, "name", "Category name", &mut errors);

    let has_slug = text(&payload, "slug").is_some_and(|s| !s.trim().is_empty());
    if !has_slug {
        if let Some(name) = text(&payload, "name").map(slugify) {
            if let Some(map) = payload.as_object_mut() {
                map.insert("slug".to_string(), Value::String(name));
            }
        }
    }

    finish(payload, errors)
}

/// prepare_content_payload
///
/// Title is required on create and may not be blanked on edit.
pub fn prepare_content_payload(payload: &Value, mode: PayloadMode) -> Result<Value> {
    let payload = accept_payload(payload, mode)?;
    let mut errors = Vec::new();

    match mode {
        PayloadMode::Create => require(&payload, "title", "Title", &mut errors),
        PayloadMode::Update => {
            if text(&payload, "title").is_some_and(|t| t.trim().is_empty()) {
                errors.push("Title is required".to_string());
            }
        }
    }

    if let Some(status) = text(&payload, "status") {
        if !matches!(status, "draft" | "published" | "archived") {
            errors.push(format!("Unknown status '{}'", status));
        }
    }

    finish(payload, errors)
}

pub fn validate_settings(settings: &AppSettings) -> Result<()> {
    let mut errors = Vec::new();
    if settings.site_name.trim().is_empty() {
        errors.push("Site name is required".to_string());
    }
    if !(1..=100).contains(&settings.posts_per_page) {
        errors.push("Posts per page must be between 1 and 100".to_string());
    }
    finish(Value::Null, errors).map(|_| ())
}

pub fn validate_article(article: &ArticlePayload) -> Result<()> {
    let mut errors = Vec::new();
    let title = article.title.trim();
    if title.is_empty() {
        errors.push("Please enter a title".to_string());
    } else if title.chars().count() > MAX_TITLE_LEN {
        errors.push(format!("Title must be {} characters or fewer", MAX_TITLE_LEN));
    }
    if is_blank_html(&article.content) {
        errors.push("Please add some content".to_string());
    }
    finish(Value::Null, errors).map(|_| ())
}

pub fn validate_image(mime: &str, size: usize) -> Result<()> {
    let mut errors = Vec::new();
    if !ALLOWED_IMAGE_TYPES.contains(&mime) {
        errors.push("Please select a valid image file (JPEG, PNG, GIF, WebP)".to_string());
    }
    if size == 0 {
        errors.push("The selected image is empty".to_string());
    } else if size > MAX_IMAGE_BYTES {
        errors.push("Image size must be less than 5MB".to_string());
    }
    finish(Value::Null, errors).map(|_| ())
}

/// Lower-case, ASCII alphanumerics joined by single dashes.
pub fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// True when the markup has no visible text and no embedded media.
pub fn is_blank_html(html: &str) -> bool {
    if html.contains("<img") {
        return false;
    }
    let mut visible = String::new();
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => visible.push(c),
            _ => {}
        }
    }
    visible.replace("&nbsp;", " ").trim().is_empty()
}
