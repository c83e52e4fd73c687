use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use tokio::task::JoinHandle;

use crate::{
    auth::{AuthSession, unwrap_key},
    error::{ConsoleError, Result},
    models::{ArticlePayload, ContentItem, ContentStatus, UploadedImage},
    notify::ToastNotifier,
    validation,
};

// --- Editing Engine Boundary ---

/// FormatCommand
///
/// Formatting operations the toolbar can ask of the editing engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatCommand {
    Bold,
    Italic,
    Underline,
    Strike,
    Heading(u8),
    BulletList,
    OrderedList,
    Blockquote,
    CodeBlock,
    Link(String),
    Undo,
    Redo,
    ClearFormatting,
}

/// EditorEngine
///
/// The embedded rich-text engine. It owns the document model, selection and
/// undo history; the console only forwards commands and reads back HTML.
pub trait EditorEngine: Send {
    fn exec(&mut self, command: &FormatCommand);
    fn insert_image(&mut self, url: &str, alt: &str);
    fn html(&self) -> String;
    fn set_html(&mut self, html: &str);
}

/// ToolbarAction
///
/// What a toolbar button does. Links and images need input from the host
/// (a URL, a file) before anything reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolbarAction {
    Format(FormatCommand),
    PromptLink,
    PickImage,
}

/// toolbar_action
///
/// Maps a toolbar button id to its action. Unknown ids map to nothing.
pub fn toolbar_action(button: &str) -> Option<ToolbarAction> {
    let command = match button {
        "bold" => FormatCommand::Bold,
        "italic" => FormatCommand::Italic,
        "underline" => FormatCommand::Underline,
        "strike" => FormatCommand::Strike,
        "h1" => FormatCommand::Heading(1),
        "h2" => FormatCommand::Heading(2),
        "h3" => FormatCommand::Heading(3),
        "bullet-list" => FormatCommand::BulletList,
        "ordered-list" => FormatCommand::OrderedList,
        "blockquote" => FormatCommand::Blockquote,
        "code-block" => FormatCommand::CodeBlock,
        "undo" => FormatCommand::Undo,
        "redo" => FormatCommand::Redo,
        "clear" => FormatCommand::ClearFormatting,
        "link" => return Some(ToolbarAction::PromptLink),
        "image" => return Some(ToolbarAction::PickImage),
        _ => return None,
    };
    Some(ToolbarAction::Format(command))
}

// --- Draft ---

/// ArticleDraft
///
/// Article metadata edited next to the body. The body itself lives in the
/// engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleDraft {
    pub id: Option<String>,
    pub title: String,
    pub excerpt: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub status: ContentStatus,
}

impl ArticleDraft {
    fn to_payload(&self, content: String, status: ContentStatus) -> ArticlePayload {
        ArticlePayload {
            title: self.title.trim().to_string(),
            content,
            excerpt: Some(self.excerpt.trim().to_string()).filter(|e| !e.is_empty()),
            category: self.category.clone().filter(|c| !c.is_empty()),
            tags: self.tags.clone(),
            status,
        }
    }
}

/// Comma-separated tag input to a clean, de-duplicated list.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            tags.push(tag.to_string());
        }
    }
    tags
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveOrigin {
    Manual,
    AutoSave,
}

// --- Editor ---

struct EditorInner<E> {
    session: AuthSession,
    notifier: ToastNotifier,
    engine: Mutex<E>,
    draft: Mutex<ArticleDraft>,
    // Bumped on every edit; `saved` records the revision the server has.
    revision: AtomicU64,
    saved: AtomicU64,
    save_lock: tokio::sync::Mutex<()>,
    autosave: Mutex<Option<JoinHandle<()>>>,
}

/// ArticleEditor
///
/// The article screen: toolbar wiring, metadata, save/publish, periodic
/// auto-save and image upload. Saves are serialised so an auto-save tick can
/// never race a manual save into creating the article twice.
pub struct ArticleEditor<E> {
    inner: Arc<EditorInner<E>>,
}

impl<E> Clone for ArticleEditor<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: EditorEngine + 'static> ArticleEditor<E> {
    pub fn new(session: AuthSession, notifier: ToastNotifier, engine: E) -> Self {
        Self {
            inner: Arc::new(EditorInner {
                session,
                notifier,
                engine: Mutex::new(engine),
                draft: Mutex::new(ArticleDraft::default()),
                revision: AtomicU64::new(0),
                saved: AtomicU64::new(0),
                save_lock: tokio::sync::Mutex::new(()),
                autosave: Mutex::new(None),
            }),
        }
    }

    pub fn draft(&self) -> ArticleDraft {
        self.inner.draft.lock().clone()
    }

    pub fn html(&self) -> String {
        self.inner.engine.lock().html()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.revision.load(Ordering::SeqCst) != self.inner.saved.load(Ordering::SeqCst)
    }

    /// Call whenever the engine reports a content change.
    pub fn mark_changed(&self) {
        self.inner.revision.fetch_add(1, Ordering::SeqCst);
    }

    pub fn word_count(&self) -> usize {
        let html = self.html();
        let mut text = String::with_capacity(html.len());
        let mut in_tag = false;
        for c in html.chars() {
            match c {
                '<' => {
                    in_tag = true;
                    text.push(' ');
                }
                '>' => in_tag = false,
                _ if !in_tag => text.push(c),
                _ => {}
            }
        }
        text.split_whitespace().count()
    }

    pub fn edit_draft(&self, edit: impl FnOnce(&mut ArticleDraft)) {
        edit(&mut self.inner.draft.lock());
        self.mark_changed();
    }

    pub fn set_title(&self, title: &str) {
        self.edit_draft(|d| d.title = title.to_string());
    }

    pub fn set_tags(&self, raw: &str) {
        let tags = parse_tags(raw);
        self.edit_draft(|d| d.tags = tags);
    }

    /// press
    ///
    /// A toolbar click. Formatting goes straight to the engine; link and image
    /// buttons are handed back so the host can collect a URL or a file.
    pub fn press(&self, button: &str) -> Option<ToolbarAction> {
        let action = toolbar_action(button)?;
        if let ToolbarAction::Format(command) = &action {
            self.inner.engine.lock().exec(command);
            self.mark_changed();
        }
        Some(action)
    }

    pub fn insert_link(&self, url: &str) -> bool {
        let url = url.trim();
        if url.is_empty() {
            return false;
        }
        self.inner
            .engine
            .lock()
            .exec(&FormatCommand::Link(url.to_string()));
        self.mark_changed();
        true
    }

    /// open
    ///
    /// Loads an existing article (`GET /admin/content/{id}`) into the editor.
    pub async fn open(&self, id: &str) -> bool {
        let path = format!("/admin/content/{}", id.trim());
        let result = self
            .inner
            .session
            .authenticated_request(Method::GET, &path, None)
            .await
            .and_then(|data| {
                let item = unwrap_key(data, "content");
                let body = item
                    .get("content")
                    .and_then(|c| c.as_str())
                    .unwrap_or_default()
                    .to_string();
                let excerpt = item
                    .get("excerpt")
                    .and_then(|c| c.as_str())
                    .unwrap_or_default()
                    .to_string();
                let tags = item
                    .get("tags")
                    .cloned()
                    .map(serde_json::from_value::<Vec<String>>)
                    .transpose()?
                    .unwrap_or_default();
                let meta: ContentItem = serde_json::from_value(item)?;
                Ok((meta, body, excerpt, tags))
            });

        match result {
            Ok((meta, body, excerpt, tags)) => {
                self.inner.engine.lock().set_html(&body);
                *self.inner.draft.lock() = ArticleDraft {
                    id: Some(meta.id),
                    title: meta.title,
                    excerpt,
                    category: meta.category,
                    tags,
                    status: meta.status,
                };
                let revision = self.inner.revision.load(Ordering::SeqCst);
                self.inner.saved.store(revision, Ordering::SeqCst);
                true
            }
            Err(e) => {
                self.report("Failed to load article", &e);
                false
            }
        }
    }

    /// save
    ///
    /// Saves the article, publishing it when `publish` is set. Creates it on
    /// first save and updates it afterwards.
    pub async fn save(&self, publish: bool) -> bool {
        match self.save_inner(publish, SaveOrigin::Manual).await {
            Ok(_) => {
                self.inner.notifier.success(if publish {
                    "Article published successfully"
                } else {
                    "Draft saved"
                });
                true
            }
            Err(e) => {
                self.report("Failed to save article", &e);
                false
            }
        }
    }

    async fn save_inner(&self, publish: bool, origin: SaveOrigin) -> Result<ContentItem> {
        let _guard = self.inner.save_lock.lock().await;

        let revision = self.inner.revision.load(Ordering::SeqCst);
        let content = self.html();
        let (id, payload) = {
            let draft = self.inner.draft.lock();
            let status = if publish {
                ContentStatus::Published
            } else {
                draft.status
            };
            (draft.id.clone(), draft.to_payload(content, status))
        };

        validation::validate_article(&payload)?;
        let body = serde_json::to_value(&payload)?;

        // Create is POST /content; update is PUT /content/{id}, the backend's
        // update route for an existing article.
        let (method, path) = match &id {
            None => (Method::POST, "/content".to_string()),
            Some(id) => (Method::PUT, format!("/content/{}", id)),
        };

        tracing::debug!(?origin, article = ?id, "Saving article");
        let data = self
            .inner
            .session
            .authenticated_request(method, &path, Some(&body))
            .await?;

        let saved: ContentItem = match unwrap_key(data, "content") {
            serde_json::Value::Null => ContentItem {
                id: id.clone().unwrap_or_default(),
                title: payload.title.clone(),
                status: payload.status,
                ..ContentItem::default()
            },
            item => serde_json::from_value(item)?,
        };

        {
            let mut draft = self.inner.draft.lock();
            if draft.id.is_none() && !saved.id.is_empty() {
                draft.id = Some(saved.id.clone());
            }
            draft.status = payload.status;
        }
        self.inner.saved.store(revision, Ordering::SeqCst);
        Ok(saved)
    }

    /// autosave_tick
    ///
    /// One auto-save pass: saves as draft only when there are unsaved edits
    /// and a title. Returns whether a save happened.
    pub async fn autosave_tick(&self) -> bool {
        if !self.is_dirty() || self.inner.draft.lock().title.trim().is_empty() {
            return false;
        }
        match self.save_inner(false, SaveOrigin::AutoSave).await {
            Ok(_) => {
                tracing::info!("Draft auto-saved");
                true
            }
            Err(e) => {
                // Left dirty, so the next tick retries.
                self.report("Auto-save failed", &e);
                false
            }
        }
    }

    /// start_autosave
    ///
    /// Runs `autosave_tick` every `interval` until stopped or until the editor
    /// is dropped.
    pub fn start_autosave(&self) {
        let interval = self.inner.session.config().autosave_interval;
        let weak: Weak<EditorInner<E>> = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                ArticleEditor { inner }.autosave_tick().await;
            }
        });

        if let Some(previous) = self.inner.autosave.lock().replace(handle) {
            previous.abort();
        }
    }

    pub fn stop_autosave(&self) {
        if let Some(handle) = self.inner.autosave.lock().take() {
            handle.abort();
        }
    }

    /// upload_image
    ///
    /// Checks type and size, uploads via `POST /upload/image` and inserts the
    /// returned URL at the cursor. Returns the URL.
    pub async fn upload_image(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        mime: &str,
        alt: &str,
    ) -> Option<String> {
        let result = async {
            validation::validate_image(mime, bytes.len())?;
            let part = Part::bytes(bytes)
                .file_name(filename.to_string())
                .mime_str(mime)?;
            let form = Form::new().part("image", part);
            let data = self
                .inner
                .session
                .authenticated_upload("/upload/image", form)
                .await?;
            let image: UploadedImage = serde_json::from_value(unwrap_key(data, "image"))?;
            Ok::<UploadedImage, ConsoleError>(image)
        }
        .await;

        match result {
            Ok(image) => {
                self.inner.engine.lock().insert_image(&image.url, alt);
                self.mark_changed();
                self.inner.notifier.success("Image uploaded successfully");
                Some(image.url)
            }
            Err(e) => {
                self.report("Image upload failed", &e);
                None
            }
        }
    }

    fn report(&self, context: &str, error: &ConsoleError) {
        tracing::error!("{}: {}", context, error);
        self.inner.notifier.error(error.user_message());
    }
}

impl<E> Drop for EditorInner<E> {
    fn drop(&mut self) {
        if let Some(handle) = self.autosave.get_mut().take() {
            handle.abort();
        }
    }
}
