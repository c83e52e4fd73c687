mod common;

use std::sync::Arc;
use std::time::Duration;

use admin_console::{
    AuthSession, ConsoleConfig, NavigatorState, TokenStoreState, ToastNotifier,
    editor::{ArticleEditor, EditorEngine, FormatCommand, ToolbarAction, parse_tags, toolbar_action},
    models::ContentStatus,
    stub::repository::Repository,
    validation::MAX_IMAGE_BYTES,
};
use common::{SEED_ADMIN, RecordingNavigator, TestConsole, TestStub, admin_console, spawn_stub};
use parking_lot::Mutex;

/// FakeEngine
///
/// Keeps the document as a plain HTML string and records every command.
#[derive(Clone, Default)]
struct FakeEngine {
    html: Arc<Mutex<String>>,
    commands: Arc<Mutex<Vec<FormatCommand>>>,
}

impl FakeEngine {
    fn with_html(html: &str) -> Self {
        let engine = Self::default();
        *engine.html.lock() = html.to_string();
        engine
    }

    fn commands(&self) -> Vec<FormatCommand> {
        self.commands.lock().clone()
    }
}

impl EditorEngine for FakeEngine {
    fn exec(&mut self, command: &FormatCommand) {
        self.commands.lock().push(command.clone());
    }

    fn insert_image(&mut self, url: &str, alt: &str) {
        self.html
            .lock()
            .push_str(&format!("<img src=\"{}\" alt=\"{}\">", url, alt));
    }

    fn html(&self) -> String {
        self.html.lock().clone()
    }

    fn set_html(&mut self, html: &str) {
        *self.html.lock() = html.to_string();
    }
}

async fn editor_with(stub: &TestStub, html: &str) -> (TestConsole, ArticleEditor<FakeEngine>, FakeEngine) {
    let t = admin_console(stub).await;
    let engine = FakeEngine::with_html(html);
    let editor = t.console.editor(engine.clone());
    (t, editor, engine)
}

// --- Toolbar ---

#[test]
fn test_toolbar_buttons() {
    assert_eq!(
        toolbar_action("bold"),
        Some(ToolbarAction::Format(FormatCommand::Bold))
    );
    assert_eq!(
        toolbar_action("h2"),
        Some(ToolbarAction::Format(FormatCommand::Heading(2)))
    );
    assert_eq!(toolbar_action("link"), Some(ToolbarAction::PromptLink));
    assert_eq!(toolbar_action("image"), Some(ToolbarAction::PickImage));
    assert_eq!(toolbar_action("marquee"), None);
}

#[test]
fn test_tags_are_trimmed_and_deduplicated() {
    assert_eq!(
        parse_tags(" rust, Tokio ,rust, ,tokio,async"),
        vec!["rust", "Tokio", "async"]
    );
    assert!(parse_tags(" , ").is_empty());
}

#[tokio::test]
async fn test_press_forwards_formatting_to_engine() {
    let stub = spawn_stub().await;
    let (_t, editor, engine) = editor_with(&stub, "<p>draft</p>").await;
    assert!(!editor.is_dirty());

    assert_eq!(
        editor.press("italic"),
        Some(ToolbarAction::Format(FormatCommand::Italic))
    );
    assert!(editor.is_dirty());

    // Link and image wait for the host; nothing reaches the engine yet.
    assert_eq!(editor.press("link"), Some(ToolbarAction::PromptLink));
    assert_eq!(editor.press("unknown"), None);
    assert_eq!(engine.commands(), vec![FormatCommand::Italic]);

    assert!(!editor.insert_link("   "));
    assert!(editor.insert_link(" https://example.com "));
    assert_eq!(
        engine.commands().last(),
        Some(&FormatCommand::Link("https://example.com".to_string()))
    );
}

#[tokio::test]
async fn test_word_count_ignores_markup() {
    let stub = spawn_stub().await;
    let (_t, editor, _engine) =
        editor_with(&stub, "<p>Hello <b>big</b> world</p><p>again</p>").await;

    assert_eq!(editor.word_count(), 4);
}

// --- Saving ---

#[tokio::test]
async fn test_save_without_title_is_blocked() {
    let stub = spawn_stub().await;
    let (t, editor, _engine) = editor_with(&stub, "<p>body</p>").await;
    let before = stub.requests();

    assert!(!editor.save(false).await);

    assert_eq!(stub.requests(), before);
    assert_eq!(t.last_toast().as_deref(), Some("Please enter a title"));
    assert!(editor.draft().id.is_none());
}

#[tokio::test]
async fn test_save_without_content_is_blocked() {
    let stub = spawn_stub().await;
    let (t, editor, _engine) = editor_with(&stub, "<p>&nbsp;</p>").await;
    editor.set_title("Empty body");

    assert!(!editor.save(false).await);
    assert_eq!(t.last_toast().as_deref(), Some("Please add some content"));
}

#[tokio::test]
async fn test_draft_then_publish() {
    let stub = spawn_stub().await;
    let (t, editor, _engine) = editor_with(&stub, "<p>Hello world</p>").await;
    editor.set_title("  Fresh Article ");
    editor.set_tags("rust, news");
    editor.edit_draft(|d| d.excerpt = "Short".to_string());

    assert!(editor.save(false).await);
    assert_eq!(t.last_toast().as_deref(), Some("Draft saved"));
    assert!(!editor.is_dirty());

    let id = editor.draft().id.expect("created on first save");
    let stored = stub.repo.get_article(&id).await.unwrap();
    assert_eq!(stored["title"], "Fresh Article");
    assert_eq!(stored["status"], "draft");
    assert_eq!(stored["excerpt"], "Short");
    assert_eq!(stored["tags"], serde_json::json!(["rust", "news"]));

    assert!(editor.save(true).await);
    assert_eq!(
        t.last_toast().as_deref(),
        Some("Article published successfully")
    );
    // Same article, updated in place.
    assert_eq!(editor.draft().id.as_deref(), Some(id.as_str()));
    assert_eq!(editor.draft().status, ContentStatus::Published);
    let stored = stub.repo.get_article(&id).await.unwrap();
    assert_eq!(stored["status"], "published");
}

#[tokio::test]
async fn test_open_existing_article() {
    let stub = spawn_stub().await;
    let (_t, editor, engine) = editor_with(&stub, "").await;

    assert!(editor.open("content-29").await);

    let draft = editor.draft();
    assert_eq!(draft.id.as_deref(), Some("content-29"));
    assert_eq!(draft.title, "Getting Started with Rust");
    assert_eq!(draft.category.as_deref(), Some("Technology"));
    assert_eq!(draft.status, ContentStatus::Published);
    assert_eq!(engine.html(), "<p>Getting Started with Rust</p>");
    assert!(!editor.is_dirty());
}

#[tokio::test]
async fn test_open_missing_article() {
    let stub = spawn_stub().await;
    let (t, editor, _engine) = editor_with(&stub, "").await;

    assert!(!editor.open("content-999").await);
    assert_eq!(t.last_toast().as_deref(), Some("Content not found"));
}

// --- Auto-save ---

#[tokio::test]
async fn test_autosave_tick_only_saves_dirty_titled_drafts() {
    let stub = spawn_stub().await;
    let (_t, editor, _engine) = editor_with(&stub, "<p>body</p>").await;

    // Clean editor.
    assert!(!editor.autosave_tick().await);

    // Dirty but untitled.
    editor.mark_changed();
    assert!(!editor.autosave_tick().await);

    editor.set_title("Autosaved");
    assert!(editor.autosave_tick().await);
    assert!(!editor.is_dirty());
    assert!(editor.draft().id.is_some());
    assert_eq!(editor.draft().status, ContentStatus::Draft);

    assert!(!editor.autosave_tick().await);
}

#[tokio::test]
async fn test_autosave_timer_saves_in_background() {
    let stub = spawn_stub().await;
    let config = ConsoleConfig {
        autosave_interval: Duration::from_millis(150),
        ..stub.config()
    };
    let session = AuthSession::new(
        config,
        Arc::new(admin_console::MemoryTokenStore::new()) as TokenStoreState,
        Arc::new(RecordingNavigator::default()) as NavigatorState,
    )
    .unwrap();
    session.login(SEED_ADMIN.0, SEED_ADMIN.1).await.unwrap();

    let editor = ArticleEditor::new(
        session,
        ToastNotifier::default(),
        FakeEngine::with_html("<p>timed</p>"),
    );
    editor.set_title("Timed draft");
    editor.start_autosave();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(editor.draft().id.is_some());
    assert!(!editor.is_dirty());

    editor.stop_autosave();
    let after_stop = stub.requests();
    editor.set_title("Changed after stop");
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(stub.requests(), after_stop);
    assert!(editor.is_dirty());
}

// --- Images ---

#[tokio::test]
async fn test_upload_rejects_non_images_locally() {
    let stub = spawn_stub().await;
    let (t, editor, _engine) = editor_with(&stub, "").await;
    let before = stub.requests();

    let url = editor
        .upload_image(b"hello".to_vec(), "notes.txt", "text/plain", "notes")
        .await;

    assert_eq!(url, None);
    assert_eq!(stub.requests(), before);
    assert_eq!(
        t.last_toast().as_deref(),
        Some("Please select a valid image file (JPEG, PNG, GIF, WebP)")
    );
}

#[tokio::test]
async fn test_upload_rejects_oversized_images_locally() {
    let stub = spawn_stub().await;
    let (t, editor, _engine) = editor_with(&stub, "").await;
    let before = stub.requests();

    let url = editor
        .upload_image(vec![0u8; MAX_IMAGE_BYTES + 1], "huge.png", "image/png", "huge")
        .await;

    assert_eq!(url, None);
    assert_eq!(stub.requests(), before);
    assert_eq!(
        t.last_toast().as_deref(),
        Some("Image size must be less than 5MB")
    );
}

#[tokio::test]
async fn test_upload_inserts_image() {
    let stub = spawn_stub().await;
    let (t, editor, engine) = editor_with(&stub, "<p>Look:</p>").await;

    let url = editor
        .upload_image(vec![0x89, b'P', b'N', b'G'], "photo.png", "image/png", "A photo")
        .await
        .expect("upload succeeds");

    assert!(url.starts_with("/uploads/"));
    assert!(url.ends_with(".png"));
    assert!(engine.html().contains(&format!("<img src=\"{}\" alt=\"A photo\">", url)));
    assert!(editor.is_dirty());
    assert_eq!(t.last_toast().as_deref(), Some("Image uploaded successfully"));
}
