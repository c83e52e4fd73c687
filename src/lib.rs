use std::sync::Arc;

// --- Module Structure ---

// Session, wire format and shared infrastructure.
pub mod auth;
pub mod config;
pub mod debounce;
pub mod error;
pub mod models;
pub mod notify;
pub mod validation;

// Resource tables and the sections built on them.
pub mod dashboard;
pub mod editor;
pub mod filter;
pub mod resource;
pub mod router;
pub mod table;

// In-process REST backend for tests and local development.
pub mod stub;

// --- Public Re-exports ---

pub use auth::{
    AuthSession, FileTokenStore, LoggingNavigator, MemoryTokenStore, Navigator, NavigatorState,
    Session, TokenStore, TokenStoreState,
};
pub use config::{ConsoleConfig, Env};
pub use error::{ConsoleError, Result};
pub use notify::{Notification, NotificationKind, ToastNotifier};
pub use router::{Section, SectionController, SectionRouter, SectionState};
pub use table::{AutoConfirm, ConfirmState, LoadState, ResourceTableController, RowAction};

use dashboard::{AnalyticsController, DashboardController, SettingsController};
use editor::{ArticleEditor, EditorEngine};
use models::{AdminUser, Category, CommentItem, ContentItem};

/// AdminConsole
///
/// The console assembled from its parts: one session, one toast list, one
/// controller per section and the router that switches between them. Built
/// once per mounted console and handed to whatever front end drives it.
#[derive(Clone)]
pub struct AdminConsole {
    pub session: AuthSession,
    pub notifier: ToastNotifier,
    pub users: ResourceTableController<AdminUser>,
    pub content: ResourceTableController<ContentItem>,
    pub comments: ResourceTableController<CommentItem>,
    pub categories: ResourceTableController<Category>,
    pub dashboard: Arc<DashboardController>,
    pub analytics: Arc<AnalyticsController>,
    pub settings: Arc<SettingsController>,
    pub router: Arc<SectionRouter>,
}

impl AdminConsole {
    /// new
    ///
    /// Wires every section to a shared session and notifier and registers
    /// the built-in sections with the router.
    pub fn new(
        config: ConsoleConfig,
        store: TokenStoreState,
        navigator: NavigatorState,
        confirm: ConfirmState,
    ) -> Result<Self> {
        let notifier = ToastNotifier::new(config.toast_ttl);
        let session = AuthSession::new(config, store, navigator)?;

        let users = ResourceTableController::new(
            session.clone(),
            resource::users(),
            notifier.clone(),
            confirm.clone(),
        );
        let content = ResourceTableController::new(
            session.clone(),
            resource::content(),
            notifier.clone(),
            confirm.clone(),
        );
        let comments = ResourceTableController::new(
            session.clone(),
            resource::comments(),
            notifier.clone(),
            confirm.clone(),
        );
        let categories = ResourceTableController::new(
            session.clone(),
            resource::categories(),
            notifier.clone(),
            confirm.clone(),
        );
        let dashboard = Arc::new(DashboardController::new(session.clone(), notifier.clone()));
        let analytics = Arc::new(AnalyticsController::new(session.clone(), notifier.clone()));
        let settings = Arc::new(SettingsController::new(
            session.clone(),
            notifier.clone(),
            confirm,
        ));

        let router = SectionRouter::new()
            .with_section(Section::Dashboard.id(), dashboard.clone() as SectionState)
            .with_section(Section::Users.id(), Arc::new(users.clone()) as SectionState)
            .with_section(Section::Content.id(), Arc::new(content.clone()) as SectionState)
            .with_section(Section::Comments.id(), Arc::new(comments.clone()) as SectionState)
            .with_section(Section::Categories.id(), Arc::new(categories.clone()) as SectionState)
            .with_section(Section::Analytics.id(), analytics.clone() as SectionState)
            .with_section(Section::Settings.id(), settings.clone() as SectionState);

        Ok(Self {
            session,
            notifier,
            users,
            content,
            comments,
            categories,
            dashboard,
            analytics,
            settings,
            router: Arc::new(router),
        })
    }

    /// start
    ///
    /// Verifies the stored token and opens the dashboard. Without a usable
    /// session the user is sent to login and `None` is returned.
    pub async fn start(&self) -> Option<Session> {
        match self.session.restore().await {
            Ok(Some(session)) => {
                self.router.activate(Section::Dashboard.id()).await;
                Some(session)
            }
            Ok(None) => {
                self.session.to_login();
                None
            }
            // A 401 has already navigated away.
            Err(ConsoleError::Unauthorized) => None,
            Err(e) => {
                tracing::error!("Failed to restore session: {}", e);
                self.notifier.error(e.user_message());
                None
            }
        }
    }

    /// An article editor bound to this console's session.
    pub fn editor<E: EditorEngine + 'static>(&self, engine: E) -> ArticleEditor<E> {
        ArticleEditor::new(self.session.clone(), self.notifier.clone(), engine)
    }
}
