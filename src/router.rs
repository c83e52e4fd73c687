use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

/// SectionController
///
/// What the router needs from a section's controller. `activate` loads the
/// section the first time it becomes current and is a no-op while it already
/// is; `refresh` always re-fetches.
#[async_trait]
pub trait SectionController: Send + Sync {
    async fn activate(&self);
    fn deactivate(&self);
    async fn refresh(&self);
}

pub type SectionState = Arc<dyn SectionController>;

/// Section
///
/// The console's built-in sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Dashboard,
    Users,
    Content,
    Comments,
    Categories,
    Analytics,
    Settings,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::Dashboard,
        Section::Users,
        Section::Content,
        Section::Comments,
        Section::Categories,
        Section::Analytics,
        Section::Settings,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Section::Dashboard => "dashboard",
            Section::Users => "users",
            Section::Content => "content",
            Section::Comments => "comments",
            Section::Categories => "categories",
            Section::Analytics => "analytics",
            Section::Settings => "settings",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Section::Dashboard => "Dashboard",
            Section::Users => "User Management",
            Section::Content => "Content Management",
            Section::Comments => "Comment Moderation",
            Section::Categories => "Categories",
            Section::Analytics => "Analytics",
            Section::Settings => "Settings",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }
}

/// title_for
///
/// Page title for a section id, falling back to the raw id.
pub fn title_for(id: &str) -> String {
    Section::parse(id)
        .map(|s| s.title().to_string())
        .unwrap_or_else(|| id.to_string())
}

#[derive(Default)]
struct RouterState {
    active: Option<String>,
    title: String,
}

/// SectionRouter
///
/// Switches the visible section. Exactly one section is active at a time; an
/// id with no registered controller is ignored.
#[derive(Default)]
pub struct SectionRouter {
    sections: HashMap<String, SectionState>,
    state: Mutex<RouterState>,
}

impl SectionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, controller: SectionState) {
        self.sections.insert(id.into(), controller);
    }

    pub fn with_section(mut self, id: impl Into<String>, controller: SectionState) -> Self {
        self.register(id, controller);
        self
    }

    pub fn controller(&self, id: &str) -> Option<SectionState> {
        self.sections.get(id).cloned()
    }

    pub fn section_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sections.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn active(&self) -> Option<String> {
        self.state.lock().active.clone()
    }

    pub fn title(&self) -> String {
        self.state.lock().title.clone()
    }

    /// activate
    ///
    /// Deactivates the previous section, marks `id` active, updates the page
    /// title and hands over to the section's controller. Returns false for an
    /// unknown id, leaving everything as it was.
    pub async fn activate(&self, id: &str) -> bool {
        let Some(controller) = self.controller(id) else {
            tracing::debug!(section = id, "Ignoring unknown section");
            return false;
        };

        let previous = {
            let mut state = self.state.lock();
            let previous = state.active.replace(id.to_string());
            state.title = title_for(id);
            previous
        };

        if let Some(previous) = previous.filter(|p| p != id) {
            if let Some(old) = self.controller(&previous) {
                old.deactivate();
            }
        }

        tracing::info!(section = id, "Section activated");
        controller.activate().await;
        true
    }

    /// Re-fetches the active section, if any.
    pub async fn refresh(&self) {
        let active = self.active();
        if let Some(controller) = active.as_deref().and_then(|id| self.controller(id)) {
            controller.refresh().await;
        }
    }
}
