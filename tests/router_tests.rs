mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use admin_console::{
    Section, SectionController, SectionRouter, SectionState, router::title_for,
};
use async_trait::async_trait;
use common::{admin_console, spawn_stub};

#[derive(Default)]
struct FakeSection {
    activations: AtomicUsize,
    deactivations: AtomicUsize,
    refreshes: AtomicUsize,
}

impl FakeSection {
    fn counts(&self) -> (usize, usize, usize) {
        (
            self.activations.load(Ordering::SeqCst),
            self.deactivations.load(Ordering::SeqCst),
            self.refreshes.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl SectionController for FakeSection {
    async fn activate(&self) {
        self.activations.fetch_add(1, Ordering::SeqCst);
    }

    fn deactivate(&self) {
        self.deactivations.fetch_add(1, Ordering::SeqCst);
    }

    async fn refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }
}

fn router_with(ids: &[&str]) -> (SectionRouter, Vec<Arc<FakeSection>>) {
    let fakes: Vec<Arc<FakeSection>> = ids.iter().map(|_| Arc::new(FakeSection::default())).collect();
    let router = ids
        .iter()
        .zip(&fakes)
        .fold(SectionRouter::new(), |router, (id, fake)| {
            router.with_section(*id, fake.clone() as SectionState)
        });
    (router, fakes)
}

#[tokio::test]
async fn test_activate_switches_section_and_title() {
    let (router, fakes) = router_with(&["dashboard", "users"]);

    assert!(router.activate("dashboard").await);
    assert_eq!(router.active().as_deref(), Some("dashboard"));
    assert_eq!(router.title(), "Dashboard");
    assert_eq!(fakes[0].counts(), (1, 0, 0));

    assert!(router.activate("users").await);
    assert_eq!(router.active().as_deref(), Some("users"));
    assert_eq!(router.title(), "User Management");
    assert_eq!(fakes[0].counts(), (1, 1, 0));
    assert_eq!(fakes[1].counts(), (1, 0, 0));
}

#[tokio::test]
async fn test_unknown_section_is_ignored() {
    let (router, fakes) = router_with(&["dashboard"]);
    router.activate("dashboard").await;

    assert!(!router.activate("reports").await);

    assert_eq!(router.active().as_deref(), Some("dashboard"));
    assert_eq!(router.title(), "Dashboard");
    assert_eq!(fakes[0].counts(), (1, 0, 0));
}

#[tokio::test]
async fn test_reactivating_same_section_does_not_deactivate_it() {
    let (router, fakes) = router_with(&["comments"]);

    router.activate("comments").await;
    router.activate("comments").await;

    // The controller decides whether a repeat activation reloads.
    assert_eq!(fakes[0].counts(), (2, 0, 0));
}

#[tokio::test]
async fn test_refresh_targets_active_section_only() {
    let (router, fakes) = router_with(&["content", "categories"]);

    // Nothing active yet.
    router.refresh().await;
    assert_eq!(fakes[0].counts().2, 0);

    router.activate("categories").await;
    router.refresh().await;

    assert_eq!(fakes[0].counts().2, 0);
    assert_eq!(fakes[1].counts().2, 1);
}

#[tokio::test]
async fn test_register_and_listing() {
    let mut router = SectionRouter::new();
    router.register("settings", Arc::new(FakeSection::default()) as SectionState);
    router.register("analytics", Arc::new(FakeSection::default()) as SectionState);

    assert_eq!(router.section_ids(), vec!["analytics", "settings"]);
    assert!(router.controller("settings").is_some());
    assert!(router.controller("users").is_none());
    assert_eq!(router.active(), None);
}

#[test]
fn test_section_titles() {
    assert_eq!(Section::ALL.len(), 7);
    for section in Section::ALL {
        assert_eq!(Section::parse(section.id()), Some(section));
    }
    assert_eq!(title_for("comments"), "Comment Moderation");
    assert_eq!(title_for("content"), "Content Management");
    assert_eq!(title_for("custom-report"), "custom-report");
    assert_eq!(Section::parse("Users"), None);
}

#[tokio::test]
async fn test_console_registers_every_section() {
    let stub = spawn_stub().await;
    let t = admin_console(&stub).await;

    let mut expected: Vec<String> = Section::ALL.iter().map(|s| s.id().to_string()).collect();
    expected.sort();
    assert_eq!(t.console.router.section_ids(), expected);
}

#[tokio::test]
async fn test_switching_sections_loads_tables() {
    let stub = spawn_stub().await;
    let t = admin_console(&stub).await;
    let router = &t.console.router;

    assert!(router.activate(Section::Users.id()).await);
    assert!(t.console.users.is_active());
    assert_eq!(t.console.users.view().rows.len(), 20);

    assert!(router.activate(Section::Categories.id()).await);
    assert!(!t.console.users.is_active());
    assert!(t.console.categories.is_active());
    assert_eq!(t.console.categories.view().rows.len(), 3);
    assert_eq!(router.title(), "Categories");
}

#[tokio::test]
async fn test_start_restores_session_and_opens_dashboard() {
    let stub = spawn_stub().await;
    let t = admin_console(&stub).await;

    let session = t.console.start().await.expect("session restored");

    assert_eq!(session.user.email, common::SEED_ADMIN.0);
    assert_eq!(t.console.router.active().as_deref(), Some("dashboard"));
    assert!(t.console.dashboard.view().stats.is_some());
}

#[tokio::test]
async fn test_start_without_token_goes_to_login() {
    use admin_console::{AdminConsole, AutoConfirm, MemoryTokenStore, NavigatorState, TokenStoreState};

    let stub = spawn_stub().await;
    let navigator = Arc::new(common::RecordingNavigator::default());
    let console = AdminConsole::new(
        stub.config(),
        Arc::new(MemoryTokenStore::new()) as TokenStoreState,
        navigator.clone() as NavigatorState,
        Arc::new(AutoConfirm),
    )
    .unwrap();

    assert!(console.start().await.is_none());
    assert_eq!(navigator.redirects(), 1);
    assert_eq!(console.router.active(), None);
}
