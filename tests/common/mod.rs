#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use admin_console::{
    AdminConsole, AuthSession, AutoConfirm, ConfirmState, ConsoleConfig, MemoryTokenStore,
    Navigator, NavigatorState, TokenStore, TokenStoreState,
    stub::{StubControl, StubState, create_router, repository::RepositoryState},
};
use tokio::net::TcpListener;

pub use admin_console::stub::repository::{SEED_ADMIN, SEED_MODERATOR, SEED_READER};

/// TestStub
///
/// A seeded stub backend on an ephemeral port.
pub struct TestStub {
    pub address: String,
    pub control: StubControl,
    pub repo: RepositoryState,
}

impl TestStub {
    pub fn api_base_url(&self) -> String {
        format!("{}/api", self.address)
    }

    pub fn config(&self) -> ConsoleConfig {
        ConsoleConfig {
            api_base_url: self.api_base_url(),
            ..ConsoleConfig::default()
        }
    }

    pub fn requests(&self) -> usize {
        self.control.request_count()
    }
}

pub async fn spawn_stub() -> TestStub {
    let state = StubState::seeded();
    let control = state.control.clone();
    let repo = state.repo.clone();
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestStub {
        address,
        control,
        repo,
    }
}

/// RecordingNavigator
///
/// Counts forced navigations to the login entry point.
#[derive(Default)]
pub struct RecordingNavigator {
    redirects: AtomicUsize,
}

impl RecordingNavigator {
    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct TestSession {
    pub session: AuthSession,
    pub store: Arc<MemoryTokenStore>,
    pub navigator: Arc<RecordingNavigator>,
}

impl TestSession {
    pub fn stored_token(&self) -> Option<String> {
        self.store.load()
    }
}

pub fn session_for(stub: &TestStub) -> TestSession {
    let store = Arc::new(MemoryTokenStore::new());
    let navigator = Arc::new(RecordingNavigator::default());
    let session = AuthSession::new(
        stub.config(),
        store.clone() as TokenStoreState,
        navigator.clone() as NavigatorState,
    )
    .expect("session builds");

    TestSession {
        session,
        store,
        navigator,
    }
}

pub async fn signed_in(stub: &TestStub, credentials: (&str, &str)) -> TestSession {
    let test_session = session_for(stub);
    test_session
        .session
        .login(credentials.0, credentials.1)
        .await
        .expect("seeded account signs in");
    test_session
}

pub struct TestConsole {
    pub console: AdminConsole,
    pub store: Arc<MemoryTokenStore>,
    pub navigator: Arc<RecordingNavigator>,
}

impl TestConsole {
    pub fn toasts(&self) -> Vec<String> {
        self.console
            .notifier
            .visible()
            .into_iter()
            .map(|n| n.message)
            .collect()
    }

    pub fn last_toast(&self) -> Option<String> {
        self.console.notifier.latest().map(|n| n.message)
    }
}

pub async fn console_with(
    stub: &TestStub,
    credentials: (&str, &str),
    confirm: ConfirmState,
) -> TestConsole {
    let store = Arc::new(MemoryTokenStore::new());
    let navigator = Arc::new(RecordingNavigator::default());
    let console = AdminConsole::new(
        stub.config(),
        store.clone() as TokenStoreState,
        navigator.clone() as NavigatorState,
        confirm,
    )
    .expect("console builds");

    console
        .session
        .login(credentials.0, credentials.1)
        .await
        .expect("seeded account signs in");

    TestConsole {
        console,
        store,
        navigator,
    }
}

pub async fn admin_console(stub: &TestStub) -> TestConsole {
    console_with(stub, SEED_ADMIN, Arc::new(AutoConfirm)).await
}
