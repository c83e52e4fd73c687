mod common;

use std::fs;
use std::sync::Arc;

use admin_console::{
    AuthSession, ConsoleError, FileTokenStore, MemoryTokenStore, NavigatorState, TokenStore,
    TokenStoreState, auth::TOKEN_KEY, models::Role,
};
use common::{SEED_ADMIN, SEED_MODERATOR, SEED_READER, RecordingNavigator, session_for, signed_in, spawn_stub};
use reqwest::Method;
use serde_json::{Value, json};

#[tokio::test]
async fn test_login_stores_token_and_user() {
    let stub = spawn_stub().await;
    let test = session_for(&stub);

    let session = test
        .session
        .login(SEED_ADMIN.0, SEED_ADMIN.1)
        .await
        .expect("admin signs in");

    assert_eq!(session.user.email, SEED_ADMIN.0);
    assert_eq!(session.user.role, Role::Admin);
    assert!(!session.token.is_empty());
    assert_eq!(test.stored_token().as_deref(), Some(session.token.as_str()));
    assert!(test.session.is_authenticated());
    assert_eq!(test.session.current(), Some(session));
    assert_eq!(test.navigator.redirects(), 0);
}

#[tokio::test]
async fn test_moderator_may_use_console() {
    let stub = spawn_stub().await;
    let test = signed_in(&stub, SEED_MODERATOR).await;

    assert_eq!(test.session.user().map(|u| u.role), Some(Role::Moderator));
}

#[tokio::test]
async fn test_wrong_password_is_a_request_failure() {
    let stub = spawn_stub().await;
    let test = session_for(&stub);

    let err = test
        .session
        .login(SEED_ADMIN.0, "not-the-password")
        .await
        .expect_err("login must fail");

    match &err {
        ConsoleError::RequestFailed { status, message } => {
            assert_eq!(*status, 401);
            assert_eq!(message, "Invalid email or password");
        }
        other => panic!("expected RequestFailed, got {:?}", other),
    }
    assert_eq!(err.user_message(), "Invalid email or password");
    assert!(test.stored_token().is_none());
    assert!(!test.session.is_authenticated());
    // A failed login is not a forced logout.
    assert_eq!(test.navigator.redirects(), 0);
}

#[tokio::test]
async fn test_reader_role_is_refused() {
    let stub = spawn_stub().await;
    let test = session_for(&stub);

    let err = test
        .session
        .login(SEED_READER.0, SEED_READER.1)
        .await
        .expect_err("reader may not use the console");

    assert!(matches!(err, ConsoleError::RequestFailed { status: 403, .. }));
    assert_eq!(err.user_message(), "Access denied. Admin privileges required.");
    assert!(test.stored_token().is_none());
    assert!(test.session.user().is_none());
}

#[tokio::test]
async fn test_restore_verifies_stored_token() {
    let stub = spawn_stub().await;
    let first = signed_in(&stub, SEED_ADMIN).await;
    let token = first.stored_token().expect("token stored");

    // A fresh process starting from the same storage.
    let store = Arc::new(MemoryTokenStore::with_token(token.clone()));
    let navigator = Arc::new(RecordingNavigator::default());
    let session = AuthSession::new(
        stub.config(),
        store.clone() as TokenStoreState,
        navigator.clone() as NavigatorState,
    )
    .unwrap();

    assert!(session.is_authenticated());
    assert!(session.user().is_none());

    let restored = session
        .restore()
        .await
        .expect("restore succeeds")
        .expect("session present");

    assert_eq!(restored.token, token);
    assert_eq!(restored.user.email, SEED_ADMIN.0);
    assert_eq!(navigator.redirects(), 0);
}

#[tokio::test]
async fn test_restore_without_token_makes_no_request() {
    let stub = spawn_stub().await;
    let test = session_for(&stub);
    let before = stub.requests();

    let restored = test.session.restore().await.expect("nothing to restore");

    assert!(restored.is_none());
    assert_eq!(stub.requests(), before);
    assert_eq!(test.navigator.redirects(), 0);
}

#[tokio::test]
async fn test_revoked_token_forces_logout_once() {
    let stub = spawn_stub().await;
    let test = signed_in(&stub, SEED_ADMIN).await;

    stub.control.revoke_tokens();

    let err = test
        .session
        .authenticated_get("/admin/users", &[])
        .await
        .expect_err("revoked token is rejected");

    assert!(err.is_unauthorized());
    assert!(test.stored_token().is_none());
    assert!(!test.session.is_authenticated());
    assert!(test.session.user().is_none());
    assert_eq!(test.navigator.redirects(), 1);

    // Further calls fail locally without reaching the server again.
    let before = stub.requests();
    let err = test
        .session
        .authenticated_request(Method::GET, "/auth/profile", None)
        .await
        .expect_err("no session left");
    assert!(err.is_unauthorized());
    assert_eq!(stub.requests(), before);
}

#[tokio::test]
async fn test_restore_with_revoked_token_clears_storage() {
    let stub = spawn_stub().await;
    let test = signed_in(&stub, SEED_MODERATOR).await;
    stub.control.revoke_tokens();

    let err = test.session.restore().await.expect_err("token no longer valid");

    assert!(matches!(err, ConsoleError::Unauthorized));
    assert!(test.stored_token().is_none());
    assert_eq!(test.navigator.redirects(), 1);
}

#[tokio::test]
async fn test_request_without_session_is_unauthorized() {
    let stub = spawn_stub().await;
    let test = session_for(&stub);
    let before = stub.requests();

    let err = test
        .session
        .authenticated_get("/admin/stats", &[])
        .await
        .expect_err("no token");

    assert!(err.is_unauthorized());
    assert_eq!(stub.requests(), before);
}

#[tokio::test]
async fn test_logout_clears_everything() {
    let stub = spawn_stub().await;
    let test = signed_in(&stub, SEED_ADMIN).await;

    test.session.logout();

    assert!(test.stored_token().is_none());
    assert!(test.session.current().is_none());
    assert_eq!(test.navigator.redirects(), 1);
}

#[tokio::test]
async fn test_server_message_is_surfaced() {
    let stub = spawn_stub().await;
    let test = signed_in(&stub, SEED_MODERATOR).await;

    // Moderators may not read the user list.
    let err = test
        .session
        .authenticated_get("/admin/users", &[])
        .await
        .expect_err("forbidden");

    assert!(matches!(err, ConsoleError::RequestFailed { status: 403, .. }));
    assert_eq!(err.user_message(), "Access denied. Admin privileges required.");
    assert!(test.session.is_authenticated());
    assert_eq!(test.navigator.redirects(), 0);
}

#[tokio::test]
async fn test_bare_success_envelope_yields_null() {
    let stub = spawn_stub().await;
    let test = signed_in(&stub, SEED_ADMIN).await;

    let data = test
        .session
        .authenticated_request(Method::DELETE, "/admin/comments/comment-39", None)
        .await
        .expect("delete succeeds");

    assert_eq!(data, Value::Null);
}

// --- Durable storage ---

fn temp_store_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir()
        .join(format!("admin-console-test-{}", uuid::Uuid::new_v4()))
        .join(name)
}

#[test]
fn test_file_store_preserves_other_keys() {
    let path = temp_store_path("storage.json");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, json!({ "theme": "dark" }).to_string()).unwrap();

    let store = FileTokenStore::new(&path);
    assert_eq!(store.load(), None);

    store.save("abc.def.ghi").unwrap();
    assert_eq!(store.load().as_deref(), Some("abc.def.ghi"));

    let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk["theme"], "dark");
    assert_eq!(on_disk[TOKEN_KEY], "abc.def.ghi");

    store.clear().unwrap();
    assert_eq!(store.load(), None);
    let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk, json!({ "theme": "dark" }));

    fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[test]
fn test_file_store_creates_missing_directories() {
    let path = temp_store_path("nested/storage.json");
    let store = FileTokenStore::new(&path);

    store.save("token").unwrap();
    assert_eq!(FileTokenStore::new(&path).load().as_deref(), Some("token"));

    // Clearing a store with no token is not an error.
    let empty = FileTokenStore::new(temp_store_path("missing.json"));
    assert!(empty.clear().is_ok());

    fs::remove_dir_all(path.parent().unwrap().parent().unwrap()).ok();
}
