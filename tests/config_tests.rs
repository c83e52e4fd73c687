use admin_console::config::{ConsoleConfig, Env, SEARCH_DEBOUNCE, TOAST_TTL, AUTOSAVE_INTERVAL};
use serial_test::serial;
use std::path::PathBuf;
use std::time::Duration;
use std::{env, panic};

const VARS: [&str; 5] = [
    "APP_ENV",
    "API_BASE_URL",
    "ADMIN_TOKEN_PATH",
    "ADMIN_PAGE_SIZE",
    "REQUEST_TIMEOUT_SECS",
];

// --- Setup/Teardown Utilities ---

/// Runs `test` with a clean slate for the console's variables and restores
/// the previous values afterwards, even if the test panics.
fn run_with_env<T, R>(set: &[(&str, &str)], test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> =
        VARS.iter().map(|&var| (var, env::var(var).ok())).collect();

    unsafe {
        for var in VARS {
            env::remove_var(var);
        }
        for (key, value) in set {
            env::set_var(key, value);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals.into_iter().rev() {
        unsafe {
            match original_value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_production_requires_api_base_url() {
    let result = run_with_env(&[("APP_ENV", "production")], || {
        panic::catch_unwind(ConsoleConfig::load)
    });

    let err = result.expect_err("production without API_BASE_URL must panic");
    let message = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_default();
    assert!(message.contains("FATAL: API_BASE_URL must be set in production."));
}

#[test]
#[serial]
fn test_production_with_url_loads() {
    let config = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("API_BASE_URL", "https://cms.example.com/api/"),
        ],
        ConsoleConfig::load,
    );

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.api_base_url, "https://cms.example.com/api");
    assert_eq!(config.url("/admin/users"), "https://cms.example.com/api/admin/users");
}

#[test]
#[serial]
fn test_local_defaults() {
    let config = run_with_env(&[], ConsoleConfig::load);

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.api_base_url, "http://localhost:5000/api");
    assert_eq!(config.token_path, PathBuf::from(".admin-console/storage.json"));
    assert_eq!(config.page_size, 20);
    assert_eq!(config.request_timeout, Duration::from_secs(30));
    assert_eq!(config.search_debounce, SEARCH_DEBOUNCE);
    assert_eq!(config.toast_ttl, TOAST_TTL);
    assert_eq!(config.autosave_interval, AUTOSAVE_INTERVAL);
}

#[test]
#[serial]
fn test_overrides_and_invalid_values() {
    let config = run_with_env(
        &[
            ("API_BASE_URL", "http://127.0.0.1:9999/api"),
            ("ADMIN_TOKEN_PATH", "/tmp/console-token.json"),
            ("ADMIN_PAGE_SIZE", "0"),
            ("REQUEST_TIMEOUT_SECS", "5"),
        ],
        ConsoleConfig::load,
    );

    assert_eq!(config.api_base_url, "http://127.0.0.1:9999/api");
    assert_eq!(config.token_path, PathBuf::from("/tmp/console-token.json"));
    // Zero is not a usable page size.
    assert_eq!(config.page_size, 20);
    assert_eq!(config.request_timeout, Duration::from_secs(5));

    let config = run_with_env(&[("ADMIN_PAGE_SIZE", "50")], ConsoleConfig::load);
    assert_eq!(config.page_size, 50);
}

#[test]
fn test_fixed_timings() {
    assert_eq!(SEARCH_DEBOUNCE, Duration::from_millis(500));
    assert_eq!(TOAST_TTL, Duration::from_secs(5));
    assert_eq!(AUTOSAVE_INTERVAL, Duration::from_secs(30));
}
