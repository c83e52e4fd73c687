use std::time::Duration;

use admin_console::notify::{NotificationKind, ToastNotifier};
use tokio::time::sleep;

fn messages(notifier: &ToastNotifier) -> Vec<String> {
    notifier.visible().into_iter().map(|n| n.message).collect()
}

#[tokio::test(start_paused = true)]
async fn test_toast_expires_after_ttl() {
    let notifier = ToastNotifier::new(Duration::from_secs(5));
    notifier.success("User created successfully");

    let latest = notifier.latest().expect("toast is visible");
    assert_eq!(latest.kind, NotificationKind::Success);
    assert_eq!(latest.message, "User created successfully");

    sleep(Duration::from_millis(4_900)).await;
    assert_eq!(notifier.visible().len(), 1);

    sleep(Duration::from_millis(200)).await;
    assert!(notifier.visible().is_empty());
    assert!(notifier.latest().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_toasts_expire_independently() {
    let notifier = ToastNotifier::default();
    assert_eq!(notifier.ttl(), Duration::from_secs(5));

    notifier.error("Failed to load users");
    sleep(Duration::from_secs(2)).await;
    notifier.info("Draft saved");
    sleep(Duration::from_secs(2)).await;
    notifier.success("Settings saved successfully");

    assert_eq!(
        messages(&notifier),
        vec![
            "Failed to load users",
            "Draft saved",
            "Settings saved successfully"
        ]
    );

    // t = 5.5s: the first one is gone, the others remain in order.
    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(
        messages(&notifier),
        vec!["Draft saved", "Settings saved successfully"]
    );

    sleep(Duration::from_secs(2)).await;
    assert_eq!(messages(&notifier), vec!["Settings saved successfully"]);

    sleep(Duration::from_secs(2)).await;
    assert!(messages(&notifier).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_dismiss_removes_only_that_toast() {
    let notifier = ToastNotifier::default();
    let first = notifier.info("one");
    notifier.info("two");

    notifier.dismiss(first);
    assert_eq!(messages(&notifier), vec!["two"]);

    // Expiry of an already dismissed toast is harmless.
    sleep(Duration::from_secs(6)).await;
    assert!(messages(&notifier).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_no_cap_on_visible_toasts() {
    let notifier = ToastNotifier::default();
    for i in 0..25 {
        notifier.error(format!("failure {}", i));
    }
    assert_eq!(notifier.visible().len(), 25);
    assert_eq!(notifier.latest().unwrap().message, "failure 24");
}

#[test]
fn test_without_runtime_toast_stays_until_dismissed() {
    let notifier = ToastNotifier::default();
    let id = notifier.success("saved");
    assert_eq!(notifier.visible().len(), 1);
    notifier.dismiss(id);
    assert!(notifier.visible().is_empty());
}
