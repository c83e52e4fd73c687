use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use admin_console::debounce::Debouncer;
use tokio::time::sleep;

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

fn bump(count: &Arc<AtomicUsize>) -> impl std::future::Future<Output = ()> + Send + 'static {
    let count = Arc::clone(count);
    async move {
        count.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test(start_paused = true)]
async fn test_bursts_collapse_into_one_call() {
    let debouncer = Debouncer::new(Duration::from_millis(500));
    let fired = counter();

    debouncer.schedule(bump(&fired));
    sleep(Duration::from_millis(100)).await;
    debouncer.schedule(bump(&fired));
    sleep(Duration::from_millis(100)).await;
    debouncer.schedule(bump(&fired));

    sleep(Duration::from_millis(499)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert!(debouncer.is_pending());

    sleep(Duration::from_millis(10)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(!debouncer.is_pending());

    // Nothing else is queued behind it.
    sleep(Duration::from_secs(5)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fire_now_cancels_pending_and_runs_immediately() {
    let debouncer = Debouncer::new(Duration::from_millis(500));
    let scheduled = counter();
    let immediate = counter();

    debouncer.schedule(bump(&scheduled));
    debouncer.fire_now(bump(&immediate)).await;

    assert_eq!(immediate.load(Ordering::SeqCst), 1);
    assert!(!debouncer.is_pending());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(scheduled.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_drops_pending_action() {
    let debouncer = Debouncer::new(Duration::from_millis(500));
    let fired = counter();

    debouncer.schedule(bump(&fired));
    sleep(Duration::from_millis(200)).await;
    debouncer.cancel();

    sleep(Duration::from_secs(1)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert!(!debouncer.is_pending());
}

#[tokio::test(start_paused = true)]
async fn test_clones_share_one_timer() {
    let debouncer = Debouncer::new(Duration::from_millis(300));
    let other = debouncer.clone();
    let fired = counter();

    debouncer.schedule(bump(&fired));
    sleep(Duration::from_millis(200)).await;
    other.schedule(bump(&fired));

    sleep(Duration::from_millis(200)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    sleep(Duration::from_millis(150)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_last_handle_cancels() {
    let fired = counter();
    {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        debouncer.schedule(bump(&fired));
    }
    sleep(Duration::from_secs(1)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}
