use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use crate::config::TOAST_TTL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

/// Notification
///
/// One toast. Created for every user-visible outcome and removed again once
/// its own lifetime runs out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

/// ToastNotifier
///
/// Insertion-ordered list of live toasts. Each toast expires on its own
/// timer; there is no cap and no throttling. Clones share one list.
#[derive(Clone)]
pub struct ToastNotifier {
    ttl: Duration,
    entries: Arc<Mutex<Vec<Notification>>>,
}

impl Default for ToastNotifier {
    fn default() -> Self {
        Self::new(TOAST_TTL)
    }
}

impl ToastNotifier {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// notify
    ///
    /// Shows `message` immediately and schedules its removal after the TTL.
    pub fn notify(&self, message: impl Into<String>, kind: NotificationKind) -> Uuid {
        let notification = Notification {
            id: Uuid::new_v4(),
            message: message.into(),
            kind,
            created_at: Utc::now(),
        };
        let id = notification.id;

        match kind {
            NotificationKind::Error => tracing::error!(toast = %id, "{}", notification.message),
            _ => tracing::info!(toast = %id, "{}", notification.message),
        }

        self.entries.lock().push(notification);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let entries = Arc::clone(&self.entries);
                let ttl = self.ttl;
                handle.spawn(async move {
                    tokio::time::sleep(ttl).await;
                    entries.lock().retain(|n| n.id != id);
                });
            }
            // Outside a runtime the toast simply stays until dismissed.
            Err(_) => tracing::debug!(toast = %id, "No runtime; toast will not auto-expire"),
        }

        id
    }

    pub fn success(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, NotificationKind::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, NotificationKind::Error)
    }

    pub fn info(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, NotificationKind::Info)
    }

    pub fn dismiss(&self, id: Uuid) {
        self.entries.lock().retain(|n| n.id != id);
    }

    /// Live toasts, oldest first.
    pub fn visible(&self) -> Vec<Notification> {
        self.entries.lock().clone()
    }

    pub fn latest(&self) -> Option<Notification> {
        self.entries.lock().last().cloned()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
