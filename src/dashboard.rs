use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    auth::{AuthSession, unwrap_key},
    error::{ConsoleError, Result},
    models::{ActivityEntry, AppSettings, CleanupReport, DashboardStats, ExportReport, SystemStatus},
    notify::ToastNotifier,
    router::SectionController,
    table::{ConfirmState, LoadState, RequestSequence},
    validation,
};

fn decode<T: DeserializeOwned>(data: Value, key: &str) -> Result<T> {
    Ok(serde_json::from_value(unwrap_key(data, key))?)
}

fn report(notifier: &ToastNotifier, context: &str, error: &ConsoleError) {
    tracing::error!("{}: {}", context, error);
    notifier.error(error.user_message());
}

// --- Dashboard ---

/// DashboardView
///
/// The three dashboard widgets. A widget that failed keeps its previous
/// content (or stays empty).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardView {
    pub state: LoadState,
    pub stats: Option<DashboardStats>,
    pub activity: Vec<ActivityEntry>,
    pub system: Option<SystemStatus>,
}

/// DashboardController
///
/// Loads stats, recent activity and system status side by side. Each widget
/// succeeds or fails on its own; the section only counts as failed when all
/// three did.
pub struct DashboardController {
    session: AuthSession,
    notifier: ToastNotifier,
    active: AtomicBool,
    sequence: RequestSequence,
    view: Mutex<DashboardView>,
}

impl DashboardController {
    pub fn new(session: AuthSession, notifier: ToastNotifier) -> Self {
        Self {
            session,
            notifier,
            active: AtomicBool::new(false),
            sequence: RequestSequence::default(),
            view: Mutex::new(DashboardView::default()),
        }
    }

    pub fn view(&self) -> DashboardView {
        self.view.lock().clone()
    }

    pub async fn load(&self) -> LoadState {
        let seq = self.sequence.issue();
        self.view.lock().state = LoadState::Loading;

        let (stats, activity, system) = tokio::join!(
            self.session
                .authenticated_request(Method::GET, "/admin/stats", None),
            self.session
                .authenticated_request(Method::GET, "/admin/activity", None),
            self.session
                .authenticated_request(Method::GET, "/admin/system-status", None),
        );

        let stats = stats.and_then(|d| decode::<DashboardStats>(d, "stats"));
        let activity = activity.and_then(|d| decode::<Vec<ActivityEntry>>(d, "activities"));
        let system = system.and_then(|d| decode::<SystemStatus>(d, "status"));

        if !self.sequence.is_current(seq) {
            tracing::debug!(seq, "Discarding stale dashboard response");
            return self.view.lock().state;
        }

        let mut failures = Vec::new();
        {
            let mut view = self.view.lock();
            match stats {
                Ok(stats) => view.stats = Some(stats),
                Err(e) => failures.push(("Failed to load statistics", e)),
            }
            match activity {
                Ok(activity) => view.activity = activity,
                Err(e) => failures.push(("Failed to load recent activity", e)),
            }
            match system {
                Ok(system) => view.system = Some(system),
                Err(e) => failures.push(("Failed to load system status", e)),
            }
            view.state = if failures.len() == 3 {
                LoadState::Failed
            } else {
                LoadState::Loaded
            };
        }

        // A single 401 already logged the session out; one toast is enough.
        if failures.iter().any(|(_, e)| e.is_unauthorized()) {
            self.notifier.error(ConsoleError::Unauthorized.user_message());
        } else {
            for (context, e) in &failures {
                report(&self.notifier, context, e);
            }
        }

        self.view.lock().state
    }
}

#[async_trait]
impl SectionController for DashboardController {
    async fn activate(&self) {
        if !self.active.swap(true, Ordering::SeqCst) {
            self.load().await;
        }
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    async fn refresh(&self) {
        self.load().await;
    }
}

// --- Analytics ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalyticsPeriod {
    #[default]
    Week,
    Month,
    Quarter,
}

impl AnalyticsPeriod {
    pub fn as_param(self) -> &'static str {
        match self {
            AnalyticsPeriod::Week => "7d",
            AnalyticsPeriod::Month => "30d",
            AnalyticsPeriod::Quarter => "90d",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "7d" => Some(AnalyticsPeriod::Week),
            "30d" => Some(AnalyticsPeriod::Month),
            "90d" => Some(AnalyticsPeriod::Quarter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsView {
    pub state: LoadState,
    pub period: AnalyticsPeriod,
    pub stats: Option<DashboardStats>,
}

/// AnalyticsController
///
/// Platform statistics over a selectable period.
pub struct AnalyticsController {
    session: AuthSession,
    notifier: ToastNotifier,
    active: AtomicBool,
    sequence: RequestSequence,
    view: Mutex<AnalyticsView>,
}

impl AnalyticsController {
    pub fn new(session: AuthSession, notifier: ToastNotifier) -> Self {
        Self {
            session,
            notifier,
            active: AtomicBool::new(false),
            sequence: RequestSequence::default(),
            view: Mutex::new(AnalyticsView::default()),
        }
    }

    pub fn view(&self) -> AnalyticsView {
        self.view.lock().clone()
    }

    pub async fn set_period(&self, period: AnalyticsPeriod) -> LoadState {
        self.view.lock().period = period;
        self.load().await
    }

    pub async fn load(&self) -> LoadState {
        let seq = self.sequence.issue();
        let period = {
            let mut view = self.view.lock();
            view.state = LoadState::Loading;
            view.period
        };

        let query = [("period".to_string(), period.as_param().to_string())];
        let result = self
            .session
            .authenticated_get("/admin/stats", &query)
            .await
            .and_then(|d| decode::<DashboardStats>(d, "stats"));

        if !self.sequence.is_current(seq) {
            return self.view.lock().state;
        }

        let failure = {
            let mut view = self.view.lock();
            match result {
                Ok(stats) => {
                    view.stats = Some(stats);
                    view.state = LoadState::Loaded;
                    None
                }
                Err(e) => {
                    view.state = LoadState::Failed;
                    Some(e)
                }
            }
        };
        if let Some(e) = failure {
            report(&self.notifier, "Failed to load analytics", &e);
        }
        self.view.lock().state
    }
}

#[async_trait]
impl SectionController for AnalyticsController {
    async fn activate(&self) {
        if !self.active.swap(true, Ordering::SeqCst) {
            self.load().await;
        }
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    async fn refresh(&self) {
        self.load().await;
    }
}

// --- Settings & Maintenance ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsView {
    pub state: LoadState,
    pub settings: Option<AppSettings>,
}

/// SettingsController
///
/// Site settings plus the maintenance actions (cleanup, export).
pub struct SettingsController {
    session: AuthSession,
    notifier: ToastNotifier,
    confirm: ConfirmState,
    active: AtomicBool,
    sequence: RequestSequence,
    view: Mutex<SettingsView>,
}

impl SettingsController {
    pub fn new(session: AuthSession, notifier: ToastNotifier, confirm: ConfirmState) -> Self {
        Self {
            session,
            notifier,
            confirm,
            active: AtomicBool::new(false),
            sequence: RequestSequence::default(),
            view: Mutex::new(SettingsView::default()),
        }
    }

    pub fn view(&self) -> SettingsView {
        self.view.lock().clone()
    }

    pub async fn load(&self) -> LoadState {
        let seq = self.sequence.issue();
        self.view.lock().state = LoadState::Loading;

        let result = self
            .session
            .authenticated_request(Method::GET, "/admin/settings", None)
            .await
            .and_then(|d| decode::<AppSettings>(d, "settings"));

        let failure = {
            let mut view = self.view.lock();
            if !self.sequence.is_current(seq) {
                tracing::debug!(seq, "Discarding stale settings response");
                return view.state;
            }
            match result {
                Ok(settings) => {
                    view.settings = Some(settings);
                    view.state = LoadState::Loaded;
                    None
                }
                Err(e) => {
                    view.state = LoadState::Failed;
                    Some(e)
                }
            }
        };
        if let Some(e) = failure {
            report(&self.notifier, "Failed to load settings", &e);
        }
        self.view.lock().state
    }

    /// save
    ///
    /// Validates, then `PUT /admin/settings`. The view only changes once the
    /// server has accepted the new values; a load still in flight then counts
    /// as stale.
    pub async fn save(&self, settings: &AppSettings) -> bool {
        let result = async {
            validation::validate_settings(settings)?;
            let body = serde_json::to_value(settings)?;
            let data = self
                .session
                .authenticated_request(Method::PUT, "/admin/settings", Some(&body))
                .await?;
            match unwrap_key(data, "settings") {
                Value::Null => Ok::<AppSettings, ConsoleError>(settings.clone()),
                saved => Ok(serde_json::from_value::<AppSettings>(saved)?),
            }
        }
        .await;

        match result {
            Ok(saved) => {
                {
                    let mut view = self.view.lock();
                    self.sequence.issue();
                    view.settings = Some(saved);
                    view.state = LoadState::Loaded;
                }
                self.notifier.success("Settings saved successfully");
                true
            }
            Err(e) => {
                report(&self.notifier, "Failed to save settings", &e);
                false
            }
        }
    }

    /// cleanup
    ///
    /// `POST /admin/cleanup` after confirmation. Returns the number of
    /// records removed.
    pub async fn cleanup(&self) -> Option<u64> {
        if !self
            .confirm
            .confirm("Run database cleanup? Rejected comments and orphaned records will be removed.")
        {
            return None;
        }

        let result = self
            .session
            .authenticated_request(Method::POST, "/admin/cleanup", None)
            .await
            .and_then(|d| decode::<CleanupReport>(d, "cleanup"));

        match result {
            Ok(summary) => {
                self.notifier.success(format!(
                    "Cleanup completed: {} records removed",
                    summary.removed
                ));
                Some(summary.removed)
            }
            Err(e) => {
                report(&self.notifier, "Cleanup failed", &e);
                None
            }
        }
    }

    /// export
    ///
    /// `POST /admin/export`; the report carries the download location.
    pub async fn export(&self) -> Option<ExportReport> {
        let result = self
            .session
            .authenticated_request(Method::POST, "/admin/export", None)
            .await
            .and_then(|d| decode::<ExportReport>(d, "export"));

        match result {
            Ok(export) => {
                self.notifier
                    .success(format!("Export ready: {} records", export.records));
                Some(export)
            }
            Err(e) => {
                report(&self.notifier, "Export failed", &e);
                None
            }
        }
    }
}

#[async_trait]
impl SectionController for SettingsController {
    async fn activate(&self) {
        if !self.active.swap(true, Ordering::SeqCst) {
            self.load().await;
        }
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    async fn refresh(&self) {
        self.load().await;
    }
}
