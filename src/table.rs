use std::ops::RangeInclusive;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

use crate::{
    auth::AuthSession,
    debounce::Debouncer,
    error::{ConsoleError, Result},
    filter::FilterState,
    models::Page,
    notify::ToastNotifier,
    resource::{ResourceClient, ResourceDescriptor, Transition},
    router::SectionController,
    validation::PayloadMode,
};

/// Page numbers shown on either side of the current page.
pub const PAGE_WINDOW_RADIUS: u32 = 2;

/// LoadState
///
/// `Idle -> Loading -> Loaded | Failed`, and back to `Loading` on any reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

// --- View Model ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub id: String,
    pub cells: Vec<String>,
}

/// PageButton
///
/// One pagination control. `target` is the page a click loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageButton {
    pub label: String,
    pub target: u32,
    pub active: bool,
    pub disabled: bool,
}

/// PaginationView
///
/// Previous, a window of up to five page numbers centred on the current
/// page, Next.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaginationView {
    pub buttons: Vec<PageButton>,
}

impl PaginationView {
    /// window
    ///
    /// `page - 2 ..= page + 2`, clamped to `[1, total_pages]`.
    pub fn window(page: u32, total_pages: u32) -> RangeInclusive<u32> {
        let page = page.clamp(1, total_pages.max(1));
        let start = page.saturating_sub(PAGE_WINDOW_RADIUS).max(1);
        let end = (page + PAGE_WINDOW_RADIUS).min(total_pages.max(1));
        start..=end
    }

    pub fn build(page: u32, total_pages: u32) -> Self {
        if total_pages == 0 {
            return Self::default();
        }
        let page = page.clamp(1, total_pages);

        let mut buttons = vec![PageButton {
            label: "Previous".to_string(),
            target: page.saturating_sub(1).max(1),
            active: false,
            disabled: page <= 1,
        }];
        buttons.extend(Self::window(page, total_pages).map(|n| PageButton {
            label: n.to_string(),
            target: n,
            active: n == page,
            disabled: false,
        }));
        buttons.push(PageButton {
            label: "Next".to_string(),
            target: (page + 1).min(total_pages),
            active: false,
            disabled: page >= total_pages,
        });

        Self { buttons }
    }

    pub fn labels(&self) -> Vec<&str> {
        self.buttons.iter().map(|b| b.label.as_str()).collect()
    }
}

/// TableView
///
/// Everything a front end needs to draw the table at one moment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableView {
    pub state: LoadState,
    pub columns: Vec<String>,
    pub rows: Vec<RenderedRow>,
    pub pagination: PaginationView,
    pub total_items: u64,
}

impl TableView {
    pub fn row(&self, id: &str) -> Option<&RenderedRow> {
        self.rows.iter().find(|r| r.id == id)
    }
}

// --- Row Actions ---

#[derive(Debug, Clone, PartialEq)]
pub enum RowAction {
    Edit(Value),
    Delete,
    Approve,
    Reject,
    ToggleStatus,
}

impl RowAction {
    /// Delete-class actions ask for confirmation first.
    pub fn is_destructive(&self) -> bool {
        matches!(self, RowAction::Delete)
    }

    fn success_message(&self, singular: &str) -> String {
        match self {
            RowAction::Edit(_) => format!("{} updated successfully", singular),
            RowAction::Delete => format!("{} deleted successfully", singular),
            RowAction::Approve => format!("{} approved", singular),
            RowAction::Reject => format!("{} rejected", singular),
            RowAction::ToggleStatus => format!("{} status updated", singular),
        }
    }
}

/// Confirm
///
/// Blocking yes/no prompt in front of destructive actions.
pub trait Confirm: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// AutoConfirm
///
/// Answers yes to every prompt (`--yes` on the command line).
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}

pub type ConfirmState = Arc<dyn Confirm>;

// --- Request Sequencing ---

/// RequestSequence
///
/// Numbers outgoing loads so that a slow, older response can never overwrite
/// a newer one: only the most recently issued number may apply its result.
#[derive(Debug, Default)]
pub(crate) struct RequestSequence {
    latest: AtomicU64,
}

impl RequestSequence {
    pub(crate) fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn is_current(&self, seq: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == seq
    }
}

// --- Controller ---

struct TableState<T> {
    filter: FilterState,
    load: LoadState,
    page: Option<Page<T>>,
    active: bool,
}

struct ControllerInner<T> {
    client: ResourceClient<T>,
    notifier: ToastNotifier,
    confirm: ConfirmState,
    search_debounce: Debouncer,
    sequence: RequestSequence,
    state: Mutex<TableState<T>>,
    view: watch::Sender<TableView>,
}

/// ResourceTableController
///
/// One paginated, filterable table bound to one resource collection. Owns the
/// table's `FilterState` and last `Page`, and turns every failure into a toast
/// instead of propagating it. Clones share the same table.
pub struct ResourceTableController<T> {
    inner: Arc<ControllerInner<T>>,
}

impl<T> Clone for ResourceTableController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> ResourceTableController<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(
        session: AuthSession,
        descriptor: ResourceDescriptor<T>,
        notifier: ToastNotifier,
        confirm: ConfirmState,
    ) -> Self {
        let config = session.config().clone();
        let (view, _) = watch::channel(TableView {
            columns: descriptor.columns.iter().map(|c| c.to_string()).collect(),
            ..TableView::default()
        });

        Self {
            inner: Arc::new(ControllerInner {
                client: ResourceClient::new(session, descriptor),
                notifier,
                confirm,
                search_debounce: Debouncer::new(config.search_debounce),
                sequence: RequestSequence::default(),
                state: Mutex::new(TableState {
                    filter: FilterState::new(config.page_size),
                    load: LoadState::Idle,
                    page: None,
                    active: false,
                }),
                view,
            }),
        }
    }

    pub fn descriptor(&self) -> &ResourceDescriptor<T> {
        self.inner.client.descriptor()
    }

    pub fn client(&self) -> &ResourceClient<T> {
        &self.inner.client
    }

    pub fn filter(&self) -> FilterState {
        self.inner.state.lock().filter.clone()
    }

    pub fn load_state(&self) -> LoadState {
        self.inner.state.lock().load
    }

    pub fn is_active(&self) -> bool {
        self.inner.state.lock().active
    }

    /// The last rendered view.
    pub fn view(&self) -> TableView {
        self.inner.view.borrow().clone()
    }

    /// Stream of views, one per state change.
    pub fn subscribe(&self) -> watch::Receiver<TableView> {
        self.inner.view.subscribe()
    }

    pub fn search_pending(&self) -> bool {
        self.inner.search_debounce.is_pending()
    }

    /// activate
    ///
    /// Loads the table when it becomes the current section; no-op when it
    /// already is.
    pub async fn activate(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.active {
                return;
            }
            state.active = true;
        }
        self.reload().await;
    }

    pub fn deactivate(&self) {
        self.inner.search_debounce.cancel();
        self.inner.state.lock().active = false;
    }

    /// reload
    ///
    /// Always re-fetches the current filter. Overlapping reloads are not
    /// coalesced; each gets a sequence number and only the latest one issued
    /// is allowed to apply its response.
    pub async fn reload(&self) -> LoadState {
        let name = self.descriptor().name;

        loop {
            let seq = self.inner.sequence.issue();
            let filter = {
                let mut state = self.inner.state.lock();
                state.load = LoadState::Loading;
                state.filter.clone()
            };
            self.publish();
            tracing::debug!(resource = name, seq, page = filter.page(), "Loading page");

            let result = self.inner.client.list(&filter).await;

            let (failure, refetch) = {
                let mut state = self.inner.state.lock();
                if !self.inner.sequence.is_current(seq) {
                    tracing::debug!(resource = name, seq, "Discarding stale response");
                    return state.load;
                }
                match result {
                    Ok(page) => {
                        let clamped = if page.total_pages > 0 {
                            state.filter.clamped(page.total_pages)
                        } else {
                            state.filter.clone()
                        };
                        let refetch = clamped.page() != filter.page();
                        state.filter = clamped;
                        state.page = Some(page);
                        state.load = LoadState::Loaded;
                        (None, refetch)
                    }
                    Err(e) => {
                        state.load = LoadState::Failed;
                        (Some(e), false)
                    }
                }
            };

            if refetch {
                // The page asked for no longer exists (e.g. last row deleted).
                tracing::debug!(resource = name, seq, "Page out of range; loading last page");
                continue;
            }

            self.publish();
            if let Some(e) = failure {
                self.report_failure(&format!("Failed to load {}", name), &e);
            }
            return self.load_state();
        }
    }

    /// Jumps to page `n` and reloads.
    pub async fn go_to_page(&self, n: u32) -> LoadState {
        {
            let mut state = self.inner.state.lock();
            state.filter = state.filter.with_page(n);
        }
        self.reload().await
    }

    pub async fn next_page(&self) -> LoadState {
        let page = self.filter().page();
        self.go_to_page(page + 1).await
    }

    pub async fn previous_page(&self) -> LoadState {
        let page = self.filter().page();
        self.go_to_page(page.saturating_sub(1)).await
    }

    /// search_input
    ///
    /// A keystroke in the search box. The filter (and page reset) applies at
    /// once; the reload waits for the debounce quiet period. Any load still in
    /// flight was issued for the old filter and is discarded when it lands.
    pub fn search_input(&self, text: &str) {
        {
            let mut state = self.inner.state.lock();
            state.filter = state.filter.with_search(text);
            self.inner.sequence.issue();
        }
        let this = self.clone();
        self.inner.search_debounce.schedule(async move {
            this.reload().await;
        });
    }

    /// search_submit
    ///
    /// Enter in the search box: cancels the pending debounce and reloads now.
    pub async fn search_submit(&self, text: &str) -> LoadState {
        {
            let mut state = self.inner.state.lock();
            state.filter = state.filter.with_search(text);
        }
        let this = self.clone();
        self.inner
            .search_debounce
            .fire_now(async move {
                this.reload().await;
            })
            .await;
        self.load_state()
    }

    /// set_filter
    ///
    /// Changes a field filter (empty value clears it), resets to page 1 and
    /// reloads. Names the descriptor does not declare are rejected with a toast.
    pub async fn set_filter(&self, name: &str, value: &str) -> LoadState {
        if !self.descriptor().supports_filter(name) {
            self.report_failure(
                "Unsupported filter",
                &ConsoleError::validation(format!("Unknown filter '{}'", name)),
            );
            return self.load_state();
        }
        {
            let mut state = self.inner.state.lock();
            state.filter = state.filter.with_field(name, value);
        }
        self.reload().await
    }

    pub async fn clear_filters(&self) -> LoadState {
        self.inner.search_debounce.cancel();
        {
            let mut state = self.inner.state.lock();
            state.filter = state.filter.cleared();
        }
        self.reload().await
    }

    /// Replaces the whole filter in one step and reloads.
    pub async fn apply_filter(&self, filter: FilterState) -> LoadState {
        self.inner.search_debounce.cancel();
        self.inner.state.lock().filter = filter;
        self.reload().await
    }

    /// create
    ///
    /// Validates, creates, toasts and reloads. Returns whether it succeeded.
    pub async fn create(&self, payload: &Value) -> bool {
        let singular = self.descriptor().singular;
        let result = async {
            let payload = (self.descriptor().prepare)(payload, PayloadMode::Create)?;
            self.inner.client.create(&payload).await
        }
        .await;

        match result {
            Ok(_) => {
                self.inner
                    .notifier
                    .success(format!("{} created successfully", singular));
                self.reload().await;
                true
            }
            Err(e) => {
                self.report_failure(&format!("Failed to create {}", singular.to_lowercase()), &e);
                false
            }
        }
    }

    /// perform
    ///
    /// Runs a row action: confirm (delete only), call the backend, then toast
    /// and reload on success, or toast and leave the table untouched on
    /// failure. Returns whether the action went through.
    pub async fn perform(&self, id: &str, action: RowAction) -> bool {
        let descriptor = *self.descriptor();

        if action.is_destructive() {
            let question = format!(
                "Are you sure you want to delete this {}? This action cannot be undone.",
                descriptor.singular.to_lowercase()
            );
            if !self.inner.confirm.confirm(&question) {
                tracing::debug!(resource = descriptor.name, id, "Delete cancelled");
                return false;
            }
        }

        match self.execute(id, &action).await {
            Ok(()) => {
                self.inner
                    .notifier
                    .success(action.success_message(descriptor.singular));
                self.reload().await;
                true
            }
            Err(e) => {
                self.report_failure(
                    &format!("{} action failed on {}", descriptor.name, id),
                    &e,
                );
                false
            }
        }
    }

    async fn execute(&self, id: &str, action: &RowAction) -> Result<()> {
        let client = &self.inner.client;
        let descriptor = client.descriptor();
        match action {
            RowAction::Edit(payload) => {
                let payload = (descriptor.prepare)(payload, PayloadMode::Update)?;
                client.update(id, &payload).await.map(drop)
            }
            RowAction::Delete => client.delete(id).await,
            RowAction::Approve => {
                self.require_transition("approve")?;
                client.transition(id, &Transition::Approve).await.map(drop)
            }
            RowAction::Reject => {
                self.require_transition("reject")?;
                client.transition(id, &Transition::Reject).await.map(drop)
            }
            RowAction::ToggleStatus => {
                self.require_transition("status")?;
                let next = self.next_status(id)?;
                client.transition(id, &Transition::Status(next)).await.map(drop)
            }
        }
    }

    fn require_transition(&self, action: &str) -> Result<()> {
        let descriptor = self.descriptor();
        if descriptor.supports_transition(action) {
            Ok(())
        } else {
            Err(ConsoleError::validation(format!(
                "{} does not support '{}'",
                descriptor.singular, action
            )))
        }
    }

    /// Target status for a row of the current page.
    fn next_status(&self, id: &str) -> Result<String> {
        let descriptor = *self.descriptor();
        let toggle = descriptor.next_status.ok_or_else(|| {
            ConsoleError::validation(format!("{} has no status toggle", descriptor.singular))
        })?;
        let state = self.inner.state.lock();
        state
            .page
            .as_ref()
            .and_then(|page| page.items.iter().find(|item| (descriptor.id_of)(item) == id))
            .map(toggle)
            .ok_or_else(|| {
                ConsoleError::validation(format!(
                    "{} is not on the current page",
                    descriptor.singular
                ))
            })
    }

    fn report_failure(&self, context: &str, error: &ConsoleError) {
        tracing::error!("{}: {}", context, error);
        self.inner.notifier.error(error.user_message());
    }

    fn publish(&self) {
        let descriptor = *self.descriptor();
        let view = {
            let state = self.inner.state.lock();
            let (rows, pagination, total_items) = match &state.page {
                Some(page) => (
                    page.items
                        .iter()
                        .map(|item| RenderedRow {
                            id: (descriptor.id_of)(item),
                            cells: (descriptor.project_row)(item),
                        })
                        .collect(),
                    if descriptor.paginated {
                        PaginationView::build(state.filter.page(), page.total_pages)
                    } else {
                        PaginationView::default()
                    },
                    page.total_items,
                ),
                None => (Vec::new(), PaginationView::default(), 0),
            };
            TableView {
                state: state.load,
                columns: descriptor.columns.iter().map(|c| c.to_string()).collect(),
                rows,
                pagination,
                total_items,
            }
        };
        self.inner.view.send_replace(view);
    }
}

impl<T> ResourceTableController<T>
where
    T: Clone + DeserializeOwned + Send + Sync + 'static,
{
    /// The last page received, if any.
    pub fn page(&self) -> Option<Page<T>> {
        self.inner.state.lock().page.clone()
    }

    pub fn row(&self, id: &str) -> Option<T> {
        let descriptor = *self.descriptor();
        self.inner
            .state
            .lock()
            .page
            .as_ref()
            .and_then(|page| page.items.iter().find(|item| (descriptor.id_of)(item) == id))
            .cloned()
    }
}

#[async_trait]
impl<T> SectionController for ResourceTableController<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    async fn activate(&self) {
        ResourceTableController::activate(self).await;
    }

    fn deactivate(&self) {
        ResourceTableController::deactivate(self);
    }

    async fn refresh(&self) {
        self.reload().await;
    }
}
