//! History reconciliation view with pane selection and refresh cadence.

use watcher_core::Report;
use watcher_store::{HistoryFilter, ReportStore, StoreError};

/// Which pane the view is showing. The live log and history never merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPane {
    /// Bounded live detection log.
    LiveLog,
    /// Persisted report history.
    History,
}

/// Persisted-history snapshot refreshed on its own slower cadence.
///
/// A failed refresh keeps the previous snapshot; the view never goes blank
/// because the backend had a bad moment.
pub struct ReconciliationView {
    pane: ViewPane,
    history: Vec<Report>,
    history_loading: bool,
    last_refresh_ms: Option<u64>,
    refresh_interval_ms: u64,
    history_limit: usize,
}

impl ReconciliationView {
    /// Creates a view on the live-log pane with an empty history snapshot.
    pub fn new(refresh_interval_ms: u64, history_limit: usize) -> Self {
        Self {
            pane: ViewPane::LiveLog,
            history: Vec::new(),
            history_loading: false,
            last_refresh_ms: None,
            refresh_interval_ms,
            history_limit,
        }
    }

    /// Current pane.
    pub fn pane(&self) -> ViewPane {
        self.pane
    }

    /// Switches panes. Pure selection; no data moves between panes.
    pub fn set_pane(&mut self, pane: ViewPane) {
        self.pane = pane;
    }

    /// Current history snapshot, newest first.
    pub fn history(&self) -> &[Report] {
        &self.history
    }

    /// Returns `true` while a refresh is outstanding.
    pub fn history_loading(&self) -> bool {
        self.history_loading
    }

    /// Returns `true` when a refresh is due at `now_ms`.
    pub fn needs_refresh(&self, now_ms: u64) -> bool {
        match self.last_refresh_ms {
            Some(last) => now_ms.saturating_sub(last) >= self.refresh_interval_ms,
            None => true,
        }
    }

    /// Marks a refresh as started when one is due and none is outstanding.
    ///
    /// Returns `true` when the caller should fetch history and hand the
    /// outcome to [`complete_refresh`].
    ///
    /// [`complete_refresh`]: ReconciliationView::complete_refresh
    pub fn begin_refresh(&mut self, now_ms: u64) -> bool {
        if self.history_loading || !self.needs_refresh(now_ms) {
            return false;
        }
        self.history_loading = true;
        true
    }

    /// Applies a refresh outcome started by [`begin_refresh`].
    ///
    /// [`begin_refresh`]: ReconciliationView::begin_refresh
    pub fn complete_refresh(&mut self, outcome: Result<Vec<Report>, StoreError>, now_ms: u64) {
        self.history_loading = false;
        self.last_refresh_ms = Some(now_ms);
        match outcome {
            Ok(reports) => self.history = reports,
            Err(error) => {
                log::warn!("history refresh failed, keeping previous snapshot: {error}");
            }
        }
    }

    /// Convenience refresh: fetches from the store when due.
    pub fn refresh_history(
        &mut self,
        store: &dyn ReportStore,
        now_ms: u64,
        filter: HistoryFilter,
    ) {
        if !self.begin_refresh(now_ms) {
            return;
        }
        let outcome = store.recent(self.history_limit, filter);
        self.complete_refresh(outcome, now_ms);
    }
}
