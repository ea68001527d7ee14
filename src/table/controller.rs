//! Table Controller
//!
//! The single "rebuild and redispatch" entry point of a table view. Page
//! changes, host state updates and refresh ticks all run the same cycle:
//!
//! ```text
//! own state → build query context → dispatch → reconcile → TableView
//! ```
//!
//! The own state sits behind one async mutex, so a refresh tick and a page
//! change never interleave and every dispatch carries a matching
//! limit/offset pair.

use super::error::{TableError, TableResult};
use super::reconcile::{reconcile, TableView};
use super::state::{DataMask, OwnState};
use crate::engine::QueryEngine;
use crate::form_data::TableConfig;
use crate::query::{build_query_context, FilterFingerprints, PagingState};
use crate::refresh::RefreshScheduler;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Drives one table view against a query engine
pub struct TableController {
    config: TableConfig,
    engine: Arc<dyn QueryEngine>,
    fingerprints: Arc<FilterFingerprints>,
    state: Mutex<OwnState>,
}

impl TableController {
    /// Create a controller with its own fingerprint cache
    pub fn new(config: TableConfig, engine: Arc<dyn QueryEngine>) -> Self {
        Self::with_fingerprints(config, engine, Arc::new(FilterFingerprints::new()))
    }

    /// Create a controller sharing a fingerprint cache with other charts
    pub fn with_fingerprints(
        config: TableConfig,
        engine: Arc<dyn QueryEngine>,
        fingerprints: Arc<FilterFingerprints>,
    ) -> Self {
        Self {
            config,
            engine,
            fingerprints,
            state: Mutex::new(OwnState::default()),
        }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Current paging state
    pub async fn paging(&self) -> PagingState {
        self.state.lock().await.paging(&self.config)
    }

    /// Current own state, as it would be written back to the host
    pub async fn own_state(&self) -> OwnState {
        *self.state.lock().await
    }

    /// Initial build with whatever paging state is held
    pub async fn load(&self) -> TableResult<TableView> {
        let mut state = self.state.lock().await;
        self.cycle(&mut state, false).await
    }

    /// Navigate to another page, keeping the page size
    pub async fn on_page_change(&self, page: usize) -> TableResult<TableView> {
        let mut state = self.state.lock().await;
        let size = state.paging(&self.config).page_size;
        state.merge(DataMask::page_change(page, size).own_state);
        self.cycle(&mut state, false).await
    }

    /// Apply a data mask, typically from a refresh tick.
    ///
    /// Refresh masks bypass the engine's cache.
    pub async fn refresh(&self, mask: DataMask) -> TableResult<TableView> {
        let mut state = self.state.lock().await;
        state.merge(mask.own_state);
        self.cycle(&mut state, mask.is_refresh()).await
    }

    /// Apply an own-state bag pushed by the host
    pub async fn apply_own_state(&self, bag: &Map<String, Value>) -> TableResult<TableView> {
        let mut state = self.state.lock().await;
        state.merge(OwnState::from_bag(bag));
        self.cycle(&mut state, false).await
    }

    /// Start auto-refresh for this view.
    ///
    /// Ticks feed a single worker task that re-runs the cycle; results
    /// arrive on the returned channel. Ticks that arrive while a cycle is
    /// running collapse into one. Dropping the scheduler cancels the timer
    /// and the worker, and the channel then closes.
    pub fn spawn_auto_refresh(
        self: &Arc<Self>,
    ) -> (RefreshScheduler, mpsc::UnboundedReceiver<TableResult<TableView>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (ticks, mut tick_rx) = mpsc::unbounded_channel::<DataMask>();

        let controller = Arc::clone(self);
        let task = tokio::spawn(async move {
            while let Some(mut mask) = tick_rx.recv().await {
                while let Ok(next) = tick_rx.try_recv() {
                    mask = next;
                }
                if tx.send(controller.refresh(mask).await).is_err() {
                    tracing::debug!("Refresh receiver dropped, stopping worker");
                    break;
                }
            }
        });

        let worker = RefreshWorker { ticks, task };
        let mut scheduler = RefreshScheduler::new();
        scheduler.start(
            self.config.refresh_interval,
            self.config.server_page_length,
            move |mask| worker.tick(mask),
        );

        (scheduler, rx)
    }

    async fn cycle(&self, state: &mut OwnState, force: bool) -> TableResult<TableView> {
        let build = build_query_context(&self.config, state.paging(&self.config), &self.fingerprints, force)?;

        // a filter change may have moved the query back to the first page
        state.current_page = Some(build.paging.current_page);
        state.page_size = Some(build.paging.page_size);

        let results = self
            .engine
            .execute_context(&build.context)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Query dispatch failed"))?;

        if results.len() != build.context.queries.len() {
            return Err(TableError::ResultMismatch {
                expected: build.context.queries.len(),
                actual: results.len(),
            });
        }

        let mut view = reconcile(&build.context.queries, results, build.paging);
        view.header_text = self.config.header_text.clone();

        tracing::debug!(
            rows = view.rows.len(),
            total_records = view.total_records,
            page = view.current_page,
            page_count = view.page_count,
            "Table view reconciled"
        );

        Ok(view)
    }
}

/// The task running refresh cycles, owned by the scheduler's callback
struct RefreshWorker {
    ticks: mpsc::UnboundedSender<DataMask>,
    task: JoinHandle<()>,
}

impl RefreshWorker {
    fn tick(&self, mask: DataMask) {
        if self.ticks.send(mask).is_err() {
            tracing::debug!("Refresh worker stopped, tick dropped");
        }
    }
}

impl Drop for RefreshWorker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
