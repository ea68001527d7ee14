//! Pagination Coordinator
//!
//! Overlays row limit/offset onto a composed query from the persisted paging
//! state, and snaps back to the first page whenever the chart's filter set
//! changed since its previous build.

use super::object::{QueryFilter, QueryObject};
use crate::form_data::{ChartId, TableConfig};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Page position persisted by the host between builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagingState {
    /// Zero-based page index
    pub current_page: usize,
    /// Rows per page, always positive
    pub page_size: usize,
}

impl PagingState {
    /// Create a paging state; a zero page size is bumped to one
    pub fn new(current_page: usize, page_size: usize) -> Self {
        Self {
            current_page,
            page_size: page_size.max(1),
        }
    }

    /// First page at the given size
    pub fn first_page(page_size: usize) -> Self {
        Self::new(0, page_size)
    }

    /// Row offset of the current page
    pub fn row_offset(&self) -> usize {
        self.current_page.saturating_mul(self.page_size)
    }
}

/// Last-seen filter set per chart instance.
///
/// Unsaved charts (no id) share a single slot.
#[derive(Debug, Default)]
pub struct FilterFingerprints {
    entries: RwLock<HashMap<Option<ChartId>, Vec<QueryFilter>>>,
}

impl FilterFingerprints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint recorded for a chart, if any
    pub fn get(&self, chart: Option<ChartId>) -> Option<Vec<QueryFilter>> {
        self.entries.read().get(&chart).cloned()
    }

    /// Store a chart's filters, returning the previous fingerprint
    pub fn record(&self, chart: Option<ChartId>, filters: &[QueryFilter]) -> Option<Vec<QueryFilter>> {
        self.entries.write().insert(chart, filters.to_vec())
    }

    /// Number of charts with a recorded fingerprint
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// What pagination did to a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationOutcome {
    /// Paging state the query was built for (page 0 after a reset)
    pub paging: PagingState,
    /// The filter set differs from the chart's previous build
    pub filters_changed: bool,
}

/// Apply server-side pagination to a composed query.
///
/// The fingerprint comparison and update happen on every call, whether or
/// not server pagination is enabled. A chart without a previous fingerprint
/// is not considered changed.
pub fn paginate(
    query: &mut QueryObject,
    config: &TableConfig,
    paging: PagingState,
    fingerprints: &FilterFingerprints,
) -> PaginationOutcome {
    let previous = fingerprints.record(config.slice_id, &query.filters);
    let filters_changed = previous.is_some_and(|prev| prev != query.filters);

    if !config.server_pagination {
        return PaginationOutcome {
            paging,
            filters_changed,
        };
    }

    let paging = if filters_changed {
        tracing::debug!(
            slice_id = ?config.slice_id,
            from_page = paging.current_page,
            "Filters changed, resetting to first page"
        );
        PagingState::first_page(paging.page_size)
    } else {
        paging
    };

    query.row_limit = paging.page_size;
    query.row_offset = paging.row_offset();

    PaginationOutcome {
        paging,
        filters_changed,
    }
}
