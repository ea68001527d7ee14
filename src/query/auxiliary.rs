//! Auxiliary Query Planner
//!
//! Derives the side queries dispatched next to the primary query. The final
//! dispatch order is always `[primary, row_count?, totals?]`.

use super::mode::QueryMode;
use super::object::QueryObject;
use crate::form_data::TableConfig;

/// Grand-totals variant: whole-result aggregate, no grouping or paging
pub fn totals_query(primary: &QueryObject) -> QueryObject {
    QueryObject {
        columns: Vec::new(),
        row_limit: 0,
        row_offset: 0,
        post_processing: Vec::new(),
        orderby: Vec::new(),
        is_totals: true,
        ..primary.clone()
    }
}

/// Row-count variant: only the number of matching rows
pub fn row_count_query(primary: &QueryObject) -> QueryObject {
    QueryObject {
        columns: Vec::new(),
        metrics: Vec::new(),
        row_limit: 0,
        row_offset: 0,
        post_processing: Vec::new(),
        orderby: Vec::new(),
        is_rowcount: true,
        ..primary.clone()
    }
}

/// Assemble the ordered list of queries to dispatch
pub fn plan_dispatch(primary: QueryObject, mode: QueryMode, config: &TableConfig) -> Vec<QueryObject> {
    let totals = (mode == QueryMode::Aggregate && config.show_totals).then(|| totals_query(&primary));
    let row_count = config.server_pagination.then(|| row_count_query(&primary));

    let mut queries = Vec::with_capacity(3);
    queries.push(primary);
    queries.extend(row_count);
    queries.extend(totals);
    queries
}
