//! Base query construction
//!
//! Turns a chart configuration into the mode-appropriate base query object
//! (columns, metrics, filters, time range, row limit) that the composer then
//! refines.

use super::mode::QueryMode;
use super::object::{QueryExtras, QueryFilter, QueryObject};
use crate::form_data::{AdhocFilter, ExpressionType, FilterClause, TableConfig};

/// Build the base query for the resolved mode
pub fn build_base_query(config: &TableConfig, mode: QueryMode) -> QueryObject {
    let (columns, metrics) = match mode {
        QueryMode::Aggregate => (config.groupby.clone(), config.metrics.clone()),
        QueryMode::Raw => (config.all_columns.clone(), Vec::new()),
    };

    let (filters, extras) = split_filters(&config.adhoc_filters);

    QueryObject {
        columns,
        metrics,
        filters,
        extras,
        time_range: config.time_range.clone(),
        granularity: config.granularity.clone(),
        row_limit: config.row_limit.unwrap_or(0),
        ..Default::default()
    }
}

/// Structured filters for SIMPLE WHERE predicates, SQL fragments for the rest
fn split_filters(adhoc: &[AdhocFilter]) -> (Vec<QueryFilter>, QueryExtras) {
    let mut filters = Vec::new();
    let mut where_parts = Vec::new();
    let mut having_parts = Vec::new();

    for filter in adhoc {
        let simple_where = filter.expression_type == ExpressionType::Simple
            && filter.clause == FilterClause::Where;

        if simple_where {
            if let (Some(col), Some(op)) = (filter.subject.as_ref(), filter.operator) {
                filters.push(QueryFilter {
                    col: col.clone(),
                    op,
                    val: if op.takes_value() {
                        filter.comparator.clone()
                    } else {
                        None
                    },
                });
                continue;
            }
        }

        match (filter.clause, filter.to_sql_fragment()) {
            (FilterClause::Where, Some(fragment)) => where_parts.push(fragment),
            (FilterClause::Having, Some(fragment)) => having_parts.push(fragment),
            (_, None) => tracing::debug!(?filter, "Skipping incomplete adhoc filter"),
        }
    }

    let join = |parts: Vec<String>| (!parts.is_empty()).then(|| parts.join(" AND "));

    (
        filters,
        QueryExtras {
            where_clause: join(where_parts),
            having: join(having_parts),
        },
    )
}
