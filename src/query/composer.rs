//! Query Composer
//!
//! Refines a base query object for the resolved mode:
//!
//! ```text
//! Aggregate: ordering → time comparison → percent metrics → assemble
//! Raw:       ordering parsed from serialized [column, ascending] pairs
//! ```

use super::error::{QueryError, QueryResult};
use super::mode::QueryMode;
use super::object::{
    CompareOptions, ContributionOptions, OrderBy, OrderTarget, PostProcessingRule, QueryObject,
};
use crate::form_data::{dedupe_by_label, ComparisonType, Metric, TableConfig};

/// Compose the primary query for a configuration
pub fn compose_query(
    config: &TableConfig,
    mode: QueryMode,
    base: QueryObject,
) -> QueryResult<QueryObject> {
    match mode {
        QueryMode::Aggregate => Ok(compose_aggregate(config, base)),
        QueryMode::Raw => compose_raw(config, base),
    }
}

fn compose_aggregate(config: &TableConfig, base: QueryObject) -> QueryObject {
    let ascending = !config.order_desc;
    let orderby = match (&config.sort_by_metric, base.metrics.first()) {
        (Some(sort_by), _) => vec![OrderBy::metric(sort_by.clone(), ascending)],
        (None, Some(first)) => vec![OrderBy::metric(first.clone(), ascending)],
        (None, None) => Vec::new(),
    };

    let comparison = is_time_comparison(config, &base);
    let mut post_processing = Vec::new();
    let mut time_offsets = Vec::new();

    if comparison {
        time_offsets = config.time_compare.clone();
        post_processing.push(time_compare_step(config, &base.metrics));
    }

    let mut metrics = base.metrics.clone();

    if !config.percent_metrics.is_empty() {
        let mut labels: Vec<String> = Vec::new();
        for metric in &config.percent_metrics {
            let label = metric.label();
            if !labels.contains(&label) {
                labels.push(label);
            }
        }

        if comparison {
            let mut expanded = Vec::with_capacity(labels.len() * (config.time_compare.len() + 1));
            for label in labels {
                let shifted: Vec<String> = config
                    .time_compare
                    .iter()
                    .map(|offset| time_compare_suffix(&label, offset))
                    .collect();
                expanded.push(label);
                expanded.extend(shifted);
            }
            labels = expanded;
        }

        post_processing.push(PostProcessingRule::Contribution(ContributionOptions {
            rename_columns: labels.iter().map(|l| format!("%{}", l)).collect(),
            columns: labels,
        }));

        metrics = dedupe_by_label(metrics.into_iter().chain(config.percent_metrics.clone()));
    }

    tracing::debug!(
        metrics = metrics.len(),
        steps = post_processing.len(),
        comparison,
        "Composed aggregate query"
    );

    QueryObject {
        metrics,
        orderby,
        post_processing,
        time_offsets,
        ..base
    }
}

fn compose_raw(config: &TableConfig, base: QueryObject) -> QueryResult<QueryObject> {
    let orderby = config
        .order_by_cols
        .iter()
        .map(|entry| parse_order_by(entry))
        .collect::<QueryResult<Vec<_>>>()?;

    Ok(QueryObject { orderby, ..base })
}

/// Parse a serialized `["column", ascending]` ordering entry
pub fn parse_order_by(entry: &str) -> QueryResult<OrderBy> {
    let malformed = |reason: String| QueryError::MalformedOrderBy {
        entry: entry.to_string(),
        reason,
    };

    let (target, ascending): (OrderTarget, bool) =
        serde_json::from_str(entry).map_err(|e| malformed(e.to_string()))?;

    if target.label().is_empty() {
        return Err(malformed("empty column name".to_string()));
    }

    Ok(OrderBy(target, ascending))
}

/// Whether time-shifted comparison columns apply to this query.
///
/// Requires a comparison type that derives new columns, at least one offset,
/// and at least one metric to shift.
pub fn is_time_comparison(config: &TableConfig, query: &QueryObject) -> bool {
    matches!(
        config.comparison_type,
        Some(ComparisonType::Difference | ComparisonType::Percentage | ComparisonType::Ratio)
    ) && !config.time_compare.is_empty()
        && !query.metrics.is_empty()
}

/// Column label of a metric shifted by a time offset
pub fn time_compare_suffix(label: &str, offset: &str) -> String {
    format!("{}__{}", label, offset)
}

fn time_compare_step(config: &TableConfig, metrics: &[Metric]) -> PostProcessingRule {
    let mut source_columns = Vec::new();
    let mut compare_columns = Vec::new();

    for metric in metrics {
        let label = metric.label();
        for offset in &config.time_compare {
            compare_columns.push(time_compare_suffix(&label, offset));
            source_columns.push(label.clone());
        }
    }

    PostProcessingRule::Compare(CompareOptions {
        source_columns,
        compare_columns,
        compare_type: config
            .comparison_type
            .map(|c| c.as_str().to_string())
            .unwrap_or_default(),
        drop_original_columns: true,
    })
}
