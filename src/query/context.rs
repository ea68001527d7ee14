//! Query Context
//!
//! Runs the full build pipeline and wraps the resulting queries in the
//! envelope sent to the execution engine.
//!
//! ```text
//! TableConfig → mode → base query → compose → paginate → plan dispatch
//! ```

use super::auxiliary::plan_dispatch;
use super::base::build_base_query;
use super::composer::compose_query;
use super::error::QueryResult;
use super::mode::QueryMode;
use super::object::QueryObject;
use super::pagination::{paginate, FilterFingerprints, PagingState};
use crate::form_data::TableConfig;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Datasource reference parsed from `"<id>__<type>"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasourceRef {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
}

impl DatasourceRef {
    /// Parse a datasource key such as `"3__table"`
    pub fn parse(key: &str) -> Option<Self> {
        let (id, kind) = key.split_once("__")?;
        Some(Self {
            id: id.trim().parse().ok()?,
            kind: kind.to_string(),
        })
    }
}

/// Envelope dispatched to the execution engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DatasourceRef>,
    /// Bypass the engine's result cache
    pub force: bool,
    /// Queries in dispatch order: primary, then row count, then totals
    pub queries: Vec<QueryObject>,
    pub result_format: String,
    pub result_type: String,
}

impl QueryContext {
    /// The primary data query
    pub fn primary(&self) -> Option<&QueryObject> {
        self.queries.first()
    }

    /// The row-count query, if server pagination is on
    pub fn row_count(&self) -> Option<&QueryObject> {
        self.queries.iter().find(|q| q.is_rowcount)
    }

    /// The totals query, if grand totals are on
    pub fn totals(&self) -> Option<&QueryObject> {
        self.queries.iter().find(|q| q.is_totals)
    }
}

/// Result of one build
#[derive(Debug, Clone)]
pub struct QueryBuild {
    pub context: QueryContext,
    pub mode: QueryMode,
    /// Paging state the primary query was built for
    pub paging: PagingState,
    /// The filter set changed since the chart's previous build
    pub filters_changed: bool,
}

/// Build the query context for a chart
pub fn build_query_context(
    config: &TableConfig,
    paging: PagingState,
    fingerprints: &FilterFingerprints,
    force: bool,
) -> QueryResult<QueryBuild> {
    let request_id = Uuid::new_v4();
    let span = tracing::debug_span!("build_query", %request_id, slice_id = ?config.slice_id);
    let _guard = span.enter();

    let mode = QueryMode::resolve(config);
    let base = build_base_query(config, mode);
    let mut primary = compose_query(config, mode, base)?;
    let outcome = paginate(&mut primary, config, paging, fingerprints);

    tracing::debug!(
        %mode,
        row_limit = primary.row_limit,
        row_offset = primary.row_offset,
        filters_changed = outcome.filters_changed,
        "Primary query built"
    );

    let queries = plan_dispatch(primary, mode, config);

    let datasource = config.datasource.as_deref().and_then(|key| {
        let parsed = DatasourceRef::parse(key);
        if parsed.is_none() {
            tracing::warn!(datasource = key, "Unrecognised datasource key");
        }
        parsed
    });

    Ok(QueryBuild {
        context: QueryContext {
            datasource,
            force,
            queries,
            result_format: "json".to_string(),
            result_type: "full".to_string(),
        },
        mode,
        paging: outcome.paging,
        filters_changed: outcome.filters_changed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form_data::Metric;
    use serde_json::json;

    #[test]
    fn test_datasource_parse() {
        assert_eq!(
            DatasourceRef::parse("3__table"),
            Some(DatasourceRef {
                id: 3,
                kind: "table".into()
            })
        );
        assert_eq!(DatasourceRef::parse("table"), None);
        assert_eq!(DatasourceRef::parse("x__table"), None);
    }

    #[test]
    fn test_end_to_end_aggregate_with_pagination_and_totals() {
        let config = TableConfig::from_json(json!({
            "slice_id": 10,
            "datasource": "1__table",
            "query_mode": "aggregate",
            "metrics": ["count"],
            "server_pagination": true,
            "server_page_length": 50,
            "show_totals": true
        }))
        .unwrap();
        let fingerprints = FilterFingerprints::new();

        // an earlier build recorded the same (empty) filter set
        build_query_context(&config, PagingState::first_page(50), &fingerprints, false).unwrap();

        let build =
            build_query_context(&config, PagingState::new(2, 50), &fingerprints, false).unwrap();
        let queries = &build.context.queries;

        assert_eq!(build.mode, QueryMode::Aggregate);
        assert_eq!(queries.len(), 3);

        assert_eq!(queries[0].row_limit, 50);
        assert_eq!(queries[0].row_offset, 100);
        assert_eq!(queries[0].metrics, vec![Metric::saved("count")]);

        let markers: Vec<bool> = queries.iter().map(|q| q.is_rowcount).collect();
        assert_eq!(markers, vec![false, true, false]);

        let totals = &queries[2];
        assert_eq!(totals.row_limit, 0);
        assert_eq!(totals.row_offset, 0);
        assert!(totals.columns.is_empty());

        assert_eq!(build.context.row_count(), Some(&queries[1]));
        assert_eq!(build.context.totals(), Some(&queries[2]));
        assert_eq!(build.context.datasource.as_ref().map(|d| d.id), Some(1));
        assert!(!build.filters_changed);
        assert_eq!(build.paging, PagingState::new(2, 50));
    }

    #[test]
    fn test_filter_change_resets_build_paging() {
        let mut config = TableConfig::from_json(json!({
            "slice_id": 11,
            "metrics": ["count"],
            "server_pagination": true
        }))
        .unwrap();
        let fingerprints = FilterFingerprints::new();

        build_query_context(&config, PagingState::new(4, 50), &fingerprints, false).unwrap();

        config.adhoc_filters = vec![crate::form_data::AdhocFilter::simple(
            "country",
            crate::form_data::FilterOperator::Eq,
            json!("US"),
        )];
        let build =
            build_query_context(&config, PagingState::new(4, 50), &fingerprints, false).unwrap();

        assert!(build.filters_changed);
        assert_eq!(build.paging.current_page, 0);
        assert_eq!(build.context.queries[0].row_offset, 0);
        // the row-count query is derived after the reset
        assert_eq!(build.context.queries[1].row_offset, 0);
    }

    #[test]
    fn test_malformed_raw_ordering_surfaces() {
        let config = TableConfig::from_json(json!({
            "all_columns": ["name"],
            "order_by_cols": ["not json"]
        }))
        .unwrap();

        let result = build_query_context(
            &config,
            PagingState::first_page(50),
            &FilterFingerprints::new(),
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_context_wire_format() {
        let config = TableConfig::from_json(json!({"metrics": ["count"], "datasource": "2__table"})).unwrap();
        let build = build_query_context(
            &config,
            PagingState::first_page(50),
            &FilterFingerprints::new(),
            true,
        )
        .unwrap();

        let value = serde_json::to_value(&build.context).unwrap();
        assert_eq!(value["datasource"], json!({"id": 2, "type": "table"}));
        assert_eq!(value["force"], true);
        assert_eq!(value["result_format"], "json");
        assert_eq!(value["queries"][0]["orderby"], json!([["count", true]]));
    }
}
