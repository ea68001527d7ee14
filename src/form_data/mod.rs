//! Chart Configuration
//!
//! Canonical representation of the host's form data:
//!
//! - **Adapter**: JSON form data → [`TableConfig`], reconciling field names
//! - **Metrics**: saved and adhoc metrics with label derivation
//! - **Filters**: adhoc filters and their operators

mod adapter;
mod filter;
mod metric;

pub use adapter::{ChartId, ComparisonType, FormDataError, TableConfig, DEFAULT_PAGE_LENGTH};
pub use filter::{AdhocFilter, FilterClause, FilterOperator};
pub use metric::{dedupe_by_label, AdhocMetric, ExpressionType, Metric, MetricColumn};
