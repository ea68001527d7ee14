//! Query Objects
//!
//! The request shapes sent to the execution engine. A table build produces
//! one primary query object plus optional row-count and totals variants.

use crate::form_data::{AdhocMetric, FilterOperator, Metric};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A structured filter predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    /// Column to filter on
    pub col: String,
    /// Comparison operator
    pub op: FilterOperator,
    /// Value to compare against (absent for `IS NULL` / `IS NOT NULL`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val: Option<Value>,
}

impl QueryFilter {
    /// Create a new filter
    pub fn new(col: impl Into<String>, op: FilterOperator, val: Value) -> Self {
        Self {
            col: col.into(),
            op,
            val: op.takes_value().then_some(val),
        }
    }
}

/// SQL fragments that could not be expressed as structured filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryExtras {
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub having: Option<String>,
}

impl QueryExtras {
    pub fn is_empty(&self) -> bool {
        self.where_clause.is_none() && self.having.is_none()
    }
}

/// What an ordering term sorts by: a column/saved metric name or an adhoc metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderTarget {
    Name(String),
    Adhoc(AdhocMetric),
}

impl OrderTarget {
    /// Result-row key this term sorts on
    pub fn label(&self) -> String {
        match self {
            Self::Name(name) => name.clone(),
            Self::Adhoc(adhoc) => adhoc.label(),
        }
    }
}

impl From<Metric> for OrderTarget {
    fn from(metric: Metric) -> Self {
        match metric {
            Metric::Saved(name) => Self::Name(name),
            Metric::Adhoc(adhoc) => Self::Adhoc(adhoc),
        }
    }
}

/// One ordering term, serialized as `[target, ascending]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy(pub OrderTarget, pub bool);

impl OrderBy {
    /// Order by a column name
    pub fn column(name: impl Into<String>, ascending: bool) -> Self {
        Self(OrderTarget::Name(name.into()), ascending)
    }

    /// Order by a metric
    pub fn metric(metric: Metric, ascending: bool) -> Self {
        Self(metric.into(), ascending)
    }

    pub fn target(&self) -> &OrderTarget {
        &self.0
    }

    pub fn ascending(&self) -> bool {
        self.1
    }
}

/// Options of the `contribution` post-processing step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionOptions {
    /// Input columns (metric labels)
    pub columns: Vec<String>,
    /// Output column for each input, in the same order
    pub rename_columns: Vec<String>,
}

/// Options of the `compare` post-processing step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareOptions {
    /// Current-period columns, paired index-wise with `compare_columns`
    pub source_columns: Vec<String>,
    /// Time-shifted columns
    pub compare_columns: Vec<String>,
    pub compare_type: String,
    pub drop_original_columns: bool,
}

/// A named transform applied to a result set after retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "options", rename_all = "snake_case")]
pub enum PostProcessingRule {
    /// Percentage of column total
    Contribution(ContributionOptions),
    /// Align time-shifted series against the current one
    Compare(CompareOptions),
}

impl PostProcessingRule {
    /// Operation name as sent on the wire
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Contribution(_) => "contribution",
            Self::Compare(_) => "compare",
        }
    }
}

/// A query for the execution engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryObject {
    /// Group-by dimensions (aggregate) or selected columns (raw)
    pub columns: Vec<String>,
    pub metrics: Vec<Metric>,
    pub filters: Vec<QueryFilter>,
    #[serde(default, skip_serializing_if = "QueryExtras::is_empty")]
    pub extras: QueryExtras,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<String>,
    pub orderby: Vec<OrderBy>,
    pub post_processing: Vec<PostProcessingRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_offsets: Vec<String>,
    /// Maximum rows to return, 0 for no limit
    pub row_limit: usize,
    pub row_offset: usize,
    /// Only the total matching row count is requested
    #[serde(default)]
    pub is_rowcount: bool,
    /// Single-row grand total over the whole result
    #[serde(default)]
    pub is_totals: bool,
}
