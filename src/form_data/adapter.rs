//! Form data ingestion
//!
//! The host serializes chart configuration inconsistently: raw columns may
//! arrive as `all_columns` or `allColumns`, the refresh interval as
//! `refresh_interval` or `refreshInterval`, numbers as strings. All of that
//! is reconciled here, once, into a canonical [`TableConfig`].

use super::filter::AdhocFilter;
use super::metric::Metric;
use crate::query::QueryMode;
use crate::refresh::RefreshInterval;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Page length used when the configuration does not provide one
pub const DEFAULT_PAGE_LENGTH: usize = 50;

/// Identifier of a chart instance (the host's `slice_id`)
pub type ChartId = u64;

/// How time-shifted series are compared against the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonType {
    /// Show shifted values side by side
    Values,
    /// Current minus shifted
    Difference,
    /// Current relative to shifted, as a percentage change
    Percentage,
    /// Current divided by shifted
    Ratio,
}

impl ComparisonType {
    /// Parse from the control-panel value
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "values" => Some(Self::Values),
            "difference" | "absolute" => Some(Self::Difference),
            "percentage" => Some(Self::Percentage),
            "ratio" => Some(Self::Ratio),
            _ => None,
        }
    }

    /// Name used in `compare` post-processing options
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Values => "values",
            Self::Difference => "difference",
            Self::Percentage => "percentage",
            Self::Ratio => "ratio",
        }
    }
}

/// Canonical, read-only chart configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TableConfig {
    /// Chart instance identifier, `None` for unsaved charts
    pub slice_id: Option<ChartId>,
    /// Datasource reference, e.g. `"3__table"`
    pub datasource: Option<String>,
    /// Explicit query mode, if the host sent a recognised one
    pub query_mode: Option<QueryMode>,
    /// Dimensions to group by (aggregate mode)
    pub groupby: Vec<String>,
    /// Selected metrics (aggregate mode)
    pub metrics: Vec<Metric>,
    /// Selected raw columns (raw mode)
    pub all_columns: Vec<String>,
    pub adhoc_filters: Vec<AdhocFilter>,
    pub time_range: Option<String>,
    /// Temporal column the time range applies to
    pub granularity: Option<String>,
    /// Metric to sort by in aggregate mode
    pub sort_by_metric: Option<Metric>,
    pub order_desc: bool,
    /// Serialized `[column, ascending]` pairs (raw mode)
    pub order_by_cols: Vec<String>,
    pub percent_metrics: Vec<Metric>,
    /// Time-comparison offsets, e.g. `"1 week ago"`
    pub time_compare: Vec<String>,
    pub comparison_type: Option<ComparisonType>,
    pub show_totals: bool,
    pub server_pagination: bool,
    pub server_page_length: usize,
    pub refresh_interval: RefreshInterval,
    pub row_limit: Option<usize>,
    pub header_text: Option<String>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            slice_id: None,
            datasource: None,
            query_mode: None,
            groupby: Vec::new(),
            metrics: Vec::new(),
            all_columns: Vec::new(),
            adhoc_filters: Vec::new(),
            time_range: None,
            granularity: None,
            sort_by_metric: None,
            order_desc: false,
            order_by_cols: Vec::new(),
            percent_metrics: Vec::new(),
            time_compare: Vec::new(),
            comparison_type: None,
            show_totals: false,
            server_pagination: false,
            server_page_length: DEFAULT_PAGE_LENGTH,
            refresh_interval: RefreshInterval::disabled(),
            row_limit: None,
            header_text: None,
        }
    }
}

impl TableConfig {
    /// Ingest host form data
    pub fn from_json(value: Value) -> Result<Self, FormDataError> {
        let raw: RawFormData = serde_json::from_value(value)?;
        Ok(raw.into())
    }

    /// Ingest host form data from a JSON string
    pub fn from_json_str(s: &str) -> Result<Self, FormDataError> {
        let raw: RawFormData = serde_json::from_str(s)?;
        Ok(raw.into())
    }

    /// Ingest host form data from a JSON file
    pub fn from_path(path: &Path) -> Result<Self, FormDataError> {
        let content = std::fs::read_to_string(path).map_err(|e| FormDataError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_json_str(&content)
    }
}

/// Errors raised while ingesting form data
#[derive(Debug, thiserror::Error)]
pub enum FormDataError {
    #[error("Failed to read form data {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Invalid form data: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

/// Form data exactly as the host sends it
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFormData {
    slice_id: Option<Value>,
    datasource: Option<String>,
    query_mode: Option<String>,
    groupby: Option<Vec<String>>,
    metrics: Option<Vec<Metric>>,
    all_columns: Option<Vec<String>>,
    #[serde(rename = "allColumns")]
    all_columns_camel: Option<Vec<String>>,
    adhoc_filters: Option<Vec<AdhocFilter>>,
    time_range: Option<String>,
    granularity_sqla: Option<String>,
    timeseries_limit_metric: Option<OneOrMany<Metric>>,
    order_desc: Option<bool>,
    order_by_cols: Option<Vec<String>>,
    percent_metrics: Option<Vec<Metric>>,
    time_compare: Option<OneOrMany<String>>,
    comparison_type: Option<String>,
    show_totals: Option<bool>,
    server_pagination: Option<bool>,
    server_page_length: Option<Value>,
    refresh_interval: Option<Value>,
    #[serde(rename = "refreshInterval")]
    refresh_interval_camel: Option<Value>,
    row_limit: Option<Value>,
    header_text: Option<String>,
}

impl From<RawFormData> for TableConfig {
    fn from(raw: RawFormData) -> Self {
        let all_columns = [raw.all_columns, raw.all_columns_camel]
            .into_iter()
            .flatten()
            .find(|cols| !cols.is_empty())
            .unwrap_or_default();

        let refresh_value = raw.refresh_interval.or(raw.refresh_interval_camel);

        Self {
            slice_id: raw.slice_id.as_ref().and_then(lenient_u64),
            datasource: raw.datasource,
            query_mode: raw.query_mode.as_deref().and_then(QueryMode::from_str),
            groupby: raw.groupby.unwrap_or_default(),
            metrics: raw.metrics.unwrap_or_default(),
            all_columns,
            adhoc_filters: raw.adhoc_filters.unwrap_or_default(),
            time_range: raw.time_range,
            granularity: raw.granularity_sqla,
            sort_by_metric: raw
                .timeseries_limit_metric
                .and_then(|m| m.into_vec().into_iter().next()),
            order_desc: raw.order_desc.unwrap_or(false),
            order_by_cols: raw.order_by_cols.unwrap_or_default(),
            percent_metrics: raw.percent_metrics.unwrap_or_default(),
            time_compare: raw
                .time_compare
                .map(OneOrMany::into_vec)
                .unwrap_or_default(),
            comparison_type: raw
                .comparison_type
                .as_deref()
                .and_then(ComparisonType::from_str),
            show_totals: raw.show_totals.unwrap_or(false),
            server_pagination: raw.server_pagination.unwrap_or(false),
            server_page_length: raw
                .server_page_length
                .as_ref()
                .and_then(lenient_u64)
                .filter(|n| *n > 0)
                .map(|n| n as usize)
                .unwrap_or(DEFAULT_PAGE_LENGTH),
            refresh_interval: RefreshInterval::from_value(refresh_value.as_ref()),
            row_limit: raw
                .row_limit
                .as_ref()
                .and_then(lenient_u64)
                .filter(|n| *n > 0)
                .map(|n| n as usize),
            header_text: raw.header_text,
        }
    }
}

/// Read a non-negative integer from a JSON number or numeric string
fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}
