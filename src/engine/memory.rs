//! In-Memory Engine
//!
//! Executes query objects against a set of JSON rows held in memory.
//!
//! # Execution Pipeline
//!
//! ```text
//! Rows → Filter → Group/Project → Order → Offset/Limit → Post-process
//! ```
//!
//! Row-count queries stop after grouping and return `{"rowcount": n}`.

use super::{EngineError, EngineResult, QueryEngine, Row};
use crate::form_data::{ExpressionType, FilterOperator, Metric};
use crate::query::{OrderBy, PostProcessingRule, QueryFilter, QueryObject};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

static NULL: Value = Value::Null;

/// Aggregate functions the engine can evaluate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Avg,
    Sum,
    Min,
    Max,
    /// Count of non-null values, or of rows when no column is given
    Count,
    CountDistinct,
}

impl AggregateFunc {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "avg" | "average" => Some(Self::Avg),
            "sum" => Some(Self::Sum),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "count" => Some(Self::Count),
            "count_distinct" => Some(Self::CountDistinct),
            _ => None,
        }
    }

    /// Apply aggregation to the values of one group
    pub fn apply(&self, values: &[&Value]) -> Value {
        let numbers = || values.iter().filter_map(|v| v.as_f64());

        match self {
            Self::Count => values.iter().filter(|v| !v.is_null()).count().into(),
            Self::CountDistinct => values
                .iter()
                .filter(|v| !v.is_null())
                .map(|v| v.to_string())
                .collect::<HashSet<_>>()
                .len()
                .into(),
            Self::Sum => {
                let mut iter = numbers().peekable();
                if iter.peek().is_none() {
                    return Value::Null;
                }
                number(iter.sum())
            }
            Self::Avg => {
                let (sum, n) = numbers().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                if n == 0 {
                    Value::Null
                } else {
                    number(sum / n as f64)
                }
            }
            Self::Min => numbers().reduce(f64::min).map(number).unwrap_or(Value::Null),
            Self::Max => numbers().reduce(f64::max).map(number).unwrap_or(Value::Null),
        }
    }
}

impl std::fmt::Display for AggregateFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Avg => write!(f, "AVG"),
            Self::Sum => write!(f, "SUM"),
            Self::Min => write!(f, "MIN"),
            Self::Max => write!(f, "MAX"),
            Self::Count => write!(f, "COUNT"),
            Self::CountDistinct => write!(f, "COUNT_DISTINCT"),
        }
    }
}

/// A metric resolved to something the engine can compute
#[derive(Debug, Clone)]
struct MetricPlan {
    label: String,
    func: AggregateFunc,
    /// `None` counts rows
    column: Option<String>,
}

impl MetricPlan {
    fn resolve(metric: &Metric) -> EngineResult<Self> {
        let label = metric.label();
        match metric {
            Metric::Saved(name) if name == "count" => Ok(Self {
                label,
                func: AggregateFunc::Count,
                column: None,
            }),
            // saved metrics following the `<agg>__<column>` naming, e.g. `sum__num`
            Metric::Saved(name) => name
                .split_once("__")
                .and_then(|(agg, column)| {
                    AggregateFunc::from_str(agg).map(|func| Self {
                        label: label.clone(),
                        func,
                        column: Some(column.to_string()),
                    })
                })
                .ok_or_else(|| EngineError::UnsupportedMetric(name.clone())),
            Metric::Adhoc(adhoc) => {
                if adhoc.expression_type == ExpressionType::Sql {
                    return Err(EngineError::UnsupportedMetric(label));
                }
                let func = adhoc
                    .aggregate
                    .as_deref()
                    .and_then(AggregateFunc::from_str)
                    .ok_or_else(|| EngineError::UnsupportedMetric(label.clone()))?;
                let column = adhoc
                    .column
                    .as_ref()
                    .map(|c| c.column_name.clone())
                    .ok_or_else(|| EngineError::UnsupportedMetric(label.clone()))?;
                Ok(Self {
                    label,
                    func,
                    column: Some(column),
                })
            }
        }
    }

    fn evaluate(&self, rows: &[&Row]) -> Value {
        match &self.column {
            None => rows.len().into(),
            Some(column) => {
                let values: Vec<&Value> = rows.iter().map(|row| field(row, column)).collect();
                self.func.apply(&values)
            }
        }
    }
}

/// Query engine over an in-memory row set.
///
/// The row set can be replaced while the engine is shared, so successive
/// refreshes observe new data.
#[derive(Clone, Default)]
pub struct InMemoryEngine {
    rows: Arc<RwLock<Vec<Row>>>,
}

impl InMemoryEngine {
    /// Create an engine over the given rows
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(rows)),
        }
    }

    /// Load rows from a JSON file holding an array of objects
    pub fn from_path(path: impl AsRef<Path>) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Parse rows from a JSON array of objects
    pub fn from_json_str(content: &str) -> EngineResult<Self> {
        Ok(Self::new(parse_rows(content)?))
    }

    /// Re-read the row set from a JSON file, returning the new row count
    pub async fn reload(&self, path: impl AsRef<Path>) -> EngineResult<usize> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let rows = parse_rows(&content)?;
        let count = rows.len();
        self.replace(rows).await;
        Ok(count)
    }

    /// Replace the whole row set
    pub async fn replace(&self, rows: Vec<Row>) {
        *self.rows.write().await = rows;
    }

    /// Append one row
    pub async fn push(&self, row: Row) {
        self.rows.write().await.push(row);
    }

    /// Number of rows held
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Run a query object against the current rows
    pub async fn run(&self, query: &QueryObject) -> EngineResult<Vec<Row>> {
        let start = Instant::now();

        if let Some(clause) = query.extras.where_clause.as_ref().or(query.extras.having.as_ref()) {
            return Err(EngineError::UnsupportedFilter(clause.clone()));
        }
        if let Some(rule) = query.post_processing.iter().find(|r| !matches!(r, PostProcessingRule::Contribution(_))) {
            return Err(EngineError::UnsupportedOperation(rule.operation().to_string()));
        }
        let plans = query
            .metrics
            .iter()
            .map(MetricPlan::resolve)
            .collect::<EngineResult<Vec<_>>>()?;

        let filters = query
            .filters
            .iter()
            .map(FilterPlan::compile)
            .collect::<EngineResult<Vec<_>>>()?;

        let rows = self.rows.read().await;
        let scanned = rows.len();

        // 1. Filter
        let matched: Vec<&Row> = rows.iter().filter(|row| matches_all(row, &filters)).collect();

        // 2. Group or project
        let mut result = if plans.is_empty() {
            project(&matched, &query.columns)
        } else {
            aggregate(&matched, &query.columns, &plans)?
        };

        if query.is_rowcount {
            let mut row = Row::new();
            row.insert("rowcount".into(), result.len().into());
            return Ok(vec![row]);
        }

        // 3. Order
        sort_rows(&mut result, &query.orderby);

        // 4. Offset and limit
        let limit = if query.row_limit == 0 { usize::MAX } else { query.row_limit };
        let mut result: Vec<Row> = result.into_iter().skip(query.row_offset).take(limit).collect();

        // 5. Post-process
        for rule in &query.post_processing {
            if let PostProcessingRule::Contribution(options) = rule {
                contribution(&mut result, &options.columns, &options.rename_columns);
            }
        }

        tracing::debug!(
            scanned,
            returned = result.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "In-memory query executed"
        );

        Ok(result)
    }
}

#[async_trait]
impl QueryEngine for InMemoryEngine {
    async fn execute(&self, query: &QueryObject, _force: bool) -> EngineResult<Vec<Row>> {
        self.run(query).await
    }
}

fn parse_rows(content: &str) -> EngineResult<Vec<Row>> {
    let value: Value = serde_json::from_str(content)?;
    let Value::Array(items) = value else {
        return Err(EngineError::InvalidDataset("expected a JSON array of rows".into()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(row) => Ok(row),
            other => Err(EngineError::InvalidDataset(format!(
                "row {} is not an object: {}",
                i, other
            ))),
        })
        .collect()
}

fn field<'a>(row: &'a Row, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&NULL)
}

/// Integral values come back as JSON integers
fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Some(Ordering::Equal) || a == b
}

/// A filter with its LIKE pattern compiled once per query
struct FilterPlan<'a> {
    filter: &'a QueryFilter,
    pattern: Option<Regex>,
}

impl<'a> FilterPlan<'a> {
    fn compile(filter: &'a QueryFilter) -> EngineResult<Self> {
        let case_insensitive = match filter.op {
            FilterOperator::Like => false,
            FilterOperator::ILike => true,
            _ => return Ok(Self { filter, pattern: None }),
        };
        let pattern = filter
            .val
            .as_ref()
            .and_then(Value::as_str)
            .map(|p| like_regex(p, case_insensitive))
            .transpose()?;

        Ok(Self { filter, pattern })
    }
}

/// Translate a LIKE pattern into an anchored regex.
///
/// `%` matches any run of characters, `_` exactly one; everything else is literal.
fn like_regex(pattern: &str, case_insensitive: bool) -> EngineResult<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push_str(if case_insensitive { "(?is)^" } else { "(?s)^" });

    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '%' => expr.push_str(".*"),
            '_' => expr.push('.'),
            c => expr.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    expr.push('$');

    Regex::new(&expr)
        .map_err(|e| EngineError::UnsupportedFilter(format!("LIKE pattern {:?}: {}", pattern, e)))
}

fn matches_all(row: &Row, filters: &[FilterPlan<'_>]) -> bool {
    filters.iter().all(|plan| matches_filter(row, plan))
}

fn matches_filter(row: &Row, plan: &FilterPlan<'_>) -> bool {
    let filter = plan.filter;
    let value = field(row, &filter.col);
    let target = filter.val.as_ref().unwrap_or(&NULL);

    let candidates: &[Value] = match target {
        Value::Array(items) => items,
        single => std::slice::from_ref(single),
    };
    let ordered = |accept: fn(Ordering) -> bool| compare_values(value, target).is_some_and(accept);

    match filter.op {
        FilterOperator::IsNull => value.is_null(),
        FilterOperator::IsNotNull => !value.is_null(),
        // SQL semantics: comparisons against NULL never match
        _ if value.is_null() => false,
        FilterOperator::Eq => values_equal(value, target),
        FilterOperator::Ne => !values_equal(value, target),
        FilterOperator::Gt => ordered(|o| o == Ordering::Greater),
        FilterOperator::Gte => ordered(|o| o != Ordering::Less),
        FilterOperator::Lt => ordered(|o| o == Ordering::Less),
        FilterOperator::Lte => ordered(|o| o != Ordering::Greater),
        FilterOperator::In => candidates.iter().any(|c| values_equal(value, c)),
        FilterOperator::NotIn => !candidates.iter().any(|c| values_equal(value, c)),
        FilterOperator::Like | FilterOperator::ILike => match (value.as_str(), &plan.pattern) {
            (Some(text), Some(pattern)) => pattern.is_match(text),
            _ => false,
        },
    }
}

fn project(rows: &[&Row], columns: &[String]) -> Vec<Row> {
    rows.iter()
        .map(|row| {
            if columns.is_empty() {
                return (*row).clone();
            }
            columns
                .iter()
                .map(|c| (c.clone(), field(row, c).clone()))
                .collect()
        })
        .collect()
}

/// Group rows by `columns` in first-seen order and evaluate every metric per group
fn aggregate(rows: &[&Row], columns: &[String], plans: &[MetricPlan]) -> EngineResult<Vec<Row>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Vec<Value>, Vec<&Row>)> = Vec::new();

    for row in rows {
        let key_values: Vec<Value> = columns.iter().map(|c| field(row, c).clone()).collect();
        let key = serde_json::to_string(&key_values)?;
        match index.get(&key) {
            Some(&i) => groups[i].1.push(row),
            None => {
                index.insert(key, groups.len());
                groups.push((key_values, vec![row]));
            }
        }
    }

    // a grand total still yields one row over an empty input
    if columns.is_empty() && groups.is_empty() {
        groups.push((Vec::new(), Vec::new()));
    }

    Ok(groups
        .into_iter()
        .map(|(key_values, members)| {
            let mut out: Row = columns.iter().cloned().zip(key_values).collect();
            for plan in plans {
                out.insert(plan.label.clone(), plan.evaluate(&members));
            }
            out
        })
        .collect())
}

/// Stable multi-key sort; nulls sort first ascending
fn sort_rows(rows: &mut [Row], orderby: &[OrderBy]) {
    if orderby.is_empty() {
        return;
    }
    let keys: Vec<(String, bool)> = orderby
        .iter()
        .map(|o| (o.target().label(), o.ascending()))
        .collect();

    rows.sort_by(|a, b| {
        for (label, ascending) in &keys {
            let (x, y) = (field(a, label), field(b, label));
            let ordering = match (x.is_null(), y.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => compare_values(x, y).unwrap_or(Ordering::Equal),
            };
            let ordering = if *ascending { ordering } else { ordering.reverse() };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Add each column's share of its column total under the renamed key
fn contribution(rows: &mut [Row], columns: &[String], renames: &[String]) {
    for (column, rename) in columns.iter().zip(renames) {
        let total: f64 = rows.iter().filter_map(|r| field(r, column).as_f64()).sum();
        for row in rows.iter_mut() {
            let share = match field(row, column).as_f64() {
                Some(v) if total != 0.0 => serde_json::Number::from_f64(v / total)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            };
            row.insert(rename.clone(), share);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{CompareOptions, ContributionOptions};
    use serde_json::json;

    fn dataset() -> InMemoryEngine {
        InMemoryEngine::from_json_str(
            &json!([
                {"name": "alice", "state": "CA", "num": 10},
                {"name": "bob", "state": "NY", "num": 5},
                {"name": "carol", "state": "CA", "num": 20},
                {"name": "dave", "state": "TX", "num": null},
                {"name": "erin", "state": "NY", "num": 15},
            ])
            .to_string(),
        )
        .unwrap()
    }

    fn names(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r["name"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_aggregate_functions() {
        let values = [json!(1), json!(2), json!(3), json!(null), json!(2)];
        let refs: Vec<&Value> = values.iter().collect();

        assert_eq!(AggregateFunc::Sum.apply(&refs), json!(8));
        assert_eq!(AggregateFunc::Avg.apply(&refs), json!(2));
        assert_eq!(AggregateFunc::Min.apply(&refs), json!(1));
        assert_eq!(AggregateFunc::Max.apply(&refs), json!(3));
        assert_eq!(AggregateFunc::Count.apply(&refs), json!(4));
        assert_eq!(AggregateFunc::CountDistinct.apply(&refs), json!(3));
        assert_eq!(AggregateFunc::Sum.apply(&[&json!(null)]), Value::Null);
        assert_eq!(AggregateFunc::Avg.apply(&[&json!(1), &json!(2)]), json!(1.5));
    }

    fn like(value: Value, pattern: &str, case_insensitive: bool) -> bool {
        let op = if case_insensitive { FilterOperator::ILike } else { FilterOperator::Like };
        let filter = QueryFilter::new("name", op, json!(pattern));
        let plan = FilterPlan::compile(&filter).unwrap();

        let mut row = Row::new();
        row.insert("name".into(), value);
        matches_filter(&row, &plan)
    }

    #[test]
    fn test_like_patterns() {
        assert!(like(json!("alice"), "a%", false));
        assert!(like(json!("alice"), "%lic%", false));
        assert!(like(json!("alice"), "_lice", false));
        assert!(!like(json!("alice"), "A%", false));
        assert!(like(json!("alice"), "A%", true));
        assert!(!like(json!(5), "5", false));
        assert!(like(json!("line\nbreak"), "line%", false));
    }

    #[test]
    fn test_like_literals_are_escaped() {
        assert!(like(json!("a.c"), "a.c", false));
        assert!(!like(json!("abc"), "a.c", false));
        assert!(like(json!("(x)+[y]"), "(x)+[y]", false));
        assert!(!like(json!("xalice"), "alice", false));
        assert!(!like(json!("alicex"), "alice", false));
    }

    #[test]
    fn test_like_many_wildcards_is_linear() {
        let text = "a".repeat(40);
        let started = Instant::now();

        assert!(!like(json!(text), "%a%a%a%a%a%a%a%a%b", false));
        assert!(like(json!(text), "%a%a%a%a%a%a%a%a%", false));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_raw_projection_with_filters() {
        let engine = dataset();
        let query = QueryObject {
            columns: vec!["name".into(), "num".into()],
            filters: vec![QueryFilter::new("num", FilterOperator::Gte, json!(10))],
            ..Default::default()
        };

        let rows = engine.run(&query).await.unwrap();
        assert_eq!(names(&rows), vec!["alice", "carol", "erin"]);
        assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["name", "num"]);
    }

    #[tokio::test]
    async fn test_filter_operators() {
        let engine = dataset();
        let run = |filter: QueryFilter| {
            let engine = engine.clone();
            async move {
                let query = QueryObject {
                    filters: vec![filter],
                    ..Default::default()
                };
                engine.run(&query).await.unwrap().len()
            }
        };

        assert_eq!(run(QueryFilter::new("state", FilterOperator::Eq, json!("CA"))).await, 2);
        assert_eq!(run(QueryFilter::new("state", FilterOperator::Ne, json!("CA"))).await, 3);
        assert_eq!(run(QueryFilter::new("num", FilterOperator::Lt, json!(10))).await, 1);
        assert_eq!(run(QueryFilter::new("state", FilterOperator::In, json!(["NY", "TX"]))).await, 3);
        assert_eq!(run(QueryFilter::new("state", FilterOperator::NotIn, json!(["NY"]))).await, 3);
        assert_eq!(run(QueryFilter::new("num", FilterOperator::IsNull, Value::Null)).await, 1);
        assert_eq!(run(QueryFilter::new("num", FilterOperator::IsNotNull, Value::Null)).await, 4);
        assert_eq!(run(QueryFilter::new("name", FilterOperator::Like, json!("%e"))).await, 2);
    }

    #[tokio::test]
    async fn test_group_by_with_ordering() {
        let engine = dataset();
        let query = QueryObject {
            columns: vec!["state".into()],
            metrics: vec![Metric::saved("count"), Metric::simple("SUM", "num")],
            orderby: vec![OrderBy::metric(Metric::simple("SUM", "num"), false)],
            ..Default::default()
        };

        let rows = engine.run(&query).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], json!({"state": "CA", "count": 2, "SUM(num)": 30}).as_object().unwrap().clone());
        assert_eq!(rows[1]["state"], "NY");
        // all-null sum sorts last descending
        assert_eq!(rows[2]["state"], "TX");
        assert_eq!(rows[2]["SUM(num)"], Value::Null);
    }

    #[tokio::test]
    async fn test_limit_and_offset() {
        let engine = dataset();
        let query = QueryObject {
            orderby: vec![OrderBy::column("name", true)],
            row_limit: 2,
            row_offset: 2,
            ..Default::default()
        };

        let rows = engine.run(&query).await.unwrap();
        assert_eq!(names(&rows), vec!["carol", "dave"]);

        let past_end = QueryObject {
            row_offset: 10,
            ..query
        };
        assert!(engine.run(&past_end).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_row_count_ignores_paging() {
        let engine = dataset();
        let query = QueryObject {
            filters: vec![QueryFilter::new("state", FilterOperator::Ne, json!("TX"))],
            row_limit: 1,
            row_offset: 1,
            is_rowcount: true,
            ..Default::default()
        };

        let rows = engine.run(&query).await.unwrap();
        assert_eq!(rows, vec![json!({"rowcount": 4}).as_object().unwrap().clone()]);
    }

    #[tokio::test]
    async fn test_totals_over_empty_input() {
        let engine = InMemoryEngine::default();
        let query = QueryObject {
            metrics: vec![Metric::saved("count"), Metric::saved("sum__num")],
            is_totals: true,
            ..Default::default()
        };

        let rows = engine.run(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["count"], 0);
        assert_eq!(rows[0]["sum__num"], Value::Null);
    }

    #[tokio::test]
    async fn test_contribution() {
        let engine = dataset();
        let query = QueryObject {
            columns: vec!["state".into()],
            metrics: vec![Metric::saved("sum__num")],
            post_processing: vec![PostProcessingRule::Contribution(ContributionOptions {
                columns: vec!["sum__num".into()],
                rename_columns: vec!["%sum__num".into()],
            })],
            ..Default::default()
        };

        let rows = engine.run(&query).await.unwrap();
        assert_eq!(rows[0]["%sum__num"], json!(0.6));
        assert_eq!(rows[1]["%sum__num"], json!(0.4));
        assert_eq!(rows[2]["%sum__num"], Value::Null);
    }

    #[tokio::test]
    async fn test_unsupported_inputs() {
        let engine = dataset();

        let sql_metric = QueryObject {
            metrics: vec![Metric::sql("SUM(num) * 2")],
            ..Default::default()
        };
        assert!(matches!(engine.run(&sql_metric).await, Err(EngineError::UnsupportedMetric(_))));

        let compare = QueryObject {
            post_processing: vec![PostProcessingRule::Compare(CompareOptions {
                source_columns: vec!["count".into()],
                compare_columns: vec!["count__1 week ago".into()],
                compare_type: "difference".into(),
                drop_original_columns: true,
            })],
            ..Default::default()
        };
        assert!(matches!(
            engine.run(&compare).await,
            Err(EngineError::UnsupportedOperation(op)) if op == "compare"
        ));

        let mut where_sql = QueryObject::default();
        where_sql.extras.where_clause = Some("(num > 1)".into());
        assert!(matches!(engine.run(&where_sql).await, Err(EngineError::UnsupportedFilter(_))));
    }

    #[tokio::test]
    async fn test_replace_rows_between_runs() {
        let engine = dataset();
        let query = QueryObject::default();
        assert_eq!(engine.run(&query).await.unwrap().len(), 5);

        engine.push(json!({"name": "frank"}).as_object().unwrap().clone()).await;
        assert_eq!(engine.run(&query).await.unwrap().len(), 6);

        engine.replace(Vec::new()).await;
        assert!(engine.is_empty().await);
    }

    #[tokio::test]
    async fn test_reload_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", json!([{"name": "alice"}, {"name": "bob"}])).unwrap();

        let engine = InMemoryEngine::from_path(file.path()).unwrap();
        assert_eq!(engine.len().await, 2);

        std::fs::write(file.path(), json!([{"name": "carol"}]).to_string()).unwrap();
        assert_eq!(engine.reload(file.path()).await.unwrap(), 1);
        assert_eq!(engine.len().await, 1);

        std::fs::write(file.path(), "not json").unwrap();
        assert!(matches!(engine.reload(file.path()).await, Err(EngineError::Serialization(_))));
        assert_eq!(engine.len().await, 1);
    }

    #[test]
    fn test_invalid_dataset() {
        assert!(matches!(
            InMemoryEngine::from_json_str(r#"{"name": "alice"}"#),
            Err(EngineError::InvalidDataset(_))
        ));
        assert!(matches!(
            InMemoryEngine::from_json_str(r#"[1, 2]"#),
            Err(EngineError::InvalidDataset(_))
        ));
    }
}
