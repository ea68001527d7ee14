//! Metric definitions
//!
//! A metric is either the name of a saved metric on the datasource or an
//! adhoc metric built in the chart's control panel.

use serde::{Deserialize, Serialize};

/// A metric selected in the chart configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metric {
    /// Saved metric referenced by name (e.g. `"count"`)
    Saved(String),
    /// Adhoc metric defined inline
    Adhoc(AdhocMetric),
}

impl Metric {
    /// Create a saved metric reference
    pub fn saved(name: impl Into<String>) -> Self {
        Self::Saved(name.into())
    }

    /// Create a SIMPLE adhoc metric aggregating a column
    pub fn simple(aggregate: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Adhoc(AdhocMetric {
            expression_type: ExpressionType::Simple,
            column: Some(MetricColumn {
                column_name: column.into(),
            }),
            aggregate: Some(aggregate.into()),
            sql_expression: None,
            label: None,
        })
    }

    /// Create a SQL adhoc metric
    pub fn sql(expression: impl Into<String>) -> Self {
        Self::Adhoc(AdhocMetric {
            expression_type: ExpressionType::Sql,
            column: None,
            aggregate: None,
            sql_expression: Some(expression.into()),
            label: None,
        })
    }

    /// Attach a custom label (no-op for saved metrics, whose label is their name)
    pub fn with_label(self, label: impl Into<String>) -> Self {
        match self {
            Self::Saved(name) => Self::Saved(name),
            Self::Adhoc(mut adhoc) => {
                adhoc.label = Some(label.into());
                Self::Adhoc(adhoc)
            }
        }
    }

    /// Label under which the metric's values appear in result rows
    pub fn label(&self) -> String {
        match self {
            Self::Saved(name) => name.clone(),
            Self::Adhoc(adhoc) => adhoc.label(),
        }
    }
}

/// How an adhoc metric is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExpressionType {
    /// Aggregate function over a single column
    Simple,
    /// Free-form SQL expression
    Sql,
}

/// Column reference inside a SIMPLE adhoc metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricColumn {
    #[serde(alias = "columnName")]
    pub column_name: String,
}

/// An adhoc metric as serialized by the control panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdhocMetric {
    pub expression_type: ExpressionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<MetricColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl AdhocMetric {
    /// Custom label if set, otherwise `AGG(column)` or the SQL expression
    pub fn label(&self) -> String {
        if let Some(label) = self.label.as_deref().filter(|l| !l.is_empty()) {
            return label.to_string();
        }

        match self.expression_type {
            ExpressionType::Simple => format!(
                "{}({})",
                self.aggregate.as_deref().unwrap_or_default(),
                self.column
                    .as_ref()
                    .map(|c| c.column_name.as_str())
                    .unwrap_or_default()
            ),
            ExpressionType::Sql => self.sql_expression.clone().unwrap_or_default(),
        }
    }
}

/// Remove metrics whose label was already seen, keeping first occurrences
pub fn dedupe_by_label(metrics: impl IntoIterator<Item = Metric>) -> Vec<Metric> {
    let mut seen = std::collections::HashSet::new();
    metrics
        .into_iter()
        .filter(|m| seen.insert(m.label()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saved_metric_label() {
        assert_eq!(Metric::saved("count").label(), "count");
    }

    #[test]
    fn test_simple_metric_label() {
        assert_eq!(Metric::simple("SUM", "num").label(), "SUM(num)");
        assert_eq!(
            Metric::simple("SUM", "num").with_label("Total").label(),
            "Total"
        );
    }

    #[test]
    fn test_sql_metric_label() {
        assert_eq!(Metric::sql("COUNT(DISTINCT name)").label(), "COUNT(DISTINCT name)");
    }

    #[test]
    fn test_deserialize_mixed_metrics() {
        let json = serde_json::json!([
            "count",
            {
                "expressionType": "SIMPLE",
                "column": {"column_name": "num"},
                "aggregate": "SUM",
                "label": "SUM(num)",
                "optionName": "metric_abc"
            },
            {"expressionType": "SQL", "sqlExpression": "MAX(ds)"}
        ]);

        let metrics: Vec<Metric> = serde_json::from_value(json).unwrap();
        assert_eq!(metrics.len(), 3);
        assert_eq!(metrics[0], Metric::saved("count"));
        assert_eq!(metrics[1].label(), "SUM(num)");
        assert_eq!(metrics[2].label(), "MAX(ds)");
    }

    #[test]
    fn test_dedupe_by_label_keeps_first() {
        let metrics = dedupe_by_label(vec![
            Metric::saved("a"),
            Metric::simple("SUM", "x").with_label("a"),
            Metric::saved("b"),
        ]);
        assert_eq!(metrics, vec![Metric::saved("a"), Metric::saved("b")]);
    }
}
