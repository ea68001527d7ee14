//! Adhoc filters
//!
//! Filters as configured in the control panel. The base query builder turns
//! SIMPLE WHERE filters into structured query filters and everything else
//! into SQL fragments.

use super::metric::ExpressionType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operators understood by the query layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "==", alias = "=")]
    Eq,
    #[serde(rename = "!=", alias = "<>")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "ILIKE")]
    ILike,
    #[serde(rename = "IS NULL")]
    IsNull,
    #[serde(rename = "IS NOT NULL")]
    IsNotNull,
}

impl FilterOperator {
    /// Whether the operator compares against a value
    pub fn takes_value(&self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Like => "LIKE",
            Self::ILike => "ILIKE",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        };
        write!(f, "{}", s)
    }
}

/// Which SQL clause a filter belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterClause {
    #[default]
    Where,
    Having,
}

/// An adhoc filter as serialized by the control panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdhocFilter {
    pub expression_type: ExpressionType,
    #[serde(default)]
    pub clause: FilterClause,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<FilterOperator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparator: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_expression: Option<String>,
}

impl AdhocFilter {
    /// SIMPLE filter in the WHERE clause
    pub fn simple(subject: impl Into<String>, operator: FilterOperator, comparator: Value) -> Self {
        Self {
            expression_type: ExpressionType::Simple,
            clause: FilterClause::Where,
            subject: Some(subject.into()),
            operator: Some(operator),
            comparator: operator.takes_value().then_some(comparator),
            sql_expression: None,
        }
    }

    /// SQL filter in the WHERE clause
    pub fn sql(expression: impl Into<String>) -> Self {
        Self {
            expression_type: ExpressionType::Sql,
            clause: FilterClause::Where,
            subject: None,
            operator: None,
            comparator: None,
            sql_expression: Some(expression.into()),
        }
    }

    /// Move the filter to the HAVING clause
    pub fn having(mut self) -> Self {
        self.clause = FilterClause::Having;
        self
    }

    /// Render as a SQL fragment for the `extras.where` / `extras.having` slots
    pub fn to_sql_fragment(&self) -> Option<String> {
        match self.expression_type {
            ExpressionType::Sql => self
                .sql_expression
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| format!("({})", s)),
            ExpressionType::Simple => {
                let subject = self.subject.as_deref()?;
                let op = self.operator?;
                if !op.takes_value() {
                    return Some(format!("({} {})", subject, op));
                }
                let value = sql_literal(self.comparator.as_ref()?);
                Some(format!("({} {} {})", subject, op, value))
            }
        }
    }
}

fn sql_literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Array(items) => format!(
            "({})",
            items.iter().map(sql_literal).collect::<Vec<_>>().join(", ")
        ),
        Value::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}
