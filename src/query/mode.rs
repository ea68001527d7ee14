//! Query mode resolution

use crate::form_data::TableConfig;
use serde::{Deserialize, Serialize};

/// Whether the table aggregates or lists raw records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Group by dimensions and compute metrics
    Aggregate,
    /// Return selected columns row by row
    Raw,
}

impl QueryMode {
    /// Parse the control-panel value; anything else is not a mode
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "aggregate" => Some(Self::Aggregate),
            "raw" => Some(Self::Raw),
            _ => None,
        }
    }

    /// Resolve the mode for a configuration.
    ///
    /// An explicit mode always wins. Without one, a non-empty raw column
    /// selection means raw mode.
    pub fn resolve(config: &TableConfig) -> Self {
        match config.query_mode {
            Some(mode) => mode,
            None if !config.all_columns.is_empty() => Self::Raw,
            None => Self::Aggregate,
        }
    }
}

impl std::fmt::Display for QueryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aggregate => write!(f, "aggregate"),
            Self::Raw => write!(f, "raw"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_explicit_mode_wins() {
        for columns_key in ["all_columns", "allColumns"] {
            let config = TableConfig::from_json(json!({
                "query_mode": "aggregate",
                columns_key: ["a"]
            }))
            .unwrap();
            assert_eq!(QueryMode::resolve(&config), QueryMode::Aggregate);
        }

        let config = TableConfig::from_json(json!({"query_mode": "raw"})).unwrap();
        assert_eq!(QueryMode::resolve(&config), QueryMode::Raw);
    }

    #[test]
    fn test_infers_raw_from_either_spelling() {
        let snake = TableConfig::from_json(json!({"all_columns": ["a"]})).unwrap();
        let camel = TableConfig::from_json(json!({"allColumns": ["a"]})).unwrap();

        assert_eq!(QueryMode::resolve(&snake), QueryMode::Raw);
        assert_eq!(QueryMode::resolve(&camel), QueryMode::Raw);
    }

    #[test]
    fn test_defaults_to_aggregate() {
        let config = TableConfig::from_json(json!({"all_columns": []})).unwrap();
        assert_eq!(QueryMode::resolve(&config), QueryMode::Aggregate);

        let config = TableConfig::from_json(json!({"query_mode": "bogus"})).unwrap();
        assert_eq!(QueryMode::resolve(&config), QueryMode::Aggregate);
    }
}
