//! Query Execution
//!
//! The boundary between query planning and whatever actually runs the
//! queries. Planning emits a [`QueryContext`]; an engine returns one row set
//! per query object, in dispatch order.

mod error;
mod memory;

pub use error::{EngineError, EngineResult};
pub use memory::{AggregateFunc, InMemoryEngine};

use crate::query::{QueryContext, QueryObject};
use async_trait::async_trait;

/// One result row: field name → value, in column order
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Executes query objects
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Execute a single query object
    async fn execute(&self, query: &QueryObject, force: bool) -> EngineResult<Vec<Row>>;

    /// Execute every query of a context sequentially, preserving order
    async fn execute_context(&self, context: &QueryContext) -> EngineResult<Vec<Vec<Row>>> {
        let mut results = Vec::with_capacity(context.queries.len());
        for query in &context.queries {
            results.push(self.execute(query, context.force).await?);
        }
        Ok(results)
    }
}
