//! # Realtime Table
//!
//! Query planning and refresh core of a paginated, auto-refreshing table
//! chart. A chart's form data is turned into the query objects an execution
//! engine runs, and the engine's row sets are turned back into a table page.
//!
//! ## Features
//!
//! - **Two query modes**: aggregate (group-by + metrics) and raw (column projection)
//! - **Server pagination**: limit/offset per page, reset to page 0 when filters change
//! - **Side queries**: total row count and a grand-totals row
//! - **Auto-refresh**: a cancellable periodic re-run of the whole query cycle
//!
//! ## Modules
//!
//! - [`form_data`]: chart configuration ingestion
//! - [`query`]: query mode, composition, pagination and dispatch planning
//! - [`engine`]: the execution boundary and an in-memory engine
//! - [`refresh`]: the refresh scheduler
//! - [`table`]: result reconciliation and the table controller
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use realtime_table::{InMemoryEngine, TableConfig, TableController};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TableConfig::from_json_str(
//!         r#"{"query_mode": "raw", "all_columns": ["name"], "server_pagination": true}"#,
//!     )?;
//!     let engine = InMemoryEngine::from_path("rows.json")?;
//!
//!     let controller = Arc::new(TableController::new(config, Arc::new(engine)));
//!     let view = controller.load().await?;
//!     println!("{}", view);
//!
//!     // re-run every refresh interval until the scheduler is dropped
//!     let (_scheduler, mut views) = controller.spawn_auto_refresh();
//!     while let Some(view) = views.recv().await {
//!         println!("{}", view?);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod form_data;
pub mod query;
pub mod refresh;
pub mod table;

// Re-export top-level types for convenience
pub use config::{Config, ConfigError, LoggingConfig, TableDefaults};

pub use engine::{EngineError, EngineResult, InMemoryEngine, QueryEngine, Row};

pub use form_data::{AdhocFilter, AdhocMetric, FormDataError, Metric, TableConfig};

pub use query::{
    build_query_context, FilterFingerprints, PagingState, QueryBuild, QueryContext, QueryError,
    QueryMode, QueryObject,
};

pub use refresh::{RefreshInterval, RefreshScheduler};

pub use table::{DataMask, OwnState, TableController, TableError, TableResult, TableView, ViewStatus};
