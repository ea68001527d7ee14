//! Table Query Planning
//!
//! Builds the queries behind a paginated table:
//!
//! - **Mode**: aggregate vs. raw resolution
//! - **Base**: configuration → base query object
//! - **Composer**: ordering, percent metrics, time comparison
//! - **Pagination**: row limit/offset and filter-change page reset
//! - **Auxiliary**: row-count and totals side queries
//! - **Context**: the full pipeline and the dispatch envelope
//!
//! # Example
//!
//! ```rust,ignore
//! use realtime_table::query::{build_query_context, FilterFingerprints, PagingState};
//!
//! let fingerprints = FilterFingerprints::new();
//! let build = build_query_context(&config, PagingState::new(2, 50), &fingerprints, false)?;
//!
//! // primary query first, then row count, then totals
//! for query in &build.context.queries {
//!     println!("limit={} offset={}", query.row_limit, query.row_offset);
//! }
//! ```

mod auxiliary;
mod base;
mod composer;
mod context;
mod error;
mod mode;
mod object;
mod pagination;

pub use auxiliary::{plan_dispatch, row_count_query, totals_query};
pub use base::build_base_query;
pub use composer::{compose_query, is_time_comparison, parse_order_by, time_compare_suffix};
pub use context::{build_query_context, DatasourceRef, QueryBuild, QueryContext};
pub use error::{QueryError, QueryResult};
pub use mode::QueryMode;
pub use object::{
    CompareOptions, ContributionOptions, OrderBy, OrderTarget, PostProcessingRule, QueryExtras,
    QueryFilter, QueryObject,
};
pub use pagination::{paginate, FilterFingerprints, PagingState, PaginationOutcome};
