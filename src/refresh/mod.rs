//! Auto-refresh
//!
//! Periodic re-dispatch of a table's queries, independent of paging.

mod scheduler;

pub use scheduler::{RefreshCallback, RefreshInterval, RefreshScheduler};
