//! Table View
//!
//! Everything between a dispatch and the rendered page:
//!
//! - **State**: paging and refresh keys exchanged with the host
//! - **Reconcile**: result sets → rows, headers, totals, page navigation
//! - **Controller**: the rebuild/redispatch cycle shared by paging and refresh

mod controller;
mod error;
mod reconcile;
mod state;

pub use controller::TableController;
pub use error::{TableError, TableResult};
pub use reconcile::{page_count, reconcile, TableView, ViewStatus};
pub use state::{DataMask, OwnState};
