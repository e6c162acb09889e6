pub mod error;
pub mod metric;
pub mod snapshot;
