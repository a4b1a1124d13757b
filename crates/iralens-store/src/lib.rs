//! Storage layer: the append-only result sink and Arrow-based result files.

mod batch;
mod error;
mod files;
mod sink;

pub use batch::{batch_to_rows, rows_to_batch};
pub use error::StoreError;
pub use files::{OutputFormat, read_results, write_results};
pub use sink::ResultSink;
