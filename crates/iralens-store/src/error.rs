use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("unsupported results format: {0} (expected .csv or .parquet)")]
    UnsupportedFormat(std::path::PathBuf),

    #[error("results file has no '{0}' column")]
    MissingColumn(String),

    #[error("column '{column}' is not {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
    },

    #[error("column '{0}' has a null in a non-nullable position")]
    UnexpectedNull(String),
}
