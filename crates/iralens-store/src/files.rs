//! Result files: CSV or Parquet, chosen by extension.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::record_batch::RecordBatch;
use iralens_core::{ResultRow, results};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::info;

use crate::StoreError;
use crate::batch::{batch_to_rows, rows_to_batch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("parquet") | Some("pq") => Ok(Self::Parquet),
            _ => Err(StoreError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Write all rows to `path`, replacing any existing file.
pub fn write_results(path: &Path, rows: &[ResultRow]) -> Result<(), StoreError> {
    let format = OutputFormat::from_path(path)?;
    let batch = rows_to_batch(rows)?;
    let file = File::create(path)?;
    match format {
        OutputFormat::Csv => {
            let mut writer = WriterBuilder::new().with_header(true).build(file);
            writer.write(&batch)?;
        }
        OutputFormat::Parquet => {
            let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
            writer.write(&batch)?;
            writer.close()?;
        }
    }
    info!(path = %path.display(), rows = rows.len(), ?format, "wrote results");
    Ok(())
}

/// Read a results file written by [`write_results`].
pub fn read_results(path: &Path) -> Result<Vec<ResultRow>, StoreError> {
    let format = OutputFormat::from_path(path)?;
    let file = File::open(path)?;
    let batches: Vec<RecordBatch> = match format {
        OutputFormat::Csv => {
            let reader = ReaderBuilder::new(Arc::new(results::result_row_schema()))
                .with_header(true)
                .build(file)?;
            reader.collect::<Result<_, _>>()?
        }
        OutputFormat::Parquet => {
            let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
            reader.collect::<Result<_, _>>()?
        }
    };

    let mut rows = Vec::new();
    for batch in &batches {
        rows.extend(batch_to_rows(batch)?);
    }
    Ok(rows)
}
