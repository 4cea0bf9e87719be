use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no '{split}' split found in {}", dir.display())]
    SplitNotFound { split: String, dir: PathBuf },

    #[error("missing '{0}' column")]
    MissingColumn(&'static str),

    #[error("null '{column}' at row {row}")]
    NullValue { column: &'static str, row: usize },

    #[error("{}:{line}: {source}", path.display())]
    Jsonl {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
