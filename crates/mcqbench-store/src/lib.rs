//! Storage layer: MMLU-Pro split loading (Parquet, JSONL) and run artifacts.

mod artifacts;
mod dataset;
mod error;
mod report;

pub use artifacts::RunDir;
pub use dataset::{
    DatasetDir, SAMPLE_SPLIT_ROWS, questions_from_batches, read_jsonl, read_parquet,
};
pub use error::StoreError;
pub use report::{ReportMeta, format_duration, render_report};
