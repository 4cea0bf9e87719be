//! MMLU-Pro split loading from a local data directory.
//!
//! Accepts the layout published on the HuggingFace hub
//! (`data/test-00000-of-00001.parquet`, `data/validation-….parquet`) as well
//! as flat `test.parquet` / `test.jsonl` files. Rows come back as
//! [`RawQuestion`]s in file order; normalization happens in the core crate.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use arrow::array::{
    Array, ArrayRef, Int32Array, Int64Array, LargeListArray, LargeStringArray, ListArray,
    StringArray,
};
use arrow::record_batch::RecordBatch;
use mcqbench_core::RawQuestion;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::info;

use crate::StoreError;

/// Test rows kept when a reduced smoke-test slice is requested.
pub const SAMPLE_SPLIT_ROWS: usize = 10;

/// A directory holding MMLU-Pro split files.
#[derive(Debug, Clone)]
pub struct DatasetDir {
    root: PathBuf,
}

impl DatasetDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files making up `split`, searched in the root and its `data/` subdirectory.
    ///
    /// Preference order per directory: `{split}.jsonl`, `{split}.parquet`,
    /// then sorted `{split}-*.parquet` shards.
    pub fn split_files(&self, split: &str) -> Result<Vec<PathBuf>, StoreError> {
        for dir in [self.root.clone(), self.root.join("data")] {
            if !dir.is_dir() {
                continue;
            }

            let jsonl = dir.join(format!("{split}.jsonl"));
            if jsonl.is_file() {
                return Ok(vec![jsonl]);
            }
            let single = dir.join(format!("{split}.parquet"));
            if single.is_file() {
                return Ok(vec![single]);
            }

            let prefix = format!("{split}-");
            let mut shards: Vec<PathBuf> = std::fs::read_dir(&dir)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| {
                    p.extension().and_then(|e| e.to_str()) == Some("parquet")
                        && p.file_name()
                            .and_then(|n| n.to_str())
                            .is_some_and(|n| n.starts_with(&prefix))
                })
                .collect();
            if !shards.is_empty() {
                shards.sort();
                return Ok(shards);
            }
        }

        Err(StoreError::SplitNotFound {
            split: split.to_string(),
            dir: self.root.clone(),
        })
    }

    /// Load every row of `split`.
    pub fn load_split(&self, split: &str) -> Result<Vec<RawQuestion>, StoreError> {
        let files = self.split_files(split)?;
        let mut rows = Vec::new();
        for path in &files {
            if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
                rows.extend(read_jsonl(path)?);
            } else {
                rows.extend(questions_from_batches(&read_parquet(path)?)?);
            }
        }
        info!(split, rows = rows.len(), files = files.len(), "loaded dataset split");
        Ok(rows)
    }
}

/// Read all record batches from a Parquet file.
pub fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>, StoreError> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches: Result<Vec<RecordBatch>, _> = reader.collect();
    Ok(batches?)
}

/// Read one JSON object per line. Blank lines are skipped.
pub fn read_jsonl(path: &Path) -> Result<Vec<RawQuestion>, StoreError> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(&line).map_err(|source| StoreError::Jsonl {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        rows.push(row);
    }
    Ok(rows)
}

/// Convert MMLU-Pro record batches into raw questions.
///
/// Requires `question`, `options`, `answer_index`, and `category`;
/// `question_id`, `answer`, `cot_content`, and `src` are optional.
pub fn questions_from_batches(batches: &[RecordBatch]) -> Result<Vec<RawQuestion>, StoreError> {
    let mut rows = Vec::new();

    for batch in batches {
        let question_col = required(batch, "question")?;
        let options_col = required(batch, "options")?;
        let answer_index_col = required(batch, "answer_index")?;
        let category_col = required(batch, "category")?;
        let id_col = batch.column_by_name("question_id");
        let answer_col = batch.column_by_name("answer");
        let cot_col = batch.column_by_name("cot_content");
        let src_col = batch.column_by_name("src");

        for row in 0..batch.num_rows() {
            let at = rows.len();
            let question = get_string(question_col.as_ref(), row).ok_or(StoreError::NullValue {
                column: "question",
                row: at,
            })?;
            let options = get_string_list(options_col.as_ref(), row).ok_or(
                StoreError::NullValue {
                    column: "options",
                    row: at,
                },
            )?;
            let answer_index = get_i64(answer_index_col.as_ref(), row).ok_or(
                StoreError::NullValue {
                    column: "answer_index",
                    row: at,
                },
            )?;
            let category = get_string(category_col.as_ref(), row).ok_or(StoreError::NullValue {
                column: "category",
                row: at,
            })?;

            rows.push(RawQuestion {
                question_id: id_col.and_then(|c| get_i64(c.as_ref(), row)),
                question,
                options,
                answer: answer_col
                    .and_then(|c| get_string(c.as_ref(), row))
                    .unwrap_or_default(),
                answer_index,
                category,
                cot_content: cot_col.and_then(|c| get_string(c.as_ref(), row)),
                src: src_col.and_then(|c| get_string(c.as_ref(), row)),
            });
        }
    }

    Ok(rows)
}

// ── Arrow extraction helpers ──

fn required<'a>(batch: &'a RecordBatch, name: &'static str) -> Result<&'a ArrayRef, StoreError> {
    batch
        .column_by_name(name)
        .ok_or(StoreError::MissingColumn(name))
}

/// Extract a string value (handles Utf8 and LargeUtf8).
fn get_string(col: &dyn Array, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
        .or_else(|| {
            col.as_any()
                .downcast_ref::<LargeStringArray>()
                .map(|arr| arr.value(row).to_string())
        })
}

/// Extract an integer (handles Int64 and Int32).
fn get_i64(col: &dyn Array, row: usize) -> Option<i64> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<Int64Array>()
        .map(|arr| arr.value(row))
        .or_else(|| {
            col.as_any()
                .downcast_ref::<Int32Array>()
                .map(|arr| arr.value(row) as i64)
        })
}

/// Extract a list of strings from a List or LargeList column.
///
/// `None` if the list or any of its elements is null; option positions
/// carry the answer index, so no slot may be skipped.
fn get_string_list(col: &dyn Array, row: usize) -> Option<Vec<String>> {
    if col.is_null(row) {
        return None;
    }

    if let Some(list) = col.as_any().downcast_ref::<ListArray>() {
        return strings_from_array(list.value(row).as_ref());
    }
    if let Some(list) = col.as_any().downcast_ref::<LargeListArray>() {
        return strings_from_array(list.value(row).as_ref());
    }

    None
}

fn strings_from_array(arr: &dyn Array) -> Option<Vec<String>> {
    (0..arr.len()).map(|i| get_string(arr, i)).collect()
}
