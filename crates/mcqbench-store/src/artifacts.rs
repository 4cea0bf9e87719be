//! Per-run output directory.
//!
//! ```text
//! <results_dir>/<YYYYmmdd-HHMMSS>-mmlu-pro/
//!   overall.json  by_category.json  by_domain.json  samples.csv  report.md
//! ```

use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use mcqbench_core::{OverallStats, SampleRecord};
use serde::Serialize;
use tracing::info;

use crate::StoreError;

const RUN_SUFFIX: &str = "mmlu-pro";

pub struct RunDir {
    path: PathBuf,
    timestamp: String,
}

/// One `samples.csv` line.
#[derive(Serialize)]
struct SampleRow<'a> {
    index: usize,
    question_id: i64,
    category: &'a str,
    domain: &'a str,
    gold_letter: char,
    predicted_letter: String,
    is_correct: u8,
    model_output: &'a str,
}

impl<'a> From<&'a SampleRecord> for SampleRow<'a> {
    fn from(s: &'a SampleRecord) -> Self {
        Self {
            index: s.index,
            question_id: s.question_id,
            category: &s.category,
            domain: &s.domain,
            gold_letter: s.gold_letter,
            predicted_letter: s
                .predicted_letter
                .map_or_else(|| "unknown".to_string(), String::from),
            is_correct: u8::from(s.is_correct),
            model_output: &s.model_output,
        }
    }
}

impl RunDir {
    /// Create `<root>/<now:%Y%m%d-%H%M%S>-mmlu-pro`, parents included.
    pub fn create<Tz>(root: &Path, now: &DateTime<Tz>) -> Result<Self, StoreError>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let timestamp = now.format("%Y%m%d-%H%M%S").to_string();
        let path = root.join(format!("{timestamp}-{RUN_SUFFIX}"));
        std::fs::create_dir_all(&path)?;
        info!(path = %path.display(), "created run directory");
        Ok(Self { path, timestamp })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn write_overall(&self, stats: &OverallStats) -> Result<PathBuf, StoreError> {
        self.write_json("overall.json", stats)
    }

    pub fn write_by_category(&self, acc: &BTreeMap<String, f64>) -> Result<PathBuf, StoreError> {
        self.write_json("by_category.json", acc)
    }

    pub fn write_by_domain(&self, acc: &BTreeMap<String, f64>) -> Result<PathBuf, StoreError> {
        self.write_json("by_domain.json", acc)
    }

    /// Write `samples.csv`. Nothing is written for an empty run.
    pub fn write_samples(&self, samples: &[SampleRecord]) -> Result<Option<PathBuf>, StoreError> {
        if samples.is_empty() {
            return Ok(None);
        }
        let path = self.path.join("samples.csv");
        let mut writer = csv::Writer::from_path(&path)?;
        for sample in samples {
            writer.serialize(SampleRow::from(sample))?;
        }
        writer.flush()?;
        Ok(Some(path))
    }

    pub fn write_report(&self, markdown: &str) -> Result<PathBuf, StoreError> {
        let path = self.path.join("report.md");
        std::fs::write(&path, markdown)?;
        Ok(path)
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf, StoreError> {
        let path = self.path.join(name);
        std::fs::write(&path, serde_json::to_string_pretty(value)?)?;
        Ok(path)
    }
}
