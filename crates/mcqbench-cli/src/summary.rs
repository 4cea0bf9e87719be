//! Console results block printed after a run.

use chrono::{DateTime, Utc};
use mcqbench_core::OverallStats;
use mcqbench_store::format_duration;

pub struct Summary<'a> {
    pub stats: &'a OverallStats,
    pub subjects: usize,
    pub model: &'a str,
    pub backend: &'a str,
    pub threshold: f64,
}

impl Summary<'_> {
    pub fn passed(&self) -> bool {
        self.stats.overall_accuracy >= self.threshold
    }

    pub fn render(&self) -> String {
        let s = self.stats;
        let completion = s.completion_rate * 100.0;
        let status = if self.passed() { "PASS" } else { "FAIL" };

        [
            String::new(),
            "=== Results Summary (MMLU) ===".to_string(),
            format!("Total questions processed: {}", s.total_questions),
            format!(
                "Questions completed: {}",
                s.total_questions - s.failed_questions
            ),
            format!("Questions failed: {}", s.failed_questions),
            format!("Completion rate: {completion:.2}%"),
            format!("Overall accuracy: {:.4}", s.overall_accuracy),
            format!("Average response time: {:.2}s", s.avg_time_per_question_s),
            format!(
                "Total processing time: {}",
                format_duration(s.processing_time_s)
            ),
            format!("Model: {}", self.model),
            format!("Backend: {}", self.backend),
            format!("Dataset: MMLU (Full - {} subjects)", self.subjects),
            String::new(),
            "=== Acceptance Criteria (MMLU) ===".to_string(),
            format!("Required overall accuracy:  >= {:.4}", self.threshold),
            "Required completion rate:   100.00%".to_string(),
            "Required failed questions:  0".to_string(),
            String::new(),
            format!("Observed overall accuracy:  {:.4}", s.overall_accuracy),
            format!("Observed completion rate:   {completion:.2}%"),
            format!("Observed failed questions:  {}", s.failed_questions),
            String::new(),
            format!("MMLU Benchmark Status: {status}"),
        ]
        .join("\n")
    }
}

pub fn completion_block(questions: u64, now: DateTime<Utc>) -> String {
    format!(
        "\n=== MMLU K8s Job Complete ===\nQuestions processed: {questions}\nTimestamp: {}",
        now.format("%a %b %d %H:%M:%S UTC %Y")
    )
}
