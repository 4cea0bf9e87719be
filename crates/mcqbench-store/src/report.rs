//! Markdown run report.

use mcqbench_core::{OverallStats, Scorecard};

/// Run settings echoed at the top of `report.md`.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub model: String,
    pub timestamp: String,
    pub num_few_shot: usize,
    pub use_cot: bool,
    pub backend: String,
    pub precision: String,
    pub max_model_len: usize,
    pub gpu_memory_utilization: f64,
    pub prompts_reduced: usize,
    pub prompts_over_budget: usize,
}

/// `XhYmZs`, `YmZs`, or `Zs`; fractional seconds are dropped.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}h{minutes}m{secs}s")
    } else if minutes > 0 {
        format!("{minutes}m{secs}s")
    } else {
        format!("{secs}s")
    }
}

pub fn render_report(meta: &ReportMeta, stats: &OverallStats, card: &Scorecard) -> String {
    let mut lines = vec![
        "# MMLU-Pro Benchmark Report".to_string(),
        String::new(),
        format!("**Model**: {}", meta.model),
        format!("**Timestamp**: {}", meta.timestamp),
        format!("**Few-shot Examples**: {}", meta.num_few_shot),
        format!(
            "**Chain-of-Thought**: {}",
            if meta.use_cot { "Yes" } else { "No" }
        ),
        String::new(),
        "## Overall Results".to_string(),
        String::new(),
        format!(
            "- **Accuracy**: {:.4} ({}/{})",
            stats.overall_accuracy, stats.total_correct, stats.total_questions
        ),
        format!(
            "- **Processing Time**: {}",
            format_duration(stats.processing_time_s)
        ),
        format!(
            "- **Avg Time/Question**: {:.2}s",
            stats.avg_time_per_question_s
        ),
        String::new(),
        "## Engine".to_string(),
        String::new(),
        format!("- **Backend**: {}", meta.backend),
        format!("- **Precision**: {}", meta.precision),
        format!("- **Max Model Length**: {}", meta.max_model_len),
        format!(
            "- **GPU Memory Utilization**: {:.2}",
            meta.gpu_memory_utilization
        ),
        format!("- **Prompts Reduced**: {}", meta.prompts_reduced),
        format!("- **Prompts Over Budget**: {}", meta.prompts_over_budget),
        String::new(),
        "## Accuracy by Domain".to_string(),
        String::new(),
    ];

    for (domain, acc) in card.domain_accuracy() {
        lines.push(format!("- **{domain}**: {acc:.4}"));
    }

    lines.extend([
        String::new(),
        "## Accuracy by Category".to_string(),
        String::new(),
    ]);
    for (category, acc) in card.category_accuracy() {
        lines.push(format!("- {category}: {acc:.4}"));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    use mcqbench_core::Tally;

    fn card() -> Scorecard {
        Scorecard {
            overall: Tally { correct: 2, total: 3 },
            by_category: BTreeMap::from([
                ("math".to_string(), Tally { correct: 1, total: 2 }),
                ("law".to_string(), Tally { correct: 1, total: 1 }),
            ]),
            by_domain: BTreeMap::from([
                ("STEM".to_string(), Tally { correct: 1, total: 2 }),
                ("Humanities".to_string(), Tally { correct: 1, total: 1 }),
            ]),
            samples: Vec::new(),
        }
    }

    fn meta() -> ReportMeta {
        ReportMeta {
            model: "meta-llama/Llama-3.1-8B-Instruct".into(),
            timestamp: "20260101-120000".into(),
            num_few_shot: 5,
            use_cot: true,
            backend: "openai-completions".into(),
            precision: "bf16".into(),
            max_model_len: 4096,
            gpu_memory_utilization: 0.9,
            prompts_reduced: 1,
            prompts_over_budget: 0,
        }
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(0.4), "0s");
        assert_eq!(format_duration(59.9), "59s");
        assert_eq!(format_duration(61.0), "1m1s");
        assert_eq!(format_duration(3600.0), "1h0m0s");
        assert_eq!(format_duration(3725.5), "1h2m5s");
    }

    #[test]
    fn report_layout() {
        let card = card();
        let stats = card.overall_stats(Duration::from_secs(75));
        let text = render_report(&meta(), &stats, &card);

        assert!(text.starts_with("# MMLU-Pro Benchmark Report\n\n**Model**: meta-llama/"));
        assert!(text.contains("**Chain-of-Thought**: Yes"));
        assert!(text.contains("- **Accuracy**: 0.6667 (2/3)"));
        assert!(text.contains("- **Processing Time**: 1m15s"));
        assert!(text.contains("- **Avg Time/Question**: 25.00s"));
        assert!(text.contains("- **GPU Memory Utilization**: 0.90"));
        assert!(text.contains("- **Prompts Reduced**: 1"));
        assert!(text.contains("- **Humanities**: 1.0000\n- **STEM**: 0.5000"));
        assert!(text.ends_with("- law: 1.0000\n- math: 0.5000"));
    }

    #[test]
    fn no_cot_flag() {
        let card = card();
        let stats = card.overall_stats(Duration::ZERO);
        let mut meta = meta();
        meta.use_cot = false;
        assert!(render_report(&meta, &stats, &card).contains("**Chain-of-Thought**: No"));
    }
}
