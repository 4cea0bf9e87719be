mod summary;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::{Local, Utc};
use clap::{Parser, ValueEnum};
use mcqbench_ai::{
    CompletionsClient, EvalOutcome, EvalSettings, GenerationBackend, Harness, HfTokenCounter,
    PromptBudget, SamplingConfig,
};
use mcqbench_core::{RawQuestion, SubjectFilter, preprocess};
use mcqbench_store::{DatasetDir, ReportMeta, RunDir, SAMPLE_SPLIT_ROWS, render_report};
use tracing::info;
use tracing_subscriber::EnvFilter;

use summary::{Summary, completion_block};

const LLAMA_31_8B_INSTRUCT: &str = "meta-llama/Llama-3.1-8B-Instruct";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Precision {
    Fp16,
    Bf16,
}

impl Precision {
    fn as_str(self) -> &'static str {
        match self {
            Precision::Fp16 => "fp16",
            Precision::Bf16 => "bf16",
        }
    }
}

/// MMLU-Pro benchmark evaluator.
///
/// Builds few-shot chain-of-thought prompts, sends them to an
/// OpenAI-compatible completions server in one batch, and scores the
/// extracted answer letters.
#[derive(Parser, Debug)]
#[command(name = "mcqbench", version, about)]
struct Args {
    /// Model name or HuggingFace model ID
    #[arg(short, long, default_value = LLAMA_31_8B_INSTRUCT)]
    model: String,

    /// Precision the serving engine runs the model at
    #[arg(long, value_enum, default_value = "bf16")]
    precision: Precision,

    /// Maximum model context length
    #[arg(long, default_value_t = 4096)]
    max_model_len: usize,

    /// GPU memory utilization the serving engine was started with
    #[arg(long, default_value_t = 0.90, value_parser = parse_utilization)]
    gpu_memory_utilization: f64,

    /// Directory to save results
    #[arg(long, default_value = "./results/mmlu-pro")]
    results_dir: PathBuf,

    /// Limit total number of questions (for testing)
    #[arg(long)]
    total_limit: Option<usize>,

    /// Number of few-shot examples
    #[arg(short = 'k', long, default_value_t = 5)]
    num_few_shot: usize,

    /// Comma-separated list of subjects to evaluate, or 'all'
    #[arg(long, default_value = "all")]
    selected_subjects: String,

    /// Minimum accuracy to pass benchmark
    #[arg(long, default_value_t = 0.65)]
    acceptance_threshold: f64,

    /// Write per-sample results to samples.csv (0 or 1)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    details: u8,

    /// Disable chain-of-thought exemplars
    #[arg(long)]
    no_cot: bool,

    /// Base URL of the OpenAI-compatible completions server
    #[arg(long, env = "MCQBENCH_BACKEND_URL", default_value = "http://localhost:8000")]
    backend_url: String,

    /// Bearer token for the completions server
    #[arg(long, env = "MCQBENCH_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Maximum completion requests in flight
    #[arg(long, default_value_t = 8)]
    max_concurrency: usize,

    /// Prompts per completion request
    #[arg(long, default_value_t = 64)]
    request_chunk: usize,

    /// Path to the model's tokenizer.json (or a directory containing it)
    #[arg(long, env = "MCQBENCH_TOKENIZER")]
    tokenizer: PathBuf,

    /// Directory holding the test and validation splits
    #[arg(long, env = "MCQBENCH_DATA_DIR", default_value = "data/mmlu-pro")]
    data_dir: PathBuf,

    /// Generation cap per question, also reserved out of the context window
    #[arg(long, default_value_t = 2048)]
    max_new_tokens: u32,
}

impl Args {
    fn eval_settings(&self) -> EvalSettings {
        EvalSettings {
            num_few_shot: self.num_few_shot,
            use_cot: !self.no_cot,
            budget: PromptBudget::new(self.max_model_len, self.max_new_tokens as usize),
            sampling: SamplingConfig {
                max_tokens: self.max_new_tokens,
                ..SamplingConfig::default()
            },
            subjects: SubjectFilter::parse(&self.selected_subjects),
            total_limit: self.total_limit,
        }
    }
}

fn parse_utilization(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(format!("{value} is not in (0, 1]"))
    }
}

/// Expand short Llama 3.1 aliases to the hub model ID.
fn map_model_alias(alias: &str) -> String {
    match alias.trim().to_lowercase().as_str() {
        "llama3.1-8b-instruct" | "llama-3.1-8b-instruct" | "llama31-8b" | "llama3.1" => {
            LLAMA_31_8B_INSTRUCT.to_string()
        }
        _ => alias.to_string(),
    }
}

/// Keep the first [`SAMPLE_SPLIT_ROWS`] rows when `SAMPLE_SPLIT` holds a
/// non-empty value. Runs before preprocessing, so positional ids of the kept
/// rows are unchanged.
fn apply_sample_split(mut rows: Vec<RawQuestion>, flag: Option<&str>) -> Vec<RawQuestion> {
    if flag.is_some_and(|v| !v.is_empty()) {
        rows.truncate(SAMPLE_SPLIT_ROWS);
        info!(rows = rows.len(), "SAMPLE_SPLIT set, using reduced test split");
    }
    rows
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let started = Local::now();
    let model = map_model_alias(&args.model);
    info!(version = env!("CARGO_PKG_VERSION"), model = %model, "mcqbench");

    let dataset = DatasetDir::new(&args.data_dir);
    info!(dir = %dataset.root().display(), "loading dataset");
    let sample_split = std::env::var("SAMPLE_SPLIT").ok();
    let test_rows = apply_sample_split(
        dataset.load_split("test").context("loading test split")?,
        sample_split.as_deref(),
    );
    let test = preprocess(test_rows).context("preprocessing test split")?;
    let validation = preprocess(
        dataset
            .load_split("validation")
            .context("loading validation split")?,
    )
    .context("preprocessing validation split")?;

    let tokenizer = HfTokenCounter::load(&args.tokenizer)
        .with_context(|| format!("loading tokenizer from {}", args.tokenizer.display()))?;
    let backend = CompletionsClient::new(args.backend_url.clone(), model.clone())
        .with_api_key(args.api_key.clone())
        .with_chunk_size(args.request_chunk)
        .with_max_concurrency(args.max_concurrency);

    let settings = args.eval_settings();
    let outcome = Harness::new(&backend, &tokenizer)
        .run(test, validation, &settings)
        .await?;

    let run = RunDir::create(&args.results_dir, &started).context("creating run directory")?;
    write_artifacts(&run, &args, &model, backend.name(), &outcome)?;

    let summary = Summary {
        stats: &outcome.overall,
        subjects: outcome.scorecard.by_category.len(),
        model: &model,
        backend: backend.name(),
        threshold: args.acceptance_threshold,
    };
    println!("{}", summary.render());
    println!(
        "{}",
        completion_block(outcome.overall.total_questions, Utc::now())
    );
    info!(path = %run.path().display(), "results saved");

    Ok(if summary.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn write_artifacts(
    run: &RunDir,
    args: &Args,
    model: &str,
    backend: &str,
    outcome: &EvalOutcome,
) -> anyhow::Result<()> {
    let card = &outcome.scorecard;
    run.write_overall(&outcome.overall)
        .context("writing overall.json")?;
    run.write_by_category(&card.category_accuracy())
        .context("writing by_category.json")?;
    run.write_by_domain(&card.domain_accuracy())
        .context("writing by_domain.json")?;
    if args.details == 1 {
        run.write_samples(&card.samples)
            .context("writing samples.csv")?;
    }

    let meta = ReportMeta {
        model: model.to_string(),
        timestamp: run.timestamp().to_string(),
        num_few_shot: args.num_few_shot,
        use_cot: !args.no_cot,
        backend: backend.to_string(),
        precision: args.precision.as_str().to_string(),
        max_model_len: args.max_model_len,
        gpu_memory_utilization: args.gpu_memory_utilization,
        prompts_reduced: outcome.prompts_reduced,
        prompts_over_budget: outcome.prompts_over_budget,
    };
    run.write_report(&render_report(&meta, &outcome.overall, card))
        .context("writing report.md")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["mcqbench", "--tokenizer", "/models/llama/tokenizer.json"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn aliases_expand() {
        for alias in ["llama3.1", " Llama3.1-8B-Instruct ", "llama-3.1-8b-instruct", "llama31-8b"] {
            assert_eq!(map_model_alias(alias), LLAMA_31_8B_INSTRUCT);
        }
        assert_eq!(map_model_alias("Qwen/Qwen2.5-7B"), "Qwen/Qwen2.5-7B");
    }

    #[test]
    fn defaults() {
        let args = parse(&[]);
        assert_eq!(args.model, LLAMA_31_8B_INSTRUCT);
        assert_eq!(args.precision, Precision::Bf16);
        assert_eq!(args.max_model_len, 4096);
        assert_eq!(args.num_few_shot, 5);
        assert_eq!(args.details, 1);
        assert_eq!(args.acceptance_threshold, 0.65);

        let settings = args.eval_settings();
        assert!(settings.use_cot);
        assert_eq!(settings.budget.available(), 2048);
        assert_eq!(settings.sampling, SamplingConfig::default());
        assert_eq!(settings.subjects, SubjectFilter::All);
        assert_eq!(settings.total_limit, None);
    }

    #[test]
    fn eval_flags_map_to_settings() {
        let args = parse(&[
            "-k",
            "3",
            "--no-cot",
            "--max-model-len",
            "8192",
            "--max-new-tokens",
            "1024",
            "--selected-subjects",
            "Math,law",
            "--total-limit",
            "50",
        ]);
        let settings = args.eval_settings();
        assert_eq!(settings.num_few_shot, 3);
        assert!(!settings.use_cot);
        assert_eq!(settings.budget.available(), 7168);
        assert_eq!(settings.sampling.max_tokens, 1024);
        assert!(settings.subjects.matches("math"));
        assert!(!settings.subjects.matches("physics"));
        assert_eq!(settings.total_limit, Some(50));
    }

    #[test]
    fn rejects_bad_values() {
        let base = ["mcqbench", "--tokenizer", "t.json"];
        for bad in [
            &["--precision", "fp8"][..],
            &["--details", "2"],
            &["--gpu-memory-utilization", "0"],
            &["--gpu-memory-utilization", "1.5"],
        ] {
            let argv: Vec<&str> = base.iter().chain(bad).copied().collect();
            assert!(Args::try_parse_from(argv).is_err(), "{bad:?} should be rejected");
        }
    }

    fn raw_rows(n: usize, with_ids: bool) -> Vec<RawQuestion> {
        (0..n)
            .map(|i| RawQuestion {
                question_id: with_ids.then_some(7000 + i as i64),
                question: format!("question {i}"),
                options: vec!["a".into(), "b".into()],
                answer: "A".into(),
                answer_index: 0,
                category: "math".into(),
                cot_content: None,
                src: None,
            })
            .collect()
    }

    #[test]
    fn sample_split_only_when_flag_non_empty() {
        assert_eq!(apply_sample_split(raw_rows(15, true), None).len(), 15);
        assert_eq!(apply_sample_split(raw_rows(15, true), Some("")).len(), 15);
        assert_eq!(
            apply_sample_split(raw_rows(15, true), Some("1")).len(),
            SAMPLE_SPLIT_ROWS
        );
        assert_eq!(apply_sample_split(raw_rows(4, true), Some("1")).len(), 4);
    }

    #[test]
    fn sample_split_keeps_ids_of_leading_rows() {
        let kept = preprocess(apply_sample_split(raw_rows(15, true), Some("true"))).unwrap();
        let ids: Vec<i64> = kept.iter().map(|q| q.id).collect();
        assert_eq!(ids, (7000..7010).collect::<Vec<_>>());

        let positional = preprocess(apply_sample_split(raw_rows(15, false), Some("yes"))).unwrap();
        let ids: Vec<i64> = positional.iter().map(|q| q.id).collect();
        assert_eq!(ids, (0..10).collect::<Vec<_>>());
        assert_eq!(positional[9].question, "question 9");
    }

    #[test]
    fn utilization_bounds() {
        assert_eq!(parse_utilization("1"), Ok(1.0));
        assert_eq!(parse_utilization("0.9"), Ok(0.9));
        assert!(parse_utilization("nope").is_err());
    }
}
