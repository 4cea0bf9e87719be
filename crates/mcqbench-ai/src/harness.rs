//! End-to-end evaluation: prompts → one generation batch → scores.
//!
//! Every prompt is built before anything is sent. The backend is called
//! exactly once with the whole batch, and that call is the only point where
//! the run waits. Any failure up to and including scoring aborts the run.

use std::time::{Duration, Instant};

use anyhow::Context;
use mcqbench_core::{
    AnswerExtractor, DomainRules, OverallStats, QuestionItem, ResultAggregator, Scorecard,
    SubjectFilter,
};
use tracing::info;

use crate::prompt::{BuiltPrompt, ExemplarPool, PromptBudget, PromptBuilder};
use crate::{GenerationBackend, SamplingConfig, TokenCounter};

/// Knobs for one evaluation run.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalSettings {
    pub num_few_shot: usize,
    /// Use dataset rationales in exemplars instead of bare answer lines.
    pub use_cot: bool,
    pub budget: PromptBudget,
    pub sampling: SamplingConfig,
    pub subjects: SubjectFilter,
    pub total_limit: Option<usize>,
}

impl Default for EvalSettings {
    fn default() -> Self {
        let sampling = SamplingConfig::default();
        Self {
            num_few_shot: 5,
            use_cot: true,
            budget: PromptBudget::new(4096, sampling.max_tokens as usize),
            sampling,
            subjects: SubjectFilter::All,
            total_limit: None,
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct EvalOutcome {
    pub scorecard: Scorecard,
    pub overall: OverallStats,
    pub elapsed: Duration,
    pub prompts_over_budget: usize,
    pub prompts_reduced: usize,
}

pub struct Harness<'a> {
    backend: &'a dyn GenerationBackend,
    tokenizer: &'a dyn TokenCounter,
    extractor: AnswerExtractor,
    rules: DomainRules,
}

impl<'a> Harness<'a> {
    pub fn new(backend: &'a dyn GenerationBackend, tokenizer: &'a dyn TokenCounter) -> Self {
        Self {
            backend,
            tokenizer,
            extractor: AnswerExtractor::new(),
            rules: DomainRules::mmlu_pro(),
        }
    }

    pub fn with_domain_rules(mut self, rules: DomainRules) -> Self {
        self.rules = rules;
        self
    }

    /// Apply the subject filter, then the row limit.
    pub fn select_test_items(
        &self,
        test: Vec<QuestionItem>,
        settings: &EvalSettings,
    ) -> Vec<QuestionItem> {
        let mut items = settings.subjects.apply(test);
        if let Some(limit) = settings.total_limit {
            items.truncate(limit);
        }
        items
    }

    /// One prompt per test item, in order.
    pub fn build_prompts(
        &self,
        items: &[QuestionItem],
        pool: &ExemplarPool,
        settings: &EvalSettings,
    ) -> anyhow::Result<Vec<BuiltPrompt>> {
        let builder = PromptBuilder::new(
            self.tokenizer,
            settings.budget,
            settings.num_few_shot,
            settings.use_cot,
        );
        items
            .iter()
            .map(|item| {
                builder
                    .build(item, pool)
                    .with_context(|| format!("building prompt for question {}", item.id))
            })
            .collect()
    }

    /// Run the full evaluation over preprocessed test and validation splits.
    pub async fn run(
        &self,
        test: Vec<QuestionItem>,
        validation: Vec<QuestionItem>,
        settings: &EvalSettings,
    ) -> anyhow::Result<EvalOutcome> {
        let items = self.select_test_items(test, settings);
        let pool = ExemplarPool::from_validation(validation);
        info!(
            questions = items.len(),
            exemplar_categories = pool.category_count(),
            few_shot = settings.num_few_shot,
            budget = settings.budget.available(),
            "building prompts"
        );

        let built = self.build_prompts(&items, &pool, settings)?;
        let prompts_over_budget = built.iter().filter(|p| p.over_budget).count();
        let prompts_reduced = built
            .iter()
            .zip(&items)
            .filter(|(p, item)| {
                p.shots_used < pool.exemplars(&item.category, settings.num_few_shot).len()
            })
            .count();
        let prompts: Vec<String> = built.into_iter().map(|p| p.text).collect();

        info!(
            prompts = prompts.len(),
            reduced = prompts_reduced,
            over_budget = prompts_over_budget,
            backend = self.backend.name(),
            "running inference"
        );
        let start = Instant::now();
        let outputs = self
            .backend
            .generate(&prompts, &settings.sampling)
            .await
            .context("generation backend failed")?;
        let elapsed = start.elapsed();

        info!(outputs = outputs.len(), elapsed_s = elapsed.as_secs_f64(), "scoring");
        let scorecard = ResultAggregator::new(&self.extractor, &self.rules)
            .score(&items, &outputs)
            .context("scoring model outputs")?;
        let overall = scorecard.overall_stats(elapsed);

        info!(
            accuracy = overall.overall_accuracy,
            correct = overall.total_correct,
            total = overall.total_questions,
            "evaluation complete"
        );

        Ok(EvalOutcome {
            scorecard,
            overall,
            elapsed,
            prompts_over_budget,
            prompts_reduced,
        })
    }
}
