//! Few-shot chain-of-thought prompts under a token budget.
//!
//! Each test question gets up to `k` solved exemplars from the validation
//! split of the same category, in dataset order. When the assembled prompt
//! does not fit the budget, exemplars are dropped from the end one at a time
//! until it does. A zero-shot prompt that still does not fit is returned
//! as-is and flagged `over_budget`.

use std::collections::HashMap;

use mcqbench_core::{CHOICES, QuestionItem};
use tracing::debug;

use crate::TokenCounter;

/// Open cue after the target question.
pub const ANSWER_CUE: &str = "Answer: Let's think step by step.";

/// Opening line of dataset rationales, rewritten to [`ANSWER_CUE`].
const RATIONALE_OPENER: &str = "A: Let's think step by step.";

/// Context window split between prompt and generated output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBudget {
    pub max_context_tokens: usize,
    pub reserved_generation_tokens: usize,
}

impl PromptBudget {
    pub fn new(max_context_tokens: usize, reserved_generation_tokens: usize) -> Self {
        Self {
            max_context_tokens,
            reserved_generation_tokens,
        }
    }

    /// Tokens available to the prompt.
    pub fn available(&self) -> usize {
        self.max_context_tokens
            .saturating_sub(self.reserved_generation_tokens)
    }
}

/// Validation items grouped by category, each group in dataset order.
#[derive(Debug, Clone, Default)]
pub struct ExemplarPool {
    by_category: HashMap<String, Vec<QuestionItem>>,
}

impl ExemplarPool {
    pub fn from_validation(items: Vec<QuestionItem>) -> Self {
        let mut by_category: HashMap<String, Vec<QuestionItem>> = HashMap::new();
        for item in items {
            by_category
                .entry(item.category.clone())
                .or_default()
                .push(item);
        }
        Self { by_category }
    }

    /// The first `k` exemplars for `category` (fewer if the pool is short).
    pub fn exemplars(&self, category: &str, k: usize) -> &[QuestionItem] {
        match self.by_category.get(category) {
            Some(items) => &items[..k.min(items.len())],
            None => &[],
        }
    }

    pub fn category_count(&self) -> usize {
        self.by_category.len()
    }
}

/// An assembled prompt and how it was fitted to the budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPrompt {
    pub text: String,
    pub shots_used: usize,
    pub token_count: usize,
    pub over_budget: bool,
}

pub struct PromptBuilder<'a> {
    tokenizer: &'a dyn TokenCounter,
    budget: PromptBudget,
    max_few_shot: usize,
    use_rationale: bool,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(
        tokenizer: &'a dyn TokenCounter,
        budget: PromptBudget,
        max_few_shot: usize,
        use_rationale: bool,
    ) -> Self {
        Self {
            tokenizer,
            budget,
            max_few_shot,
            use_rationale,
        }
    }

    /// Build the prompt for `item`, shrinking the exemplar count to fit.
    pub fn build(&self, item: &QuestionItem, pool: &ExemplarPool) -> anyhow::Result<BuiltPrompt> {
        let shots = pool.exemplars(&item.category, self.max_few_shot);
        let limit = self.budget.available();
        let mut shots_used = shots.len();

        loop {
            let text = render_prompt(item, &shots[..shots_used], self.use_rationale);
            let token_count = self.tokenizer.count_tokens(&text)?;
            let fits = token_count <= limit;

            if fits || shots_used == 0 {
                if !fits {
                    debug!(
                        question_id = item.id,
                        token_count, limit, "zero-shot prompt exceeds budget, sending as-is"
                    );
                } else if shots_used < shots.len() {
                    debug!(
                        question_id = item.id,
                        shots_used,
                        available = shots.len(),
                        "reduced few-shot exemplars to fit budget"
                    );
                }
                return Ok(BuiltPrompt {
                    text,
                    shots_used,
                    token_count,
                    over_budget: !fits,
                });
            }

            shots_used -= 1;
        }
    }
}

/// Render a prompt with exactly the given exemplars.
pub fn render_prompt(item: &QuestionItem, exemplars: &[QuestionItem], use_rationale: bool) -> String {
    let mut prompt = format!(
        "The following are multiple choice questions (with answers) about {}. \
         Think step by step and then finish your answer with \"the answer is (X)\" \
         where X is the correct letter choice.\n\n",
        item.category
    );

    for ex in exemplars {
        push_question(&mut prompt, ex);
        match ex.rationale.as_deref() {
            Some(rationale) if use_rationale => {
                prompt.push_str(&rationale.replace(RATIONALE_OPENER, ANSWER_CUE));
                prompt.push_str("\n\n");
            }
            _ => {
                prompt.push_str(&format!(
                    "Answer: The answer is ({}).\n\n",
                    ex.answer_letter
                ));
            }
        }
    }

    push_question(&mut prompt, item);
    prompt.push_str(ANSWER_CUE);
    prompt
}

fn push_question(prompt: &mut String, item: &QuestionItem) {
    prompt.push_str("Question:\n");
    prompt.push_str(&item.question);
    prompt.push_str("\nOptions:\n");
    for (letter, option) in CHOICES.iter().zip(&item.options) {
        prompt.push_str(&format!("{letter}. {option}\n"));
    }
}
