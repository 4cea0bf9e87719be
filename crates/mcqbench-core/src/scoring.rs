//! Correctness tallies per category and domain.
//!
//! Counts are kept as exact integers while scoring; accuracy ratios are only
//! derived on read, and rounding is left to whoever renders them.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::{AnswerExtractor, CoreError, DomainRules, QuestionItem};

/// Characters of model output kept per sample record.
pub const MODEL_OUTPUT_CAP: usize = 500;

/// Correct/total counter for one reporting bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub correct: u64,
    pub total: u64,
}

impl Tally {
    fn record(&mut self, is_correct: bool) {
        self.total += 1;
        if is_correct {
            self.correct += 1;
        }
    }

    pub fn wrong(&self) -> u64 {
        self.total - self.correct
    }

    /// `correct / max(1, total)`.
    pub fn accuracy(&self) -> f64 {
        self.correct as f64 / self.total.max(1) as f64
    }
}

/// Scored outcome for a single test question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleRecord {
    pub index: usize,
    pub question_id: i64,
    pub category: String,
    pub domain: String,
    pub gold_letter: char,
    pub predicted_letter: Option<char>,
    pub is_correct: bool,
    /// Model output truncated to [`MODEL_OUTPUT_CAP`] characters.
    pub model_output: String,
}

/// Run-level summary written to `overall.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallStats {
    pub overall_accuracy: f64,
    pub total_questions: u64,
    pub total_correct: u64,
    pub total_wrong: u64,
    pub completion_rate: f64,
    pub failed_questions: u64,
    pub processing_time_s: f64,
    pub avg_time_per_question_s: f64,
}

/// Everything produced by one scoring pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scorecard {
    pub overall: Tally,
    pub by_category: BTreeMap<String, Tally>,
    pub by_domain: BTreeMap<String, Tally>,
    pub samples: Vec<SampleRecord>,
}

impl Scorecard {
    /// Summary stats; `elapsed` is the wall time of the whole generation batch.
    ///
    /// The harness is batch-or-nothing, so completion is always total.
    pub fn overall_stats(&self, elapsed: Duration) -> OverallStats {
        let secs = elapsed.as_secs_f64();
        OverallStats {
            overall_accuracy: self.overall.accuracy(),
            total_questions: self.overall.total,
            total_correct: self.overall.correct,
            total_wrong: self.overall.wrong(),
            completion_rate: 1.0,
            failed_questions: 0,
            processing_time_s: secs,
            avg_time_per_question_s: secs / self.overall.total.max(1) as f64,
        }
    }

    pub fn category_accuracy(&self) -> BTreeMap<String, f64> {
        accuracies(&self.by_category)
    }

    pub fn domain_accuracy(&self) -> BTreeMap<String, f64> {
        accuracies(&self.by_domain)
    }
}

fn accuracies(tallies: &BTreeMap<String, Tally>) -> BTreeMap<String, f64> {
    tallies
        .iter()
        .map(|(name, tally)| (name.clone(), tally.accuracy()))
        .collect()
}

/// Scores model outputs against gold answers.
pub struct ResultAggregator<'a> {
    extractor: &'a AnswerExtractor,
    rules: &'a DomainRules,
}

impl<'a> ResultAggregator<'a> {
    pub fn new(extractor: &'a AnswerExtractor, rules: &'a DomainRules) -> Self {
        Self { extractor, rules }
    }

    /// Score `outputs[i]` against `items[i]`, in order.
    ///
    /// The two slices must correspond one-to-one.
    pub fn score(&self, items: &[QuestionItem], outputs: &[String]) -> Result<Scorecard, CoreError> {
        if items.len() != outputs.len() {
            return Err(CoreError::OutputCountMismatch {
                items: items.len(),
                outputs: outputs.len(),
            });
        }

        let mut card = Scorecard {
            samples: Vec::with_capacity(items.len()),
            ..Scorecard::default()
        };

        for (index, (item, output)) in items.iter().zip(outputs).enumerate() {
            let predicted = self.extractor.extract(output);
            let is_correct = predicted == Some(item.answer_letter);
            let domain = self.rules.classify(&item.category);

            card.overall.record(is_correct);
            card.by_category
                .entry(item.category.clone())
                .or_default()
                .record(is_correct);
            card.by_domain
                .entry(domain.to_string())
                .or_default()
                .record(is_correct);

            card.samples.push(SampleRecord {
                index,
                question_id: item.id,
                category: item.category.clone(),
                domain: domain.to_string(),
                gold_letter: item.answer_letter,
                predicted_letter: predicted,
                is_correct,
                model_output: output.chars().take(MODEL_OUTPUT_CAP).collect(),
            });
        }

        Ok(card)
    }
}
