//! MMLU-Pro question records and preprocessing.
//!
//! Raw records mirror the published dataset columns. Preprocessing drops the
//! `N/A` padding options that MMLU-Pro uses to fill questions up to ten
//! choices, and rebases `answer_index` onto the remaining options.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::CoreError;

/// Answer letters, one per option slot. MMLU-Pro has at most ten choices.
pub const CHOICES: [char; 10] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J'];

/// Padding value used by the dataset for unused option slots.
pub const PLACEHOLDER_OPTION: &str = "N/A";

/// Letter for a zero-based option index, if it is within [`CHOICES`].
pub fn letter_for(index: usize) -> Option<char> {
    CHOICES.get(index).copied()
}

/// A question record as it appears in the dataset splits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQuestion {
    #[serde(default)]
    pub question_id: Option<i64>,
    pub question: String,
    pub options: Vec<String>,
    /// Gold letter as published. May be empty when only the index is known.
    #[serde(default)]
    pub answer: String,
    pub answer_index: i64,
    pub category: String,
    #[serde(default)]
    pub cot_content: Option<String>,
    #[serde(default)]
    pub src: Option<String>,
}

/// A normalized question, ready for prompting and scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionItem {
    pub id: i64,
    pub question: String,
    /// Real options only, in dataset order.
    pub options: Vec<String>,
    pub answer_letter: char,
    /// Index into `options`; always in range.
    pub answer_index: usize,
    pub category: String,
    /// Worked chain-of-thought answer, when the split provides one.
    pub rationale: Option<String>,
    pub source: Option<String>,
}

/// Normalize raw records into [`QuestionItem`]s, preserving order.
///
/// Records without a `question_id` get their position in the output. The
/// first malformed record aborts preprocessing.
pub fn preprocess(raw: Vec<RawQuestion>) -> Result<Vec<QuestionItem>, CoreError> {
    let mut items = Vec::with_capacity(raw.len());
    for record in raw {
        let position = items.len();
        items.push(normalize(record, position)?);
    }
    debug!(count = items.len(), "preprocessed question records");
    Ok(items)
}

fn normalize(record: RawQuestion, position: usize) -> Result<QuestionItem, CoreError> {
    let raw_count = record.options.len();
    let raw_index = usize::try_from(record.answer_index)
        .ok()
        .filter(|&i| i < raw_count)
        .ok_or(CoreError::AnswerOutOfRange {
            position,
            answer_index: record.answer_index,
            options: raw_count,
        })?;

    if record.options[raw_index] == PLACEHOLDER_OPTION {
        return Err(CoreError::PlaceholderAnswer { position });
    }

    let published = record.answer.trim();
    if !published.is_empty() && !letter_matches(published, raw_index) {
        return Err(CoreError::AnswerMismatch {
            position,
            letter: published.to_string(),
            answer_index: raw_index,
        });
    }

    // Placeholders ahead of the answer shift it left once they are removed.
    let shift = record.options[..raw_index]
        .iter()
        .filter(|o| o.as_str() == PLACEHOLDER_OPTION)
        .count();

    let options: Vec<String> = record
        .options
        .into_iter()
        .filter(|o| o != PLACEHOLDER_OPTION)
        .collect();

    if options.len() > CHOICES.len() {
        return Err(CoreError::TooManyOptions {
            position,
            count: options.len(),
            max: CHOICES.len(),
        });
    }

    let answer_index = raw_index - shift;

    Ok(QuestionItem {
        id: record.question_id.unwrap_or(position as i64),
        question: record.question,
        options,
        answer_letter: CHOICES[answer_index],
        answer_index,
        category: record.category,
        rationale: record.cot_content.filter(|s| !s.is_empty()),
        source: record.src.filter(|s| !s.is_empty()),
    })
}

fn letter_matches(published: &str, raw_index: usize) -> bool {
    let mut chars = published.chars();
    match (chars.next(), chars.next(), letter_for(raw_index)) {
        (Some(c), None, Some(expected)) => c.eq_ignore_ascii_case(&expected),
        _ => false,
    }
}

/// Which categories a run evaluates.
///
/// Parsed from `"all"` or a comma-separated list of case-insensitive
/// substrings; a category is selected when any substring occurs in it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubjectFilter {
    #[default]
    All,
    Matching(Vec<String>),
}

impl SubjectFilter {
    pub fn parse(selection: &str) -> Self {
        let selection = selection.trim();
        if selection.is_empty() || selection.eq_ignore_ascii_case("all") {
            return Self::All;
        }
        let needles: Vec<String> = selection
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        if needles.is_empty() {
            Self::All
        } else {
            Self::Matching(needles)
        }
    }

    pub fn matches(&self, category: &str) -> bool {
        match self {
            Self::All => true,
            Self::Matching(needles) => {
                let category = category.to_lowercase();
                needles.iter().any(|n| category.contains(n.as_str()))
            }
        }
    }

    /// Keep only items whose category passes the filter, in order.
    pub fn apply(&self, items: Vec<QuestionItem>) -> Vec<QuestionItem> {
        match self {
            Self::All => items,
            Self::Matching(_) => items
                .into_iter()
                .filter(|item| self.matches(&item.category))
                .collect(),
        }
    }
}
