//! Answer-letter extraction from free-form model output.
//!
//! Extraction is an ordered cascade of regex rules. Each rule either takes
//! its first or its last match; the first rule that yields a letter decides
//! the prediction. A miss is a normal outcome and is reported as `None`.

use std::sync::LazyLock;

use regex::Regex;

static ANSWER_IS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)answer is \(?([A-J])\)?").expect("static pattern"));
static ANSWER_COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[aA]nswer:\s*([A-J])").expect("static pattern"));
static LAST_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-J])\b").expect("static pattern"));

/// Which match of a rule's pattern to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    First,
    Last,
}

/// One tier of the extraction cascade.
///
/// The pattern's first capture group must hold the answer letter.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    name: &'static str,
    pattern: &'static Regex,
    selector: Selector,
}

impl ExtractionRule {
    fn new(name: &'static str, pattern: &'static Regex, selector: Selector) -> Self {
        Self {
            name,
            pattern,
            selector,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Apply this tier alone.
    pub fn apply(&self, text: &str) -> Option<char> {
        let caps = match self.selector {
            Selector::First => self.pattern.captures(text),
            Selector::Last => self.pattern.captures_iter(text).last(),
        }?;
        caps.get(1)?
            .as_str()
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
    }
}

/// Three-tier extractor:
///
/// 1. `answer is (X)` / `answer is X`, case-insensitive.
/// 2. `Answer: X`.
/// 3. The last standalone letter `A`–`J` anywhere in the text.
#[derive(Debug, Clone)]
pub struct AnswerExtractor {
    rules: Vec<ExtractionRule>,
}

impl AnswerExtractor {
    pub fn new() -> Self {
        Self {
            rules: vec![
                ExtractionRule::new("answer-is", &ANSWER_IS, Selector::First),
                ExtractionRule::new("answer-colon", &ANSWER_COLON, Selector::First),
                ExtractionRule::new("last-letter", &LAST_LETTER, Selector::Last),
            ],
        }
    }

    /// Predicted letter, or `None` when no tier matches.
    pub fn extract(&self, text: &str) -> Option<char> {
        self.extract_with_rule(text).map(|(_, letter)| letter)
    }

    /// Predicted letter together with the name of the tier that produced it.
    pub fn extract_with_rule(&self, text: &str) -> Option<(&'static str, char)> {
        self.rules
            .iter()
            .find_map(|rule| rule.apply(text).map(|letter| (rule.name(), letter)))
    }

    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }
}

impl Default for AnswerExtractor {
    fn default() -> Self {
        Self::new()
    }
}
