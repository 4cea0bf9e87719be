pub mod domain;
mod error;
pub mod extract;
pub mod question;
pub mod scoring;

pub use domain::{DEFAULT_DOMAIN, DomainRule, DomainRules};
pub use error::CoreError;
pub use extract::{AnswerExtractor, ExtractionRule, Selector};
pub use question::{
    CHOICES, PLACEHOLDER_OPTION, QuestionItem, RawQuestion, SubjectFilter, letter_for, preprocess,
};
pub use scoring::{
    MODEL_OUTPUT_CAP, OverallStats, ResultAggregator, SampleRecord, Scorecard, Tally,
};
