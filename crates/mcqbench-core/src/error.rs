use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("record {position}: answer_index {answer_index} out of range for {options} options")]
    AnswerOutOfRange {
        position: usize,
        answer_index: i64,
        options: usize,
    },

    #[error("record {position}: answer points at the placeholder option")]
    PlaceholderAnswer { position: usize },

    #[error("record {position}: answer letter {letter:?} does not match answer_index {answer_index}")]
    AnswerMismatch {
        position: usize,
        letter: String,
        answer_index: usize,
    },

    #[error("record {position}: {count} options exceeds the {max} supported choices")]
    TooManyOptions {
        position: usize,
        count: usize,
        max: usize,
    },

    #[error("{items} test items but {outputs} model outputs")]
    OutputCountMismatch { items: usize, outputs: usize },
}
