use crate::dur::Dur;
use thiserror::Error;

/// Everything that can abort a read. Line numbers are 1-based to match the
/// input text as a user sees it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error("line {line}: the first spined line must contain only exclusive interpretations")]
    MissingExclusive { line: usize },

    #[error("line {line}: expected {expected} spines but found {found}")]
    SpineCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: a spine merger requires at least two adjacent *v tokens")]
    SingleMerge { line: usize },

    #[error("line {line}: a spine exchange requires two adjacent *x tokens")]
    UnmatchedExchange { line: usize },

    #[error("line {line}: an exclusive interpretation is only allowed on a newly added spine")]
    MisplacedExclusive { line: usize },

    #[error("line {line}: a newly added spine must begin with an exclusive interpretation")]
    ExpectedExclusive { line: usize },

    #[error("line {line}: spine manipulation does not match the following line")]
    LinkMismatch { line: usize },

    #[error("spines are not terminated at the end of the input")]
    UnterminatedSpines,

    #[error("line {line}: grace note and regular note cannot occur on same line")]
    GraceAndRegular { line: usize },

    #[error(
        "line {line}: inconsistent rhythm analysis: expected duration from start {expected} but found {found}"
    )]
    InconsistentRhythm {
        line: usize,
        expected: Dur,
        found: Dur,
    },

    #[error("line {line}: unexpected negative duration from start on a data line")]
    NegativeStart { line: usize },

    #[error("line {line}: cannot anchor a floating spine to the score")]
    FloatingSpine { line: usize },

    #[error("line {line}: rational overflow while accumulating durations")]
    Overflow { line: usize },

    #[error("input could not be read: {0}")]
    Io(String),
}
