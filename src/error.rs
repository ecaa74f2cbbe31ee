use crate::operator::Operator;
use thiserror::Error;

/// Invariant violations raised by puzzle generation and scoring.
///
/// These indicate a caller bug and are never recovered from inside the crate.
/// Untrusted input (query strings, stored profiles) is clamped instead.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error("operator not recognized: {0}")]
    UnknownOperator(i64),

    #[error("puzzle mode not recognized: {0}")]
    UnknownPuzzleMode(i64),

    #[error("cannot get operator: no operator selected")]
    MissingOperator,

    #[error("{0} requires at least one table value")]
    EmptyTableSet(Operator),

    #[error("table value {0} is outside 1..=12")]
    TableOutOfRange(i32),

    #[error("{0} settings do not carry the operand pool it needs")]
    PoolMismatch(Operator),

    #[error("no puzzle is waiting for an answer")]
    NoActivePuzzle,

    #[error("invalid operator weights: {0}")]
    Weights(#[from] rand::distributions::WeightedError),
}
