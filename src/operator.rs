use crate::error::QuizError;
use serde::{Deserialize, Serialize};

/// The four arithmetic operators a puzzle can use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
pub enum Operator {
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl Operator {
    pub const ALL: [Operator; 4] = [
        Operator::Addition,
        Operator::Subtraction,
        Operator::Multiplication,
        Operator::Division,
    ];

    /// Position in per-operator arrays, also the wire code used in query strings
    pub fn index(self) -> usize {
        match self {
            Operator::Addition => 0,
            Operator::Subtraction => 1,
            Operator::Multiplication => 2,
            Operator::Division => 3,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, QuizError> {
        match code {
            0 => Ok(Operator::Addition),
            1 => Ok(Operator::Subtraction),
            2 => Ok(Operator::Multiplication),
            3 => Ok(Operator::Division),
            other => Err(QuizError::UnknownOperator(other)),
        }
    }

    pub fn sign(self) -> &'static str {
        match self {
            Operator::Addition => "+",
            Operator::Subtraction => "−",
            Operator::Multiplication => "×",
            Operator::Division => "÷",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Operator::Addition => "Addisjon",
            Operator::Subtraction => "Subtraksjon",
            Operator::Multiplication => "Multiplikasjon",
            Operator::Division => "Divisjon",
        }
    }

    /// Addition and subtraction draw operands from a numeric range,
    /// multiplication and division from a set of tables.
    pub fn uses_range(self) -> bool {
        matches!(self, Operator::Addition | Operator::Subtraction)
    }
}

/// What the learner picked: one operator, or a mix of all four
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorSelection {
    Single(Operator),
    All,
}

impl OperatorSelection {
    pub const ALL_CODE: i64 = 4;

    pub fn from_code(code: i64) -> Result<Self, QuizError> {
        if code == Self::ALL_CODE {
            return Ok(OperatorSelection::All);
        }
        Operator::from_code(code).map(OperatorSelection::Single)
    }

    pub fn code(self) -> i64 {
        match self {
            OperatorSelection::Single(op) => op.index() as i64,
            OperatorSelection::All => Self::ALL_CODE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OperatorSelection::Single(op) => op.label(),
            OperatorSelection::All => "Alle regnearter",
        }
    }
}

impl From<Operator> for OperatorSelection {
    fn from(op: Operator) -> Self {
        OperatorSelection::Single(op)
    }
}
