use crate::error::QuizError;
use crate::operator::{Operator, OperatorSelection};
use crate::puzzle::Puzzle;
use crate::quiz::{OperatorSettings, Quiz};
use crate::util::{mean, round_half_up};
use serde::{Deserialize, Serialize};

/// Puzzles answered within this many seconds score double
pub const FAST_ANSWER_SECS: f64 = 3.0;

/// Points per multiplication/division table, indexed by `table - 1`
const TABLE_SCORES: [f64; 12] = [
    10.0, 20.0, 30.0, 30.0, 20.0, 40.0, 50.0, 50.0, 40.0, 10.0, 20.0, 60.0,
];

const ALL_OPERATORS_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QuizScores {
    pub total_score: f64,
    pub correct_answer_count: usize,
    pub correct_answer_percentage: u32,
}

/// Score an answered puzzle sequence.
///
/// Base scores for all four operators are computed up front, so invalid
/// settings fail even when no puzzle used that operator.
pub fn score_quiz(quiz: &Quiz, puzzles: &[Puzzle]) -> Result<QuizScores, QuizError> {
    if puzzles.is_empty() {
        return Ok(QuizScores::default());
    }

    let mut base_scores = [0.0; 4];
    for (slot, op) in base_scores.iter_mut().zip(Operator::ALL) {
        *slot = operator_score(quiz.settings_for(op))?;
    }

    let selection_multiplier = match quiz.selected_operator {
        Some(OperatorSelection::All) => ALL_OPERATORS_MULTIPLIER,
        _ => 1.0,
    };
    let time_limit_multiplier = if quiz.puzzle_time_limit { 2.0 } else { 1.0 };

    let mut total_score = 0.0;
    let mut correct_answer_count = 0;
    for puzzle in puzzles {
        let mode = puzzle.puzzle_mode.unwrap_or(quiz.puzzle_mode);
        let base = base_scores[puzzle.operator.index()] * mode.score_multiplier() * selection_multiplier;

        if puzzle.is_correct == Some(true) {
            correct_answer_count += 1;
            let speed_multiplier = if puzzle.duration_secs <= FAST_ANSWER_SECS { 2.0 } else { 1.0 };
            total_score += base * speed_multiplier * time_limit_multiplier;
        } else {
            total_score -= base * time_limit_multiplier;
        }
    }

    let percentage = round_half_up(correct_answer_count as f64 / puzzles.len() as f64 * 100.0);

    Ok(QuizScores {
        total_score,
        correct_answer_count,
        correct_answer_percentage: percentage as u32,
    })
}

/// Base points for one operator's settings
pub fn operator_score(settings: &OperatorSettings) -> Result<f64, QuizError> {
    if settings.operator.uses_range() {
        let range = settings.range()?;
        let (min, max) = (f64::from(range.min), f64::from(range.max));
        return Ok(round_half_up((max - min) * max / 10.0));
    }

    let tables = settings.tables()?;
    let points = tables
        .iter()
        .map(|&table| table_score(table))
        .collect::<Result<Vec<_>, _>>()?;

    mean(&points)
        .map(round_half_up)
        .ok_or(QuizError::EmptyTableSet(settings.operator))
}

fn table_score(table: i32) -> Result<f64, QuizError> {
    usize::try_from(table)
        .ok()
        .and_then(|t| t.checked_sub(1))
        .and_then(|i| TABLE_SCORES.get(i).copied())
        .ok_or(QuizError::TableOutOfRange(table))
}
