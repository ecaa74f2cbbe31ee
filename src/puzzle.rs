use crate::error::QuizError;
use crate::operator::Operator;
use crate::policy::{effective_puzzle_mode, resolve_operator};
use crate::quiz::{NumberRange, OperatorSettings, Quiz};
use crate::skill::{DifficultyMode, SkillMap};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of the result in `a op b = c`
pub const RESULT_PART: usize = 2;

/// Range the second factor and the division quotient are drawn from
const FACTOR_RANGE: NumberRange = NumberRange { min: 1, max: 10 };

/// Which part of the puzzle is hidden
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PuzzleMode {
    /// Always the result
    #[default]
    Normal,
    /// Always one of the operands
    Alternate,
    /// A coin flip between the two above, per puzzle
    Random,
}

impl PuzzleMode {
    pub fn from_code(code: i64) -> Result<Self, QuizError> {
        match code {
            0 => Ok(PuzzleMode::Normal),
            1 => Ok(PuzzleMode::Alternate),
            2 => Ok(PuzzleMode::Random),
            other => Err(QuizError::UnknownPuzzleMode(other)),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            PuzzleMode::Normal => 0,
            PuzzleMode::Alternate => 1,
            PuzzleMode::Random => 2,
        }
    }

    pub fn score_multiplier(self) -> f64 {
        match self {
            PuzzleMode::Normal => 1.0,
            PuzzleMode::Alternate => 1.5,
            PuzzleMode::Random => 2.0,
        }
    }
}

/// Current adaptive puzzle mode for each operator, indexed by [`Operator::index`]
pub type ModeByOperator = [PuzzleMode; 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PuzzlePart {
    pub generated_value: i32,
    pub user_defined_value: Option<i32>,
}

impl PuzzlePart {
    fn new(generated_value: i32) -> Self {
        Self {
            generated_value,
            user_defined_value: None,
        }
    }
}

/// One `a op b = c` task with exactly one hidden part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Puzzle {
    pub parts: [PuzzlePart; 3],
    pub operator: Operator,
    pub unknown_part: usize,
    pub puzzle_mode: Option<PuzzleMode>,
    pub is_correct: Option<bool>,
    pub duration_secs: f64,
    pub timeout: bool,
}

impl Puzzle {
    pub fn expected_answer(&self) -> i32 {
        self.parts[self.unknown_part].generated_value
    }

    /// Record the learner's answer. A timed out puzzle is never correct.
    pub fn answer(&mut self, value: Option<i32>, duration_secs: f64, timed_out: bool) -> bool {
        self.parts[self.unknown_part].user_defined_value = value;
        self.duration_secs = duration_secs;
        self.timeout = timed_out;

        let correct = !timed_out && value == Some(self.expected_answer());
        self.is_correct = Some(correct);
        correct
    }
}

impl fmt::Display for Puzzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |i: usize| {
            if i == self.unknown_part {
                "?".to_string()
            } else {
                self.parts[i].generated_value.to_string()
            }
        };
        write!(f, "{} {} {} = {}", show(0), self.operator.sign(), show(1), show(2))
    }
}

/// Build the next puzzle for a quiz.
///
/// `modes` holds the adaptive puzzle mode each operator is currently in; the
/// returned puzzle records the mode it was generated with.
pub fn get_puzzle<R: Rng + ?Sized>(
    quiz: &Quiz,
    skills: &SkillMap,
    modes: &ModeByOperator,
    previous: Option<&Puzzle>,
    rng: &mut R,
) -> Result<Puzzle, QuizError> {
    let operator = resolve_operator(quiz.selected_operator, skills, quiz.difficulty, rng)?;
    let skill = skills[operator];
    let settings = quiz.settings_for(operator).adapted(skill, quiz.difficulty)?;

    let puzzle_mode = match quiz.difficulty {
        DifficultyMode::Adaptive => effective_puzzle_mode(skill, modes[operator.index()]),
        DifficultyMode::CustomAdaptive => quiz.puzzle_mode,
    };

    let parts = generate_parts(
        &settings,
        previous.map(|p| &p.parts),
        quiz.allow_negative_answers,
        rng,
    )?;

    Ok(Puzzle {
        parts,
        operator,
        unknown_part: unknown_puzzle_part(operator, puzzle_mode, rng),
        puzzle_mode: Some(puzzle_mode),
        is_correct: None,
        duration_secs: 0.0,
        timeout: false,
    })
}

/// Draw the three parts so that `parts[2] = parts[0] op parts[1]`.
///
/// Each operand avoids the value it had in the previous puzzle unless its pool
/// holds a single value.
pub fn generate_parts<R: Rng + ?Sized>(
    settings: &OperatorSettings,
    previous: Option<&[PuzzlePart; 3]>,
    allow_negative_answers: bool,
    rng: &mut R,
) -> Result<[PuzzlePart; 3], QuizError> {
    let previous_value = |i: usize| previous.map(|p| p[i].generated_value);

    let (a, b, c) = match settings.operator {
        Operator::Addition => {
            let range = settings.range()?;
            let a = random_number(rng, range, previous_value(0));
            let b = random_number(rng, range, previous_value(1));
            (a, b, a + b)
        }
        Operator::Subtraction => {
            let range = settings.range()?;
            let mut a = random_number(rng, range, previous_value(0));
            let mut b = random_number(rng, range, previous_value(1));
            if !allow_negative_answers && b > a {
                std::mem::swap(&mut a, &mut b);
            }
            (a, b, a - b)
        }
        Operator::Multiplication => {
            let tables = settings.tables()?;
            let a = random_table_value(rng, settings.operator, tables, previous_value(0))?;
            let b = random_number(rng, FACTOR_RANGE, previous_value(1));
            (a, b, a * b)
        }
        Operator::Division => {
            let tables = settings.tables()?;
            let previous_quotient = previous.and_then(|p| {
                let (dividend, divisor) = (p[0].generated_value, p[1].generated_value);
                (divisor != 0 && dividend % divisor == 0).then(|| dividend / divisor)
            });
            let quotient = random_number(rng, FACTOR_RANGE, previous_quotient);
            let divisor = random_table_value(rng, settings.operator, tables, previous_value(1))?;
            if divisor == 0 {
                return Err(QuizError::TableOutOfRange(divisor));
            }
            (quotient * divisor, divisor, quotient)
        }
    };

    Ok([PuzzlePart::new(a), PuzzlePart::new(b), PuzzlePart::new(c)])
}

/// Which part the learner has to fill in
pub fn unknown_puzzle_part<R: Rng + ?Sized>(operator: Operator, mode: PuzzleMode, rng: &mut R) -> usize {
    match mode {
        PuzzleMode::Normal => RESULT_PART,
        PuzzleMode::Alternate => alternate_unknown_part(operator, rng),
        PuzzleMode::Random => {
            if rng.gen_bool(0.5) {
                alternate_unknown_part(operator, rng)
            } else {
                RESULT_PART
            }
        }
    }
}

fn alternate_unknown_part<R: Rng + ?Sized>(operator: Operator, rng: &mut R) -> usize {
    match operator {
        Operator::Addition | Operator::Subtraction => {
            if rng.gen_bool(0.5) {
                0
            } else {
                1
            }
        }
        Operator::Multiplication => 1,
        Operator::Division => 0,
    }
}

fn random_number<R: Rng + ?Sized>(rng: &mut R, range: NumberRange, exclude: Option<i32>) -> i32 {
    let (low, high) = (range.min.min(range.max), range.min.max(range.max));
    if low == high {
        return low;
    }

    loop {
        let value = rng.gen_range(low..=high);
        if Some(value) != exclude {
            return value;
        }
    }
}

fn random_table_value<R: Rng + ?Sized>(
    rng: &mut R,
    operator: Operator,
    tables: &[i32],
    previous: Option<i32>,
) -> Result<i32, QuizError> {
    match tables {
        [] => Err(QuizError::EmptyTableSet(operator)),
        [only] => Ok(*only),
        _ => {
            let previous_index = previous.and_then(|p| tables.iter().position(|v| *v == p));
            loop {
                let index = rng.gen_range(0..tables.len());
                if Some(index) != previous_index {
                    return Ok(tables[index]);
                }
            }
        }
    }
}
