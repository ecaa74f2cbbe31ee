use crate::error::QuizError;
use crate::operator::{Operator, OperatorSelection};
use crate::puzzle::PuzzleMode;
use crate::quiz::{NumberRange, OperandPool};
use crate::skill::{clamp_skill, tuning, DifficultyMode, SkillMap};
use crate::util::round_half_up;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Operand pool for `operator` at the given skill.
///
/// Addition and subtraction get a range, multiplication and division a table
/// set. In custom mode the result always lies inside `base_range` / `base_tables`.
pub fn settings_for_operator(
    operator: Operator,
    skill: u8,
    mode: DifficultyMode,
    base_range: NumberRange,
    base_tables: &[i32],
) -> OperandPool {
    let skill = clamp_skill(f64::from(skill));

    match (operator.uses_range(), mode) {
        (true, DifficultyMode::Adaptive) => {
            OperandPool::Range(NumberRange::new(1, adaptive_upper_bound(skill)))
        }
        (true, DifficultyMode::CustomAdaptive) => {
            OperandPool::Range(adaptive_range_within(base_range, skill))
        }
        (false, DifficultyMode::Adaptive) => OperandPool::Tables(adaptive_tables(skill)),
        (false, DifficultyMode::CustomAdaptive) => {
            OperandPool::Tables(adaptive_subset_within(base_tables, skill))
        }
    }
}

fn adaptive_upper_bound(skill: u8) -> i32 {
    let normalized = f64::from(skill) / 100.0;
    let curve = normalized.powf(tuning::RANGE_UPPER_BOUND_EXPONENT);
    let bound = round_half_up(tuning::RANGE_UPPER_BOUND_BASE + curve * tuning::RANGE_UPPER_BOUND_SCALE);

    (bound as i32).max(tuning::RANGE_MIN_UPPER_BOUND)
}

/// A window over the base range that widens and slides towards the top as skill grows.
fn adaptive_range_within(range: NumberRange, skill: u8) -> NumberRange {
    let (min, max) = (range.min, range.max);
    let span = (max - min).max(1);
    let normalized = f64::from(skill) / 100.0;

    let window_ratio =
        tuning::CUSTOM_WINDOW_BASE_RATIO + normalized * tuning::CUSTOM_WINDOW_SCALE_RATIO;
    let window = (round_half_up(f64::from(span) * window_ratio) as i32).max(1);
    let max_start = max - window;
    let start = round_half_up(f64::from(min) + f64::from(max_start) * normalized) as i32;
    let end = max.min(start + window);

    let bounded_start = start.min(max - 1).max(min);
    let bounded_end = end.max(bounded_start + 1).min(max);

    NumberRange::new(bounded_start, bounded_end)
}

fn adaptive_tables(skill: u8) -> Vec<i32> {
    let highest = round_half_up(tuning::TABLES_BASE + tuning::TABLES_SCALE * f64::from(skill) / 100.0) as i32;
    (1..=highest.max(1)).collect()
}

/// The smallest of the user's tables are unlocked first.
fn adaptive_subset_within(values: &[i32], skill: u8) -> Vec<i32> {
    let mut tables: Vec<i32> = values.iter().copied().filter(|v| *v > 0).collect();
    tables.sort_unstable();
    tables.dedup();

    if tables.is_empty() {
        return vec![1];
    }

    let count = round_half_up(1.0 + (tables.len() - 1) as f64 * f64::from(skill) / 100.0) as usize;
    tables.truncate(count.max(1));
    tables
}

/// Next puzzle mode for adaptive difficulty.
///
/// Moves at most one step per call and only once skill clears a threshold by
/// the hysteresis margin, so a skill hovering at a boundary does not flip modes.
pub fn effective_puzzle_mode(skill: u8, current: PuzzleMode) -> PuzzleMode {
    let skill = clamp_skill(f64::from(skill));
    let alternate = tuning::MODE_ALTERNATE_THRESHOLD;
    let random = tuning::MODE_RANDOM_THRESHOLD;
    let band = tuning::MODE_HYSTERESIS;

    match current {
        PuzzleMode::Normal if skill >= alternate + band => PuzzleMode::Alternate,
        PuzzleMode::Normal => PuzzleMode::Normal,
        PuzzleMode::Alternate if skill >= random + band => PuzzleMode::Random,
        PuzzleMode::Alternate if skill < alternate - band => PuzzleMode::Normal,
        PuzzleMode::Alternate => PuzzleMode::Alternate,
        PuzzleMode::Random if skill < random - band => PuzzleMode::Alternate,
        PuzzleMode::Random => PuzzleMode::Random,
    }
}

/// Pick the operator for the next puzzle.
///
/// With all operators selected in adaptive mode the weakest operators come up
/// most often (weight `100 - skill`, at least 1); custom mode picks uniformly.
pub fn resolve_operator<R: Rng + ?Sized>(
    selection: Option<OperatorSelection>,
    skills: &SkillMap,
    mode: DifficultyMode,
    rng: &mut R,
) -> Result<Operator, QuizError> {
    match selection {
        None => Err(QuizError::MissingOperator),
        Some(OperatorSelection::Single(op)) => Ok(op),
        Some(OperatorSelection::All) => match mode {
            DifficultyMode::Adaptive => {
                let weights = Operator::ALL.map(|op| 100u32.saturating_sub(u32::from(skills[op])).max(1));
                let dist = WeightedIndex::new(weights)?;
                Ok(Operator::ALL[dist.sample(rng)])
            }
            DifficultyMode::CustomAdaptive => Ok(Operator::ALL[rng.gen_range(0..Operator::ALL.len())]),
        },
    }
}
