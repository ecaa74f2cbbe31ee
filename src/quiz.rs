use crate::error::QuizError;
use crate::operator::{Operator, OperatorSelection};
use crate::policy::settings_for_operator;
use crate::puzzle::PuzzleMode;
use crate::skill::DifficultyMode;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const MIN_DURATION_MINUTES: f64 = 0.5;
pub const MAX_DURATION_MINUTES: f64 = 480.0;
pub const ADDITION_BOUNDS: NumberRange = NumberRange { min: 1, max: 100 };
pub const SUBTRACTION_BOUNDS: NumberRange = NumberRange { min: -40, max: 50 };
pub const TABLE_BOUNDS: NumberRange = NumberRange { min: 1, max: 12 };
const DEFAULT_MULTIPLICATION_TABLES: [i32; 1] = [7];
const DEFAULT_DIVISION_TABLES: [i32; 1] = [5];

/// Inclusive integer range, always stored with `min <= max`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberRange {
    pub min: i32,
    pub max: i32,
}

impl NumberRange {
    pub fn new(a: i32, b: i32) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn clamp_into(self, bounds: NumberRange) -> Self {
        Self::new(
            self.min.clamp(bounds.min, bounds.max),
            self.max.clamp(bounds.min, bounds.max),
        )
    }

    pub fn contains(&self, value: i32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Where an operator draws its first operand from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperandPool {
    /// Addition and subtraction
    Range(NumberRange),
    /// Multiplication and division tables
    Tables(Vec<i32>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorSettings {
    pub operator: Operator,
    pub pool: OperandPool,
}

impl OperatorSettings {
    pub fn with_range(operator: Operator, range: NumberRange) -> Self {
        Self {
            operator,
            pool: OperandPool::Range(range),
        }
    }

    pub fn with_tables(operator: Operator, tables: Vec<i32>) -> Self {
        Self {
            operator,
            pool: OperandPool::Tables(tables),
        }
    }

    pub fn range(&self) -> Result<NumberRange, QuizError> {
        match (&self.pool, self.operator.uses_range()) {
            (OperandPool::Range(range), true) => Ok(*range),
            _ => Err(QuizError::PoolMismatch(self.operator)),
        }
    }

    pub fn tables(&self) -> Result<&[i32], QuizError> {
        match (&self.pool, self.operator.uses_range()) {
            (OperandPool::Tables(tables), false) => Ok(tables.as_slice()),
            _ => Err(QuizError::PoolMismatch(self.operator)),
        }
    }

    /// These settings narrowed (or replaced) according to skill and difficulty mode
    pub fn adapted(&self, skill: u8, mode: DifficultyMode) -> Result<Self, QuizError> {
        let (base_range, base_tables) = if self.operator.uses_range() {
            (self.range()?, &[][..])
        } else {
            (NumberRange::new(0, 0), self.tables()?)
        };

        Ok(Self {
            operator: self.operator,
            pool: settings_for_operator(self.operator, skill, mode, base_range, base_tables),
        })
    }
}

/// A quiz configuration, usually parsed from a query string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub title: Option<String>,
    pub show_settings: bool,
    pub duration_minutes: f64,
    pub puzzle_time_limit: bool,
    pub difficulty: DifficultyMode,
    pub allow_negative_answers: bool,
    pub operator_settings: [OperatorSettings; 4],
    pub selected_operator: Option<OperatorSelection>,
    pub puzzle_mode: PuzzleMode,
    /// Total score of the last finished quiz, filled in by the caller
    pub previous_score: Option<f64>,
}

impl Default for Quiz {
    fn default() -> Self {
        Self::from_query("")
    }
}

impl Quiz {
    /// Parse a quiz from `key=value&...` pairs.
    ///
    /// Never fails: malformed values fall back to defaults and out of range
    /// values are clamped.
    pub fn from_query(query: &str) -> Self {
        let params = QueryParams::parse(query);
        let difficulty = DifficultyMode::from_code(params.int("difficulty"));
        let adaptive = difficulty == DifficultyMode::Adaptive;

        let duration_minutes = params
            .float("duration")
            .filter(|d| d.is_finite())
            .unwrap_or(MIN_DURATION_MINUTES)
            .clamp(MIN_DURATION_MINUTES, MAX_DURATION_MINUTES);

        let puzzle_mode = if adaptive {
            PuzzleMode::Normal
        } else {
            params
                .int("puzzleMode")
                .and_then(|code| PuzzleMode::from_code(code).ok())
                .unwrap_or_default()
        };

        Self {
            title: params.text("title"),
            show_settings: params.flag("showSettings"),
            duration_minutes,
            puzzle_time_limit: params.int("timeLimit").is_some_and(|v| v != 0),
            difficulty,
            allow_negative_answers: adaptive || params.flag("allowNegativeAnswers"),
            operator_settings: [
                OperatorSettings::with_range(
                    Operator::Addition,
                    params.range("addMin", "addMax", ADDITION_BOUNDS),
                ),
                OperatorSettings::with_range(
                    Operator::Subtraction,
                    params.range("subMin", "subMax", SUBTRACTION_BOUNDS),
                ),
                OperatorSettings::with_tables(
                    Operator::Multiplication,
                    params.tables("mulValues", &DEFAULT_MULTIPLICATION_TABLES),
                ),
                OperatorSettings::with_tables(
                    Operator::Division,
                    params.tables("divValues", &DEFAULT_DIVISION_TABLES),
                ),
            ],
            selected_operator: params
                .int("operator")
                .and_then(|code| OperatorSelection::from_code(code).ok()),
            puzzle_mode,
            previous_score: None,
        }
    }

    /// Serialize back to the query string format read by [`Quiz::from_query`]
    pub fn to_query_string(&self) -> String {
        let [add, sub, mul, div] = &self.operator_settings;
        let range_part = |settings: &OperatorSettings, pick: fn(NumberRange) -> i32| {
            settings.range().map(|r| pick(r).to_string()).unwrap_or_default()
        };
        let tables_part =
            |settings: &OperatorSettings| settings.tables().map(|t| t.iter().join(",")).unwrap_or_default();

        let pairs = [
            ("duration", self.duration_minutes.to_string()),
            ("timeLimit", if self.puzzle_time_limit { "3" } else { "0" }.to_string()),
            (
                "operator",
                self.selected_operator.map(|s| s.code().to_string()).unwrap_or_default(),
            ),
            ("addMin", range_part(add, |r| r.min)),
            ("addMax", range_part(add, |r| r.max)),
            ("subMin", range_part(sub, |r| r.min)),
            ("subMax", range_part(sub, |r| r.max)),
            ("mulValues", tables_part(mul)),
            ("divValues", tables_part(div)),
            ("puzzleMode", self.puzzle_mode.code().to_string()),
            ("difficulty", self.difficulty.code().to_string()),
            ("allowNegativeAnswers", self.allow_negative_answers.to_string()),
        ];

        pairs
            .iter()
            .map(|(key, value)| format!("{key}={}", encode_component(value)))
            .join("&")
    }

    pub fn title(&self) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }

        let label = self
            .selected_operator
            .map(OperatorSelection::label)
            .unwrap_or("Regneflyt");
        let mode = match self.difficulty {
            DifficultyMode::Adaptive => "Adaptiv",
            DifficultyMode::CustomAdaptive => "Egendefinert adaptiv",
        };
        format!("{label}: {mode}")
    }

    /// Switch difficulty mode. Adaptive mode always starts from normal puzzles
    /// and allows negative answers; custom mode keeps the current choices.
    pub fn with_difficulty(&self, difficulty: DifficultyMode) -> Self {
        let mut next = self.clone();
        next.difficulty = difficulty;
        if next.duration_minutes <= 0.0 {
            next.duration_minutes = MIN_DURATION_MINUTES;
        }

        if difficulty == DifficultyMode::Adaptive {
            next.puzzle_mode = PuzzleMode::Normal;
            next.allow_negative_answers = true;
        }

        next
    }

    pub fn settings_for(&self, operator: Operator) -> &OperatorSettings {
        &self.operator_settings[operator.index()]
    }
}

/// Decoded `key=value` pairs. The first occurrence of a key wins.
struct QueryParams(HashMap<String, String>);

impl QueryParams {
    fn parse(query: &str) -> Self {
        let mut map = HashMap::new();
        for pair in query.trim_start_matches('?').split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            map.entry(decode_component(key))
                .or_insert_with(|| decode_component(value));
        }
        Self(map)
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    fn int(&self, key: &str) -> Option<i64> {
        self.get(key)?.trim().parse().ok()
    }

    fn float(&self, key: &str) -> Option<f64> {
        self.get(key)?.trim().parse().ok()
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key) != Some("false")
    }

    fn text(&self, key: &str) -> Option<String> {
        self.get(key)
            .filter(|v| !v.is_empty() && *v != "undefined")
            .map(str::to_string)
    }

    fn range(&self, min_key: &str, max_key: &str, bounds: NumberRange) -> NumberRange {
        let read = |key: &str, default: i32| {
            self.int(key)
                .map(|v| v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
                .unwrap_or(default)
        };
        NumberRange::new(read(min_key, 1), read(max_key, 20)).clamp_into(bounds)
    }

    fn tables(&self, key: &str, default: &[i32]) -> Vec<i32> {
        let values: Vec<i32> = match self.get(key) {
            Some(raw) if raw != "null" => raw
                .split(',')
                .filter_map(|v| v.trim().parse::<i32>().ok())
                .filter(|v| TABLE_BOUNDS.contains(*v))
                .collect(),
            _ => Vec::new(),
        };

        if values.is_empty() {
            default.to_vec()
        } else {
            values
        }
    }
}

fn decode_component(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() && hex_pair(bytes[i + 1], bytes[i + 2]).is_some() => {
                out.extend(hex_pair(bytes[i + 1], bytes[i + 2]));
                i += 2;
            }
            other => out.push(other),
        }
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_pair(hi: u8, lo: u8) -> Option<u8> {
    let digit = |b: u8| (b as char).to_digit(16);
    Some((digit(hi)? * 16 + digit(lo)?) as u8)
}

fn encode_component(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'*' | b'-' | b'.' | b'_' => (b as char).to_string(),
            b' ' => "+".to_string(),
            other => format!("%{other:02X}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn number_range_orders_its_ends() {
        assert_eq!(NumberRange::new(90, 10), NumberRange { min: 10, max: 90 });
        assert!(NumberRange::new(1, 3).contains(3));
        assert!(!NumberRange::new(1, 3).contains(4));
    }

    #[test]
    fn settings_pool_must_match_operator() {
        let wrong = OperatorSettings::with_tables(Operator::Addition, vec![2]);
        assert_matches!(wrong.range(), Err(QuizError::PoolMismatch(Operator::Addition)));
        assert_matches!(
            wrong.adapted(10, DifficultyMode::Adaptive),
            Err(QuizError::PoolMismatch(Operator::Addition))
        );

        let right = OperatorSettings::with_tables(Operator::Division, vec![3, 4]);
        assert_eq!(right.tables().unwrap(), &[3, 4]);
    }

    #[test]
    fn adapted_custom_settings_stay_inside_base() {
        let base = OperatorSettings::with_tables(Operator::Multiplication, vec![3, 7, 9]);
        let adapted = base.adapted(0, DifficultyMode::CustomAdaptive).unwrap();
        assert_eq!(adapted.pool, OperandPool::Tables(vec![3]));
    }

    #[test]
    fn defaults_when_params_are_missing_or_null_like() {
        let quiz = Quiz::from_query("title=&mulValues=null&divValues=null");

        assert_eq!(quiz.title, None);
        assert!(quiz.show_settings);
        assert_eq!(quiz.duration_minutes, 0.5);
        assert!(!quiz.puzzle_time_limit);
        assert!(quiz.allow_negative_answers);
        assert_eq!(quiz.difficulty, DifficultyMode::Adaptive);
        assert_eq!(quiz.selected_operator, None);
        assert_eq!(quiz.settings_for(Operator::Addition).range().unwrap(), NumberRange::new(1, 20));
        assert_eq!(quiz.settings_for(Operator::Multiplication).tables().unwrap(), &[7]);
        assert_eq!(quiz.settings_for(Operator::Division).tables().unwrap(), &[5]);
    }

    #[test]
    fn parses_values_and_compat_flags() {
        let quiz = Quiz::from_query(
            "title=undefined&showSettings=false&duration=2.5&timeLimit=3&difficulty=1\
             &allowNegativeAnswers=true&mulValues=3,5&divValues=2,4&puzzleMode=2&operator=3",
        );

        assert_eq!(quiz.title, None);
        assert!(!quiz.show_settings);
        assert_eq!(quiz.duration_minutes, 2.5);
        assert!(quiz.puzzle_time_limit);
        assert_eq!(quiz.selected_operator, Some(OperatorSelection::Single(Operator::Division)));
        assert_eq!(quiz.puzzle_mode, PuzzleMode::Normal);
        assert_eq!(quiz.settings_for(Operator::Multiplication).tables().unwrap(), &[3, 5]);
        assert_eq!(quiz.settings_for(Operator::Division).tables().unwrap(), &[2, 4]);
    }

    #[test]
    fn legacy_levels_become_adaptive() {
        let quiz = Quiz::from_query("operator=0&difficulty=6&allowNegativeAnswers=false");
        assert_eq!(quiz.difficulty, DifficultyMode::Adaptive);
        assert!(quiz.allow_negative_answers);

        let quiz = Quiz::from_query("operator=1");
        assert_eq!(quiz.difficulty, DifficultyMode::Adaptive);
        assert_eq!(quiz.selected_operator, Some(OperatorSelection::Single(Operator::Subtraction)));
    }

    #[test]
    fn custom_mode_keeps_puzzle_mode_and_negative_flag() {
        let quiz = Quiz::from_query("difficulty=0&puzzleMode=2&allowNegativeAnswers=false&operator=4");
        assert_eq!(quiz.difficulty, DifficultyMode::CustomAdaptive);
        assert_eq!(quiz.puzzle_mode, PuzzleMode::Random);
        assert!(!quiz.allow_negative_answers);
        assert_eq!(quiz.selected_operator, Some(OperatorSelection::All));

        let unknown_mode = Quiz::from_query("difficulty=0&puzzleMode=9&operator=77");
        assert_eq!(unknown_mode.puzzle_mode, PuzzleMode::Normal);
        assert_eq!(unknown_mode.selected_operator, None);
    }

    #[test]
    fn clamps_malformed_durations() {
        assert_eq!(Quiz::from_query("duration=-10").duration_minutes, 0.5);
        assert_eq!(Quiz::from_query("duration=999").duration_minutes, 480.0);
        assert_eq!(Quiz::from_query("duration=abc").duration_minutes, 0.5);
        assert_eq!(Quiz::from_query("duration=NaN").duration_minutes, 0.5);
    }

    #[test]
    fn normalizes_ranges() {
        let quiz = Quiz::from_query("addMin=90&addMax=10&subMin=-100&subMax=999");
        assert_eq!(quiz.settings_for(Operator::Addition).range().unwrap(), NumberRange::new(10, 90));
        assert_eq!(quiz.settings_for(Operator::Subtraction).range().unwrap(), NumberRange::new(-40, 50));

        let quiz = Quiz::from_query("addMin=-5&addMax=500");
        assert_eq!(quiz.settings_for(Operator::Addition).range().unwrap(), NumberRange::new(1, 100));
    }

    #[test]
    fn filters_invalid_table_values() {
        let quiz = Quiz::from_query("mulValues=0,3,13,foo&divValues=100,bar");
        assert_eq!(quiz.settings_for(Operator::Multiplication).tables().unwrap(), &[3]);
        assert_eq!(quiz.settings_for(Operator::Division).tables().unwrap(), &[5]);
    }

    #[test]
    fn titles() {
        let mut quiz = Quiz::from_query("operator=2&difficulty=0");
        assert_eq!(quiz.title(), "Multiplikasjon: Egendefinert adaptiv");
        quiz.difficulty = DifficultyMode::Adaptive;
        assert_eq!(quiz.title(), "Multiplikasjon: Adaptiv");

        let named = Quiz::from_query("title=Rask+matte&operator=0");
        assert_eq!(named.title(), "Rask matte");
        let encoded = Quiz::from_query("title=Rask%20matte");
        assert_eq!(encoded.title(), "Rask matte");
    }

    #[test]
    fn switching_difficulty() {
        let mut quiz = Quiz::from_query("difficulty=0&puzzleMode=2&operator=0");
        quiz.allow_negative_answers = false;

        let adaptive = quiz.with_difficulty(DifficultyMode::Adaptive);
        assert_eq!(adaptive.puzzle_mode, PuzzleMode::Normal);
        assert!(adaptive.allow_negative_answers);

        let custom = quiz.with_difficulty(DifficultyMode::CustomAdaptive);
        assert_eq!(custom.puzzle_mode, PuzzleMode::Random);
        assert!(!custom.allow_negative_answers);

        quiz.duration_minutes = 0.0;
        assert_eq!(quiz.with_difficulty(DifficultyMode::CustomAdaptive).duration_minutes, 0.5);
    }

    #[test]
    fn serializes_query_string() {
        let mut quiz = Quiz::from_query("operator=0&difficulty=1");
        quiz.duration_minutes = 2.0;
        quiz.puzzle_time_limit = true;
        quiz.selected_operator = Some(OperatorSelection::Single(Operator::Division));
        quiz.puzzle_mode = PuzzleMode::Random;

        assert_eq!(
            quiz.to_query_string(),
            "duration=2&timeLimit=3&operator=3&addMin=1&addMax=20&subMin=1&subMax=20\
             &mulValues=7&divValues=5&puzzleMode=2&difficulty=1&allowNegativeAnswers=true"
        );

        quiz.selected_operator = None;
        quiz.operator_settings[2] = OperatorSettings::with_tables(Operator::Multiplication, vec![3, 5]);
        let query = quiz.to_query_string();
        assert!(query.contains("operator=&"));
        assert!(query.contains("mulValues=3%2C5"));
    }

    #[test]
    fn serialized_query_parses_back() {
        let quiz = Quiz::from_query(
            "difficulty=0&operator=4&puzzleMode=1&addMin=5&addMax=15&subMin=-10&subMax=10\
             &mulValues=2,3&divValues=4&duration=3&timeLimit=3&allowNegativeAnswers=false",
        );
        let reparsed = Quiz::from_query(&quiz.to_query_string());
        assert_eq!(reparsed, quiz);
    }
}
