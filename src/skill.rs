use crate::operator::Operator;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Tuning knobs for the skill update rule and the adaptive curves
pub mod tuning {
    pub const MIN_SKILL: u8 = 0;
    pub const MAX_SKILL: u8 = 100;
    pub const MIN_DURATION_SECS: f64 = 0.0;
    pub const MAX_DURATION_SECS: f64 = 12.0;
    pub const TIMEOUT_PENALTY: i32 = 9;
    pub const INCORRECT_PENALTY: i32 = 8;
    pub const CORRECT_GAIN_BASE: f64 = 1.0;
    pub const CORRECT_GAIN_SPEED_FACTOR: f64 = 4.0;

    pub const RANGE_MIN_UPPER_BOUND: i32 = 2;
    pub const RANGE_UPPER_BOUND_BASE: f64 = 2.0;
    pub const RANGE_UPPER_BOUND_SCALE: f64 = 198.0;
    pub const RANGE_UPPER_BOUND_EXPONENT: f64 = 1.45;
    pub const CUSTOM_WINDOW_BASE_RATIO: f64 = 0.15;
    pub const CUSTOM_WINDOW_SCALE_RATIO: f64 = 0.85;
    pub const TABLES_BASE: f64 = 1.0;
    pub const TABLES_SCALE: f64 = 11.0;

    pub const MODE_ALTERNATE_THRESHOLD: u8 = 35;
    pub const MODE_RANDOM_THRESHOLD: u8 = 70;
    pub const MODE_HYSTERESIS: u8 = 5;
}

/// How puzzle parameters are derived from skill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display)]
pub enum DifficultyMode {
    /// Ranges and tables come from skill alone
    #[default]
    Adaptive,
    /// Ranges and tables are a skill-dependent window inside the user's own settings
    CustomAdaptive,
}

impl DifficultyMode {
    pub const CUSTOM_CODE: i64 = 0;
    pub const ADAPTIVE_CODE: i64 = 1;

    /// Older preset levels (2..=6) and missing values all fold into adaptive mode.
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(Self::CUSTOM_CODE) => DifficultyMode::CustomAdaptive,
            _ => DifficultyMode::Adaptive,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            DifficultyMode::Adaptive => Self::ADAPTIVE_CODE,
            DifficultyMode::CustomAdaptive => Self::CUSTOM_CODE,
        }
    }
}

/// Clamp an arbitrary number into a valid skill value. Non-finite input is 0.
pub fn clamp_skill(skill: f64) -> u8 {
    if !skill.is_finite() {
        return tuning::MIN_SKILL;
    }
    skill
        .round()
        .clamp(f64::from(tuning::MIN_SKILL), f64::from(tuning::MAX_SKILL)) as u8
}

/// Skill after one answered puzzle.
///
/// A timeout costs more than a wrong answer and ignores `is_correct`. A correct
/// answer gains between 1 (12 seconds or slower) and 5 (instant).
pub fn updated_skill(skill: f64, is_correct: bool, duration_secs: f64, timed_out: bool) -> u8 {
    let current = i32::from(clamp_skill(skill));

    if timed_out {
        return clamp_skill(f64::from(current - tuning::TIMEOUT_PENALTY));
    }

    if !is_correct {
        return clamp_skill(f64::from(current - tuning::INCORRECT_PENALTY));
    }

    let duration = if duration_secs.is_nan() {
        tuning::MAX_DURATION_SECS
    } else {
        duration_secs.clamp(tuning::MIN_DURATION_SECS, tuning::MAX_DURATION_SECS)
    };
    let speed_factor = (tuning::MAX_DURATION_SECS - duration) / tuning::MAX_DURATION_SECS;
    let gain = (tuning::CORRECT_GAIN_BASE + speed_factor * tuning::CORRECT_GAIN_SPEED_FACTOR).round();

    clamp_skill(f64::from(current) + gain)
}

/// One skill value per operator, indexed by [`Operator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "[u8; 4]", into = "[u8; 4]")]
pub struct SkillMap([u8; 4]);

impl SkillMap {
    pub fn new(values: [u8; 4]) -> Self {
        Self(values.map(|v| v.min(tuning::MAX_SKILL)))
    }

    pub fn values(&self) -> [u8; 4] {
        self.0
    }

    /// Apply one answer outcome to a single operator's skill
    pub fn record(&mut self, operator: Operator, is_correct: bool, duration_secs: f64, timed_out: bool) -> u8 {
        let next = updated_skill(f64::from(self[operator]), is_correct, duration_secs, timed_out);
        self[operator] = next;
        next
    }
}

impl From<[u8; 4]> for SkillMap {
    fn from(values: [u8; 4]) -> Self {
        Self::new(values)
    }
}

impl From<SkillMap> for [u8; 4] {
    fn from(map: SkillMap) -> Self {
        map.0
    }
}

impl Index<Operator> for SkillMap {
    type Output = u8;

    fn index(&self, op: Operator) -> &u8 {
        &self.0[op.index()]
    }
}

impl IndexMut<Operator> for SkillMap {
    fn index_mut(&mut self, op: Operator) -> &mut u8 {
        &mut self.0[op.index()]
    }
}

/// Rebuild a skill map from loosely typed stored data.
/// Anything but a four element array yields the default map.
pub fn sanitize_skill_map(value: &serde_json::Value) -> SkillMap {
    match value.as_array() {
        Some(items) if items.len() == 4 => {
            let mut values = [0u8; 4];
            for (slot, item) in values.iter_mut().zip(items) {
                *slot = clamp_skill(item.as_f64().unwrap_or(f64::NAN));
            }
            SkillMap(values)
        }
        _ => SkillMap::default(),
    }
}

/// Skill vectors for both difficulty modes, kept apart so custom practice
/// does not distort the fully adaptive progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdaptiveProfiles {
    pub adaptive: SkillMap,
    pub custom: SkillMap,
}

impl AdaptiveProfiles {
    pub fn for_mode(&self, mode: DifficultyMode) -> &SkillMap {
        match mode {
            DifficultyMode::Adaptive => &self.adaptive,
            DifficultyMode::CustomAdaptive => &self.custom,
        }
    }

    pub fn for_mode_mut(&mut self, mode: DifficultyMode) -> &mut SkillMap {
        match mode {
            DifficultyMode::Adaptive => &mut self.adaptive,
            DifficultyMode::CustomAdaptive => &mut self.custom,
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        Self {
            adaptive: sanitize_skill_map(&value["adaptive"]),
            custom: sanitize_skill_map(&value["custom"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn difficulty_codes_fold_into_two_modes() {
        assert_eq!(DifficultyMode::from_code(Some(0)), DifficultyMode::CustomAdaptive);
        assert_eq!(DifficultyMode::from_code(Some(1)), DifficultyMode::Adaptive);
        assert_eq!(DifficultyMode::from_code(Some(6)), DifficultyMode::Adaptive);
        assert_eq!(DifficultyMode::from_code(Some(99)), DifficultyMode::Adaptive);
        assert_eq!(DifficultyMode::from_code(None), DifficultyMode::Adaptive);
    }

    #[test]
    fn clamp_skill_handles_non_finite_and_bounds() {
        assert_eq!(clamp_skill(f64::NAN), 0);
        assert_eq!(clamp_skill(f64::INFINITY), 0);
        assert_eq!(clamp_skill(-100.0), 0);
        assert_eq!(clamp_skill(250.0), 100);
        assert_eq!(clamp_skill(41.6), 42);
    }

    #[test]
    fn correct_answers_gain_and_misses_cost() {
        assert_eq!(updated_skill(0.0, true, 2.0, false), 4);
        assert!(updated_skill(0.0, true, 3.0, false) <= 4);
        assert_eq!(updated_skill(20.0, false, 3.0, false), 12);
        assert_eq!(updated_skill(20.0, false, 3.0, true), 11);
        assert_eq!(updated_skill(20.0, true, 3.0, true), 11);
    }

    #[test]
    fn gain_ranges_from_one_to_five() {
        assert_eq!(updated_skill(50.0, true, 0.0, false), 55);
        assert_eq!(updated_skill(50.0, true, 12.0, false), 51);
        assert_eq!(updated_skill(50.0, true, 300.0, false), 51);
        assert_eq!(updated_skill(50.0, true, -4.0, false), 55);
        assert_eq!(updated_skill(50.0, true, f64::NAN, false), 51);
    }

    #[test]
    fn skill_is_capped_to_valid_range() {
        assert_eq!(updated_skill(98.0, true, 2.0, false), 100);
        assert_eq!(updated_skill(1.0, false, 5.0, false), 0);
        assert_eq!(updated_skill(f64::NAN, false, 5.0, true), 0);
        assert_eq!(updated_skill(500.0, true, 0.0, false), 100);
    }

    #[test]
    fn faster_answers_never_gain_less() {
        let mut previous = u8::MAX;
        for tenths in 0..=150 {
            let gain = updated_skill(40.0, true, f64::from(tenths) / 10.0, false);
            assert!(gain <= previous, "gain grew at {tenths} tenths");
            previous = gain;
        }
    }

    #[test]
    fn output_stays_in_bounds_for_any_combination() {
        for skill in [-50.0, 0.0, 3.0, 50.0, 97.0, 100.0, 1e9, f64::NEG_INFINITY] {
            for duration in [-1.0, 0.0, 2.5, 12.0, 99.0] {
                for (correct, timeout) in [(true, false), (false, false), (true, true), (false, true)] {
                    let next = updated_skill(skill, correct, duration, timeout);
                    assert!(next <= 100);
                }
            }
        }
    }

    #[test]
    fn ten_step_trajectory_is_deterministic() {
        // (correct, duration, timeout)
        let steps = [
            (true, 2.0, false),
            (true, 5.0, false),
            (false, 4.0, false),
            (true, 3.0, false),
            (false, 8.0, true),
            (true, 1.0, false),
            (false, 2.0, false),
            (true, 8.0, false),
            (true, 2.0, false),
            (true, 3.0, false),
        ];

        let mut skill = 0u8;
        let progression: Vec<u8> = steps
            .iter()
            .map(|&(correct, duration, timeout)| {
                skill = updated_skill(f64::from(skill), correct, duration, timeout);
                skill
            })
            .collect();

        assert_eq!(progression, vec![4, 7, 0, 4, 0, 5, 0, 2, 6, 10]);
    }

    #[test]
    fn mixed_miss_recovery_sequence() {
        let mut skill = 40u8;
        for correct in [false, false, true, true, true] {
            skill = updated_skill(f64::from(skill), correct, 4.0, false);
        }
        assert_eq!(skill, 36);
    }

    #[test]
    fn skill_map_records_one_operator() {
        let mut map = SkillMap::default();
        let next = map.record(Operator::Division, true, 0.0, false);
        assert_eq!(next, 5);
        assert_eq!(map.values(), [0, 0, 0, 5]);
    }

    #[test]
    fn sanitizes_malformed_skill_maps() {
        assert_eq!(sanitize_skill_map(&serde_json::Value::Null), SkillMap::default());
        assert_eq!(sanitize_skill_map(&json!([1, 2, 3])), SkillMap::default());
        assert_eq!(
            sanitize_skill_map(&json!([1, "x", f64::INFINITY, -100])).values(),
            [1, 0, 0, 0]
        );
        assert_eq!(sanitize_skill_map(&json!([10.4, 200, 50, 0])).values(), [10, 100, 50, 0]);
    }

    #[test]
    fn profiles_are_kept_per_mode() {
        let mut profiles = AdaptiveProfiles::default();
        profiles.for_mode_mut(DifficultyMode::CustomAdaptive)[Operator::Addition] = 30;

        assert_eq!(profiles.for_mode(DifficultyMode::Adaptive)[Operator::Addition], 0);
        assert_eq!(profiles.custom[Operator::Addition], 30);

        let parsed = AdaptiveProfiles::from_json(&json!({ "adaptive": [5, 6, 7, 8] }));
        assert_eq!(parsed.adaptive.values(), [5, 6, 7, 8]);
        assert_eq!(parsed.custom, SkillMap::default());
    }
}
