use crate::error::QuizError;
use crate::operator::Operator;
use crate::puzzle::{get_puzzle, ModeByOperator, Puzzle, PuzzleMode};
use crate::quiz::Quiz;
use crate::score::{score_quiz, QuizScores};
use crate::skill::{DifficultyMode, SkillMap};
use rand::Rng;
use tracing::debug;

/// Seconds a learner gets per puzzle when the quiz has a time limit
pub const PUZZLE_TIME_LIMIT_SECS: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub timed_out: bool,
    pub expected: i32,
    pub operator: Operator,
    pub skill: u8,
}

/// One running quiz: the puzzle loop that feeds answers back into the skill map.
#[derive(Debug, Clone)]
pub struct QuizSession {
    quiz: Quiz,
    skills: SkillMap,
    modes: ModeByOperator,
    puzzles: Vec<Puzzle>,
    current: Option<Puzzle>,
}

impl QuizSession {
    pub fn new(quiz: Quiz, skills: SkillMap) -> Self {
        let modes = match quiz.difficulty {
            DifficultyMode::Adaptive => [PuzzleMode::Normal; 4],
            DifficultyMode::CustomAdaptive => [quiz.puzzle_mode; 4],
        };

        Self {
            quiz,
            skills,
            modes,
            puzzles: Vec::new(),
            current: None,
        }
    }

    /// Generate the next puzzle. An unanswered current puzzle is replaced.
    pub fn next_puzzle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<&Puzzle, QuizError> {
        let previous = self.current.as_ref().or(self.puzzles.last());
        let puzzle = get_puzzle(&self.quiz, &self.skills, &self.modes, previous, rng)?;
        Ok(self.current.insert(puzzle))
    }

    pub fn current(&self) -> Option<&Puzzle> {
        self.current.as_ref()
    }

    /// Answer the current puzzle and update the skill of its operator.
    ///
    /// With a time limit, anything slower than [`PUZZLE_TIME_LIMIT_SECS`]
    /// counts as a timeout.
    pub fn answer(
        &mut self,
        value: Option<i32>,
        duration_secs: f64,
        timed_out: bool,
    ) -> Result<AnswerOutcome, QuizError> {
        let mut puzzle = self.current.take().ok_or(QuizError::NoActivePuzzle)?;
        let timed_out = timed_out || (self.quiz.puzzle_time_limit && duration_secs > PUZZLE_TIME_LIMIT_SECS);
        let correct = puzzle.answer(value, duration_secs, timed_out);

        let operator = puzzle.operator;
        let before = self.skills[operator];
        let skill = self.skills.record(operator, correct, duration_secs, timed_out);
        if let Some(mode) = puzzle.puzzle_mode {
            self.modes[operator.index()] = mode;
        }
        debug!(
            "{operator}: {} in {duration_secs:.1}s, skill {before} -> {skill}",
            if correct { "correct" } else { "wrong" }
        );

        let expected = puzzle.expected_answer();
        self.puzzles.push(puzzle);

        Ok(AnswerOutcome {
            correct,
            timed_out,
            expected,
            operator,
            skill,
        })
    }

    pub fn scores(&self) -> Result<QuizScores, QuizError> {
        score_quiz(&self.quiz, &self.puzzles)
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn skills(&self) -> &SkillMap {
        &self.skills
    }

    pub fn modes(&self) -> &ModeByOperator {
        &self.modes
    }

    pub fn puzzles(&self) -> &[Puzzle] {
        &self.puzzles
    }
}
