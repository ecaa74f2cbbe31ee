// Library surface for the binary and integration tests.
pub mod app_dirs;
pub mod error;
pub mod history;
pub mod operator;
pub mod policy;
pub mod puzzle;
pub mod quiz;
pub mod score;
pub mod session;
pub mod skill;
pub mod store;
pub mod util;

pub use error::QuizError;
pub use operator::{Operator, OperatorSelection};
pub use puzzle::{Puzzle, PuzzleMode};
pub use quiz::Quiz;
pub use session::QuizSession;
pub use skill::{DifficultyMode, SkillMap};
