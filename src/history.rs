use crate::app_dirs::AppDirs;
use crate::operator::OperatorSelection;
use crate::score::QuizScores;
use crate::session::QuizSession;
use crate::skill::DifficultyMode;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One finished quiz
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizResult {
    pub title: String,
    pub difficulty: DifficultyMode,
    pub operator: Option<OperatorSelection>,
    pub total_score: f64,
    pub correct_count: usize,
    pub puzzle_count: usize,
    pub correct_percentage: u32,
    pub timestamp: DateTime<Local>,
}

impl QuizResult {
    pub fn from_session(session: &QuizSession, scores: &QuizScores) -> Self {
        let quiz = session.quiz();
        Self {
            title: quiz.title(),
            difficulty: quiz.difficulty,
            operator: quiz.selected_operator,
            total_score: scores.total_score,
            correct_count: scores.correct_answer_count,
            puzzle_count: session.puzzles().len(),
            correct_percentage: scores.correct_answer_percentage,
            timestamp: Local::now(),
        }
    }
}

/// Quiz history backed by SQLite
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Open the history database at its default location
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("regneflyt_history.db"));
        Self::open(db_path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS quiz_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                difficulty INTEGER NOT NULL,
                operator INTEGER,
                total_score REAL NOT NULL,
                correct_count INTEGER NOT NULL,
                puzzle_count INTEGER NOT NULL,
                correct_percentage INTEGER NOT NULL,
                timestamp TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_quiz_results_timestamp ON quiz_results(timestamp)",
            [],
        )?;

        Ok(HistoryDb { conn })
    }

    pub fn record_result(&self, result: &QuizResult) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO quiz_results
            (title, difficulty, operator, total_score, correct_count, puzzle_count, correct_percentage, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                result.title,
                result.difficulty.code(),
                result.operator.map(OperatorSelection::code),
                result.total_score,
                result.correct_count as i64,
                result.puzzle_count as i64,
                result.correct_percentage,
                result.timestamp.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Best total score ever recorded
    pub fn highscore(&self) -> Result<Option<f64>> {
        self.conn
            .query_row("SELECT MAX(total_score) FROM quiz_results", [], |row| row.get(0))
    }

    /// Latest results first
    pub fn recent_results(&self, limit: usize) -> Result<Vec<QuizResult>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT title, difficulty, operator, total_score, correct_count, puzzle_count, correct_percentage, timestamp
            FROM quiz_results
            ORDER BY timestamp DESC, id DESC
            LIMIT ?1
            "#,
        )?;

        let result_iter = stmt.query_map([limit as i64], |row| {
            let timestamp_str: String = row.get(7)?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(7, "timestamp".to_string(), rusqlite::types::Type::Text)
                })?
                .with_timezone(&Local);
            let operator: Option<i64> = row.get(2)?;

            Ok(QuizResult {
                title: row.get(0)?,
                difficulty: DifficultyMode::from_code(row.get(1)?),
                operator: operator.and_then(|code| OperatorSelection::from_code(code).ok()),
                total_score: row.get(3)?,
                correct_count: row.get::<_, i64>(4)? as usize,
                puzzle_count: row.get::<_, i64>(5)? as usize,
                correct_percentage: row.get(6)?,
                timestamp,
            })
        })?;

        result_iter.collect()
    }

    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM quiz_results", [])?;
        Ok(())
    }
}
