use clap::Parser;
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::SeedableRng;
use regneflyt::history::{HistoryDb, QuizResult};
use regneflyt::store::{FileProfileStore, ProfileData, ProfileStore};
use regneflyt::{OperatorSelection, Quiz, QuizSession};
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// adaptive arithmetic practice in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Arithmetic practice that adapts number ranges, tables and puzzle types \
                  to how well each operator is going."
)]
pub struct Cli {
    /// quiz settings as a query string, e.g. "operator=2&difficulty=0&mulValues=3,7"
    #[clap(short = 'q', long, default_value = "")]
    query: String,

    /// stop after this many puzzles instead of when the quiz duration runs out
    #[clap(short = 'n', long)]
    puzzles: Option<usize>,

    /// seed for reproducible puzzles
    #[clap(long)]
    seed: Option<u64>,

    /// profile file holding skills and highscore
    #[clap(long)]
    profile: Option<PathBuf>,

    /// quiz history database
    #[clap(long)]
    db: Option<PathBuf>,

    /// print the normalized query string and exit
    #[clap(long)]
    print_query: bool,

    /// show recent quiz results and exit
    #[clap(long)]
    history: bool,

    /// with --history, print one JSON object per result
    #[clap(long, requires = "history")]
    json: bool,

    /// forget all skills, the highscore and the quiz history
    #[clap(long)]
    reset: bool,
}

impl Cli {
    fn profile_store(&self) -> FileProfileStore {
        match &self.profile {
            Some(path) => FileProfileStore::with_path(path),
            None => FileProfileStore::new(),
        }
    }

    fn history_db(&self) -> rusqlite::Result<HistoryDb> {
        match &self.db {
            Some(path) => HistoryDb::open(path),
            None => HistoryDb::new(),
        }
    }

    fn quiz(&self) -> Quiz {
        let mut quiz = Quiz::from_query(&self.query);
        if quiz.selected_operator.is_none() {
            quiz.selected_operator = Some(OperatorSelection::All);
        }
        quiz
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("regneflyt=warn")))
        .init();

    let cli = Cli::parse();
    let quiz = cli.quiz();

    if cli.print_query {
        println!("{}", quiz.to_query_string());
        return Ok(());
    }

    if cli.reset {
        cli.profile_store().save(&Default::default())?;
        cli.history_db()?.clear_all()?;
        println!("Skills, highscore and history cleared");
        return Ok(());
    }

    if cli.history {
        print_history(&cli.history_db()?, cli.json)?;
        return Ok(());
    }

    run_quiz(&cli, quiz)
}

fn save_profile(store: &FileProfileStore, data: &ProfileData) {
    if let Err(e) = store.save(data) {
        warn!("could not save profile to {}: {e}", store.path().display());
    }
}

fn run_quiz(cli: &Cli, mut quiz: Quiz) -> Result<(), Box<dyn Error>> {
    let store = cli.profile_store();
    let mut data = store.load();
    quiz.previous_score = cli
        .history_db()
        .and_then(|db| db.recent_results(1))
        .map(|recent| recent.first().map(|r| r.total_score))
        .unwrap_or_else(|e| {
            warn!("could not read quiz history: {e}");
            None
        });
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let difficulty = quiz.difficulty;
    let time_budget = Duration::from_secs_f64(quiz.duration_minutes * 60.0);
    let mut session = QuizSession::new(quiz, *data.profiles.for_mode(difficulty));

    println!("{}", session.quiz().title());
    let started = Instant::now();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        if cli.puzzles.is_some_and(|limit| session.puzzles().len() >= limit) {
            break;
        }
        if cli.puzzles.is_none() && started.elapsed() >= time_budget {
            break;
        }

        let puzzle = session.next_puzzle(&mut rng)?;
        print!("{puzzle}  ");
        io::stdout().flush()?;

        let asked = Instant::now();
        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let line = line.trim();
        if line == "q" {
            break;
        }

        let outcome = session.answer(line.parse().ok(), asked.elapsed().as_secs_f64(), false)?;
        *data.profiles.for_mode_mut(difficulty) = *session.skills();
        save_profile(&store, &data);

        if outcome.timed_out {
            println!("Too slow, the answer was {}", outcome.expected);
        } else if outcome.correct {
            println!("Correct");
        } else {
            println!("Wrong, the answer was {}", outcome.expected);
        }
    }

    let scores = session.scores()?;
    println!(
        "{}/{} correct ({}%), score {}",
        scores.correct_answer_count,
        session.puzzles().len(),
        scores.correct_answer_percentage,
        scores.total_score
    );
    if let Some(previous) = session.quiz().previous_score {
        println!("Previous score {previous}");
    }

    if data.offer_highscore(scores.total_score) {
        println!("New highscore!");
        save_profile(&store, &data);
    }

    if !session.puzzles().is_empty() {
        let result = QuizResult::from_session(&session, &scores);
        if let Err(e) = cli.history_db().and_then(|db| db.record_result(&result)) {
            warn!("could not record quiz result: {e}");
        }
    }

    Ok(())
}

fn print_history(db: &HistoryDb, json: bool) -> Result<(), Box<dyn Error>> {
    let results = db.recent_results(20)?;
    if json {
        for result in &results {
            println!("{}", serde_json::to_string(result)?);
        }
        return Ok(());
    }

    if results.is_empty() {
        println!("No quizzes yet");
        return Ok(());
    }

    for result in &results {
        println!(
            "{}  {:<32} {:>8}  {}/{} ({}%)",
            result.timestamp.format("%Y-%m-%d %H:%M"),
            result.title,
            result.total_score,
            result.correct_count,
            result.puzzle_count,
            result.correct_percentage
        );
    }

    if let Some(best) = db.highscore()? {
        let scores = results.iter().map(|r| r.total_score.to_string()).join(", ");
        println!("Best: {best}  Recent: {scores}");
    }

    Ok(())
}
