use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "regneflyt";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// SQLite file holding finished quiz results
    pub fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home).join(".local").join("state").join(APP_NAME);
            Some(state_dir.join("history.db"))
        } else {
            ProjectDirs::from("", "", APP_NAME).map(|proj_dirs| proj_dirs.data_local_dir().join("history.db"))
        }
    }

    /// JSON file holding skill profiles and the highscore
    pub fn profile_path() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|proj_dirs| proj_dirs.config_dir().join("profiles.json"))
            .unwrap_or_else(|| PathBuf::from("regneflyt_profiles.json"))
    }
}
