use crate::app_dirs::AppDirs;
use crate::skill::AdaptiveProfiles;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Everything that survives between quizzes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ProfileData {
    #[serde(flatten)]
    pub profiles: AdaptiveProfiles,
    pub highscore: f64,
}

impl ProfileData {
    /// Rebuild from loosely typed JSON, repairing whatever does not fit
    pub fn from_json(value: &serde_json::Value) -> Self {
        let highscore = value["highscore"].as_f64().filter(|h| h.is_finite()).unwrap_or(0.0);
        Self {
            profiles: AdaptiveProfiles::from_json(value),
            highscore,
        }
    }

    /// Keep the better of the stored highscore and `score`; true if it improved
    pub fn offer_highscore(&mut self, score: f64) -> bool {
        if score > self.highscore {
            self.highscore = score;
            true
        } else {
            false
        }
    }
}

pub trait ProfileStore {
    fn load(&self) -> ProfileData;
    fn save(&self, data: &ProfileData) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileProfileStore {
    path: PathBuf,
}

impl FileProfileStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::profile_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileStore for FileProfileStore {
    fn load(&self) -> ProfileData {
        let Ok(bytes) = fs::read(&self.path) else {
            return ProfileData::default();
        };

        match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(value) => ProfileData::from_json(&value),
            Err(e) => {
                warn!("ignoring unreadable profile file {}: {e}", self.path.display());
                ProfileData::default()
            }
        }
    }

    fn save(&self, data: &ProfileData) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(data)?;
        fs::write(&self.path, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::SkillMap;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let store = FileProfileStore::with_path(dir.path().join("nope.json"));
        assert_eq!(store.load(), ProfileData::default());
    }

    #[test]
    fn save_and_load_profiles() {
        let dir = tempdir().unwrap();
        let store = FileProfileStore::with_path(dir.path().join("nested").join("profiles.json"));
        let data = ProfileData {
            profiles: AdaptiveProfiles {
                adaptive: SkillMap::new([12, 34, 56, 78]),
                custom: SkillMap::new([1, 2, 3, 4]),
            },
            highscore: 152.0,
        };
        store.save(&data).unwrap();
        assert_eq!(store.load(), data);

        let raw: serde_json::Value = serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["adaptive"], serde_json::json!([12, 34, 56, 78]));
        assert_eq!(raw["highscore"], serde_json::json!(152.0));
    }

    #[test]
    fn malformed_data_is_repaired() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profiles.json");

        fs::write(&path, br#"{"adaptive":[150,-3,"x",42.6],"custom":[1,2],"highscore":"lots"}"#).unwrap();
        let data = FileProfileStore::with_path(&path).load();
        assert_eq!(data.profiles.adaptive.values(), [100, 0, 0, 43]);
        assert_eq!(data.profiles.custom, SkillMap::default());
        assert_eq!(data.highscore, 0.0);

        fs::write(&path, b"{not json").unwrap();
        assert_eq!(FileProfileStore::with_path(&path).load(), ProfileData::default());
    }

    #[test]
    fn default_store_uses_app_profile_path() {
        assert_eq!(FileProfileStore::default().path(), AppDirs::profile_path());
    }

    #[test]
    fn highscore_only_improves() {
        let mut data = ProfileData::default();
        assert!(data.offer_highscore(40.0));
        assert!(!data.offer_highscore(-10.0));
        assert!(!data.offer_highscore(40.0));
        assert_eq!(data.highscore, 40.0);
    }
}
