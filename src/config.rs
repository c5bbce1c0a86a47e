use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::collaborator::{jlecmd::DEFAULT_TIMEOUT, CollaboratorLocator};

pub const CACHE_PATH_ENV_VAR: &str = "JUMPLIST_CACHE_PATH";
pub const DEFAULT_CACHE_FILE: &str = ".jumplist_cache.db";

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// SQLite file holding cached snapshots.
    pub cache_path: PathBuf,
    /// Explicit JLECmd location, tried before any other lookup.
    #[serde(default)]
    pub jlecmd_path: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub parser_timeout_secs: u64,
}

impl Config {
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
            jlecmd_path: None,
            parser_timeout_secs: default_timeout_secs(),
        }
    }

    /// Cache file named `.jumplist_cache.db` inside `directory`.
    pub fn in_directory(directory: impl AsRef<Path>) -> Self {
        Self::new(directory.as_ref().join(DEFAULT_CACHE_FILE))
    }

    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Apply `JUMPLIST_CACHE_PATH` and `JLECMD_PATH` when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(path) = env::var_os(CACHE_PATH_ENV_VAR).filter(|v| !v.is_empty()) {
            self.cache_path = PathBuf::from(path);
        }
        if let Some(path) =
            env::var_os(crate::collaborator::locator::JLECMD_ENV_VAR).filter(|v| !v.is_empty())
        {
            self.jlecmd_path = Some(PathBuf::from(path));
        }
        self
    }

    pub fn parser_timeout(&self) -> Duration {
        Duration::from_secs(self.parser_timeout_secs)
    }

    pub fn locator(&self) -> CollaboratorLocator {
        CollaboratorLocator::jlecmd(self.jlecmd_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "cache_path": "/var/cache/jumplist.db" }"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.cache_path, PathBuf::from("/var/cache/jumplist.db"));
        assert_eq!(config.jlecmd_path, None);
        assert_eq!(config.parser_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn cache_file_inside_directory() {
        let config = Config::in_directory("/srv/forensics");
        assert_eq!(
            config.cache_path,
            PathBuf::from("/srv/forensics/.jumplist_cache.db")
        );
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(Config::load(&path).is_err());
        assert!(Config::load(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn explicit_tool_path_leads_locator() {
        let mut config = Config::new("cache.db");
        config.jlecmd_path = Some(PathBuf::from("/tools/JLECmd.exe"));
        assert_eq!(
            config.locator().steps()[0],
            crate::collaborator::LocatorStep::Explicit(PathBuf::from("/tools/JLECmd.exe"))
        );
    }
}
