use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::progress::MasteryScale;
use crate::reducer::{PathReducer, DEFAULT_DEVIATION_THRESHOLD};

pub const ENV_DEVIATION_THRESHOLD: &str = "GLYPHWISE_DEVIATION_THRESHOLD";
pub const ENV_MASTERY_SCALE: &str = "GLYPHWISE_MASTERY_SCALE";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub deviation_threshold: f64,
    pub mastery_scale: f64,
    /// SQLite file; the volatile in-memory store is used when unset
    pub database: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deviation_threshold: DEFAULT_DEVIATION_THRESHOLD,
            mastery_scale: MasteryScale::default().0,
            database: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    pub fn reducer(&self) -> PathReducer {
        PathReducer::with_threshold(self.deviation_threshold)
    }

    pub fn scale(&self) -> MasteryScale {
        MasteryScale(self.mastery_scale)
    }

    /// Override numeric settings from the process environment
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Unparseable or non-finite values are
    /// ignored and the current setting is kept.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_override(&lookup, ENV_DEVIATION_THRESHOLD) {
            self.deviation_threshold = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_MASTERY_SCALE) {
            self.mastery_scale = v;
        }
        self
    }
}

fn parse_override<F>(lookup: &F, key: &str) -> Option<f64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            warn!(key, value = %raw, "ignoring invalid override");
            None
        }
    }
}

/// SQLite location used when persistence is requested without a path
pub fn default_database_path() -> PathBuf {
    ProjectDirs::from("", "", "glyphwise")
        .map(|pd| pd.data_local_dir().join("strokes.db"))
        .unwrap_or_else(|| PathBuf::from("glyphwise_strokes.db"))
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = ProjectDirs::from("", "", "glyphwise")
            .map(|pd| pd.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("glyphwise_config.json"));
        Self { path }
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

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Config::default(),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "cannot read config, using defaults"
                );
                return Config::default();
            }
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "unreadable config, using defaults"
                );
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
