use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SqlmError};

/// File name of the worklist database inside the sqlm root.
pub const DEFAULT_DB_FILE: &str = "sqlm.db";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub robot: RobotConfig,
}

impl Config {
    /// Layer defaults, then either an explicit file or global + project
    /// files, then `SQLM_*` environment overrides.
    pub fn load(explicit_path: Option<&Path>, sqlm_root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("SQLM_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            if let Some(patch) = Self::load_patch(&path)? {
                config.merge_patch(patch);
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_project(sqlm_root)? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let path = dirs::config_dir()
            .ok_or_else(|| SqlmError::MissingConfig("config directory not found".to_string()))?
            .join("sqlm/config.toml");
        Self::load_patch(&path)
    }

    fn load_project(sqlm_root: &Path) -> Result<Option<ConfigPatch>> {
        let path = sqlm_root.join("config.toml");
        Self::load_patch(&path)
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| SqlmError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| SqlmError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.database {
            self.database.merge(patch);
        }
        if let Some(patch) = patch.query {
            self.query.merge(patch);
        }
        if let Some(patch) = patch.merge {
            self.merge.merge(patch);
        }
        if let Some(patch) = patch.robot {
            self.robot.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_string("SQLM_DB_PATH") {
            self.database.path = Some(PathBuf::from(value));
        }
        if let Some(value) = env_u64("SQLM_BUSY_TIMEOUT_MS")? {
            self.database.busy_timeout_ms = value;
        }

        if let Some(value) = env_u32("SQLM_DEFAULT_PAGE_SIZE")? {
            self.query.default_page_size = value;
        }
        if let Some(value) = env_u32("SQLM_MAX_PAGE_SIZE")? {
            self.query.max_page_size = value;
        }

        if let Some(value) = env_u64("SQLM_MAX_BATCH_SIZE")? {
            self.merge.max_batch_size = value as usize;
        }

        if let Some(value) = env_string("SQLM_ROBOT_FORMAT") {
            self.robot.format = value;
        }

        Ok(())
    }

    /// Reject values no command could run with.
    pub fn validate(&self) -> Result<()> {
        if self.query.default_page_size == 0 || self.query.max_page_size == 0 {
            return Err(SqlmError::Config(
                "query page sizes must be positive".to_string(),
            ));
        }
        if self.query.default_page_size > self.query.max_page_size {
            return Err(SqlmError::Config(format!(
                "query.default_page_size {} exceeds query.max_page_size {}",
                self.query.default_page_size, self.query.max_page_size
            )));
        }
        if self.merge.max_batch_size == 0 {
            return Err(SqlmError::Config(
                "merge.max_batch_size must be positive".to_string(),
            ));
        }
        if !matches!(self.robot.format.as_str(), "json" | "jsonl") {
            return Err(SqlmError::Config(format!(
                "robot.format must be json or jsonl, got {}",
                self.robot.format
            )));
        }
        Ok(())
    }

    /// Database file, defaulting to `<root>/sqlm.db`.
    pub fn database_path(&self, sqlm_root: &Path) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| sqlm_root.join(DEFAULT_DB_FILE))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5_000,
        }
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    fn merge(&mut self, patch: DatabasePatch) {
        if let Some(value) = patch.path {
            self.path = Some(value);
        }
        if let Some(value) = patch.busy_timeout_ms {
            self.busy_timeout_ms = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default)]
    pub default_page_size: u32,
    #[serde(default)]
    pub max_page_size: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 1_000,
        }
    }
}

impl QueryConfig {
    fn merge(&mut self, patch: QueryPatch) {
        if let Some(value) = patch.default_page_size {
            self.default_page_size = value;
        }
        if let Some(value) = patch.max_page_size {
            self.max_page_size = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default)]
    pub max_batch_size: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 500,
        }
    }
}

impl MergeConfig {
    fn merge(&mut self, patch: MergePatch) {
        if let Some(value) = patch.max_batch_size {
            self.max_batch_size = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotConfig {
    #[serde(default)]
    pub format: String,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
        }
    }
}

impl RobotConfig {
    fn merge(&mut self, patch: RobotPatch) {
        if let Some(value) = patch.format {
            self.format = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub database: Option<DatabasePatch>,
    pub query: Option<QueryPatch>,
    pub merge: Option<MergePatch>,
    pub robot: Option<RobotPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DatabasePatch {
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct QueryPatch {
    pub default_page_size: Option<u32>,
    pub max_page_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MergePatch {
    pub max_batch_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RobotPatch {
    pub format: Option<String>,
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_u32(key: &str) -> Result<Option<u32>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<u32>().map(Some).map_err(|err| {
            SqlmError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<u64>().map(Some).map_err(|err| {
            SqlmError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}
