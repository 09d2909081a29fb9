//! Runtime configuration for embedding callers.
//!
//! # Responsibility
//! - Resolve where the item database and rolling logs live.
//! - Read overrides from environment variables.
//!
//! # Invariants
//! - `data_dir` is always set; the database file lives directly inside it.
//! - `log_level` is one of `trace|debug|info|warn|error`.

use crate::db::DB_FILE_NAME;
use crate::logging::default_log_level;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DATA_DIR_ENV: &str = "SHOPLIST_DATA_DIR";
pub const LOG_DIR_ENV: &str = "SHOPLIST_LOG_DIR";
pub const LOG_LEVEL_ENV: &str = "SHOPLIST_LOG_LEVEL";

const LOG_SUBDIR: &str = "logs";
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingEnv(String),
    InvalidValue(String, String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEnv(name) => write!(f, "missing required environment variable: {name}"),
            Self::InvalidValue(name, reason) => write!(f, "invalid value for {name}: {reason}"),
        }
    }
}

impl Error for ConfigError {}

/// Locations and log verbosity for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
}

impl CoreConfig {
    /// Builds a config rooted at `data_dir` with default log settings.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            log_dir: data_dir.join(LOG_SUBDIR),
            data_dir,
            log_level: default_log_level().to_string(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let data_dir = env_map
            .get(DATA_DIR_ENV)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigError::MissingEnv(DATA_DIR_ENV.to_string()))?;
        let mut config = Self::new(data_dir);

        if let Some(log_dir) = env_map.get(LOG_DIR_ENV) {
            let log_dir = log_dir.trim();
            if log_dir.is_empty() {
                return Err(ConfigError::InvalidValue(
                    LOG_DIR_ENV.to_string(),
                    "must not be empty".to_string(),
                ));
            }
            config.log_dir = PathBuf::from(log_dir);
        }

        if let Some(level) = env_map.get(LOG_LEVEL_ENV) {
            let level = level.trim().to_ascii_lowercase();
            if !LOG_LEVELS.contains(&level.as_str()) {
                return Err(ConfigError::InvalidValue(
                    LOG_LEVEL_ENV.to_string(),
                    format!("must be trace, debug, info, warn, or error, got {level}"),
                ));
            }
            config.log_level = level;
        }

        Ok(config)
    }

    /// Full path of the item database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, DATA_DIR_ENV, LOG_DIR_ENV, LOG_LEVEL_ENV};
    use crate::logging::default_log_level;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn data_dir_is_required() {
        let err = CoreConfig::from_env_map(HashMap::new()).unwrap_err();
        assert_eq!(err, ConfigError::MissingEnv(DATA_DIR_ENV.to_string()));
    }

    #[test]
    fn defaults_derive_from_data_dir() {
        let config = CoreConfig::from_env_map(env(&[(DATA_DIR_ENV, "/var/lib/shoplist")])).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/shoplist"));
        assert_eq!(config.log_dir, PathBuf::from("/var/lib/shoplist/logs"));
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(
            config.db_path(),
            PathBuf::from("/var/lib/shoplist/item_database")
        );
    }

    #[test]
    fn overrides_are_applied_and_level_is_normalized() {
        let config = CoreConfig::from_env_map(env(&[
            (DATA_DIR_ENV, "/data"),
            (LOG_DIR_ENV, "/logs"),
            (LOG_LEVEL_ENV, " WARN "),
        ]))
        .unwrap();
        assert_eq!(config.log_dir, PathBuf::from("/logs"));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let err = CoreConfig::from_env_map(env(&[(DATA_DIR_ENV, "/data"), (LOG_LEVEL_ENV, "loud")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(name, _) if name == LOG_LEVEL_ENV));
    }
}
