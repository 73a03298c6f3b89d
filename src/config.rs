//! Runtime configuration read from the environment

use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "training-log.db";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_WEEKLY_GOAL: u32 = 5;
pub const DEFAULT_RECENT_LIMIT: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Invalid value for {key}: {value:?} (expected a positive integer)")]
  Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
  pub db_path: PathBuf,
  pub log_level: String,
  /// Trainings per trailing 7 days
  pub weekly_goal: u32,
  /// Size of the dashboard's recent list
  pub recent_limit: usize,
  /// Legacy JSON export to merge on startup
  pub import_path: Option<PathBuf>,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      db_path: PathBuf::from(DEFAULT_DB_PATH),
      log_level: DEFAULT_LOG_LEVEL.to_string(),
      weekly_goal: DEFAULT_WEEKLY_GOAL,
      recent_limit: DEFAULT_RECENT_LIMIT,
      import_path: None,
    }
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_env_with(|k| std::env::var(k).ok())
  }

  /// Build from an arbitrary key lookup so tests don't need the process environment
  pub fn from_env_with<F>(mut get: F) -> Result<Self, ConfigError>
  where
    F: FnMut(&str) -> Option<String>,
  {
    let mut lookup = |key: &str| get(key).filter(|v| !v.trim().is_empty());

    let db_path = lookup("TRAINING_LOG_DB_PATH")
      .map(PathBuf::from)
      .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
    let log_level = lookup("TRAINING_LOG_LOG_LEVEL")
      .or_else(|| lookup("RUST_LOG"))
      .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
    let weekly_goal = match lookup("TRAINING_LOG_WEEKLY_GOAL") {
      Some(raw) => parse_positive("TRAINING_LOG_WEEKLY_GOAL", &raw)?,
      None => DEFAULT_WEEKLY_GOAL,
    };
    let recent_limit = match lookup("TRAINING_LOG_RECENT_LIMIT") {
      Some(raw) => parse_positive("TRAINING_LOG_RECENT_LIMIT", &raw)? as usize,
      None => DEFAULT_RECENT_LIMIT,
    };
    let import_path = lookup("TRAINING_LOG_IMPORT_PATH").map(PathBuf::from);

    Ok(Self {
      db_path,
      log_level,
      weekly_goal,
      recent_limit,
      import_path,
    })
  }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u32, ConfigError> {
  match raw.trim().parse::<u32>() {
    Ok(n) if n > 0 => Ok(n),
    _ => Err(ConfigError::Invalid {
      key,
      value: raw.to_string(),
    }),
  }
}
