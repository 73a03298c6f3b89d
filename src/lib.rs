pub mod analysis;
pub mod clock;
pub mod commands;
pub mod config;
pub mod db;
pub mod models;
pub mod progression;
pub mod store;

#[cfg(test)]
pub mod test_utils;

use clock::SystemClock;
use config::AppConfig;
use db::{AppState, SqlitePersistence};
use std::sync::Arc;
use store::TrainingStore;

/// Open the training log and print the dashboard as JSON
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  let config = AppConfig::from_env()?;
  init_tracing(&config.log_level);

  let pool = db::initialize_db(&config.db_path).await?;
  let store = TrainingStore::open(SqlitePersistence::new(pool)).await?;
  let state = AppState::new(store, Arc::new(SystemClock), config);

  if let Some(path) = state.config.import_path.clone() {
    let summary = commands::import_legacy_file(&state, &path).await?;
    tracing::info!(
      path = %path.display(),
      imported = summary.imported,
      skipped = summary.skipped,
      "legacy import finished"
    );
  }

  let dashboard = commands::stats::get_dashboard(&state).await?;
  println!("{}", serde_json::to_string_pretty(&dashboard)?);

  Ok(())
}

/// Compact logs on stderr so stdout stays machine-readable
fn init_tracing(level: &str) {
  let env_filter = tracing_subscriber::EnvFilter::try_new(level)
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config::DEFAULT_LOG_LEVEL));

  let _ = tracing_subscriber::fmt()
    .compact()
    .with_writer(std::io::stderr)
    .with_target(false)
    .with_env_filter(env_filter)
    .try_init();

  tracing::debug!(filter = level, "logging initialized");
}
