//! Async facade over the store and the statistics engine
//!
//! Every command takes the shared [`AppState`], works on a consistent snapshot
//! and returns plain serializable data or a display string on failure.

pub mod progression;
pub mod stats;

use crate::db::AppState;
use crate::models::{NewTraining, Training};
use crate::store::{ImportSummary, StoreError, TrainingSnapshot};
use chrono::Utc;
use std::path::Path;

/// Current revision of the training list
pub(crate) async fn current_snapshot(state: &AppState) -> TrainingSnapshot {
  state.store.lock().await.snapshot()
}

pub async fn get_trainings(state: &AppState) -> Result<Vec<Training>, String> {
  Ok(current_snapshot(state).await.to_vec())
}

pub async fn get_training(state: &AppState, id: String) -> Result<Training, String> {
  let store = state.store.lock().await;
  store
    .get(&id)
    .cloned()
    .ok_or_else(|| StoreError::NotFound(id.clone()).to_string())
}

pub async fn get_recent_trainings(state: &AppState, limit: Option<usize>) -> Result<Vec<Training>, String> {
  let limit = limit.unwrap_or(state.config.recent_limit);
  let store = state.store.lock().await;
  Ok(store.recent(limit).to_vec())
}

pub async fn get_trainings_by_category(state: &AppState, category_id: String) -> Result<Vec<Training>, String> {
  Ok(state.store.lock().await.by_category(&category_id))
}

pub async fn add_training(state: &AppState, training: NewTraining) -> Result<Training, String> {
  let now = state.clock.now().with_timezone(&Utc);
  state
    .store
    .lock()
    .await
    .add(training, now)
    .await
    .map_err(|e| format!("Failed to add training: {}", e))
}

pub async fn delete_training(state: &AppState, id: String) -> Result<bool, String> {
  state
    .store
    .lock()
    .await
    .delete(&id)
    .await
    .map_err(|e| format!("Failed to delete training: {}", e))
}

pub async fn clear_trainings(state: &AppState) -> Result<(), String> {
  state
    .store
    .lock()
    .await
    .clear()
    .await
    .map_err(|e| format!("Failed to clear trainings: {}", e))
}

/// Merge a legacy JSON export from disk
pub async fn import_legacy_file(state: &AppState, path: &Path) -> Result<ImportSummary, String> {
  let json = tokio::fs::read_to_string(path)
    .await
    .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

  state
    .store
    .lock()
    .await
    .import_legacy_json(&json)
    .await
    .map_err(|e| format!("Failed to import {}: {}", path.display(), e))
}
