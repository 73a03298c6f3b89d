//! Owner of the training list
//!
//! Readers get an immutable [`TrainingSnapshot`]; writers go through
//! [`TrainingStore`], which persists first and only then publishes a new
//! snapshot with a bumped revision. A failed save leaves the previous
//! snapshot in place.

use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::legacy::LegacyTraining;
use crate::models::{NewTraining, Training, DEFAULT_CATEGORY_ID};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration error: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Invalid training: {0}")]
  Validation(String),

  #[error("Training not found: {0}")]
  NotFound(String),
}

impl Serialize for StoreError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

/// Durable backing for the training list
#[async_trait]
pub trait TrainingPersistence: Send + Sync + 'static {
  /// Records in stored order, most recent first
  async fn load(&self) -> Result<Vec<Training>, StoreError>;

  /// Replace the stored list with `trainings`
  async fn save(&self, trainings: &[Training]) -> Result<(), StoreError>;
}

/// Immutable view of the list at one revision
#[derive(Debug, Clone)]
pub struct TrainingSnapshot {
  revision: u64,
  trainings: Arc<[Training]>,
}

impl TrainingSnapshot {
  fn new(revision: u64, trainings: Vec<Training>) -> Self {
    Self {
      revision,
      trainings: trainings.into(),
    }
  }

  pub fn revision(&self) -> u64 {
    self.revision
  }
}

impl Deref for TrainingSnapshot {
  type Target = [Training];

  fn deref(&self) -> &[Training] {
    &self.trainings
  }
}

/// Result of merging a legacy export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
  pub imported: usize,
  /// Records whose id was already present
  pub skipped: usize,
}

pub struct TrainingStore<P: TrainingPersistence> {
  persistence: P,
  snapshot: TrainingSnapshot,
}

impl<P: TrainingPersistence> TrainingStore<P> {
  /// Load the stored list, repairing stale cached totals
  pub async fn open(persistence: P) -> Result<Self, StoreError> {
    let mut trainings = persistence.load().await?;

    let mut repaired = 0;
    for t in &mut trainings {
      if t.refresh_totals() {
        tracing::warn!(id = %t.id, "cached training totals were stale, recomputed");
        repaired += 1;
      }
    }
    if repaired > 0 {
      persistence.save(&trainings).await?;
      tracing::info!(repaired, "saved repaired training totals");
    }

    tracing::info!(count = trainings.len(), "training store opened");

    Ok(Self {
      persistence,
      snapshot: TrainingSnapshot::new(0, trainings),
    })
  }

  pub fn snapshot(&self) -> TrainingSnapshot {
    self.snapshot.clone()
  }

  pub fn list(&self) -> &[Training] {
    &self.snapshot
  }

  pub fn get(&self, id: &str) -> Option<&Training> {
    self.snapshot.iter().find(|t| t.id == id)
  }

  /// The `n` most recently added trainings
  pub fn recent(&self, n: usize) -> &[Training] {
    &self.snapshot[..n.min(self.snapshot.len())]
  }

  /// Trainings of one workout type; `"other"` selects uncategorized ones
  pub fn by_category(&self, category_id: &str) -> Vec<Training> {
    self
      .snapshot
      .iter()
      .filter(|t| t.category_id() == category_id)
      .cloned()
      .collect()
  }

  /// Validate, stamp and prepend a new training
  pub async fn add(&mut self, new: NewTraining, now: DateTime<Utc>) -> Result<Training, StoreError> {
    let new = validate(new)?;
    let training = Training::from_new(Uuid::new_v4().to_string(), new, now);

    let mut next = Vec::with_capacity(self.snapshot.len() + 1);
    next.push(training.clone());
    next.extend(self.snapshot.iter().cloned());
    self.commit(next).await?;

    tracing::info!(
      id = %training.id,
      name = %training.name,
      volume = training.totals.total_volume,
      "training added"
    );
    Ok(training)
  }

  /// Returns false when no training had that id
  pub async fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
    if self.get(id).is_none() {
      return Ok(false);
    }

    let next: Vec<Training> = self.snapshot.iter().filter(|t| t.id != id).cloned().collect();
    self.commit(next).await?;

    tracing::info!(id, "training deleted");
    Ok(true)
  }

  pub async fn clear(&mut self) -> Result<(), StoreError> {
    self.commit(Vec::new()).await?;
    tracing::info!("all trainings cleared");
    Ok(())
  }

  /// Merge a legacy JSON export (array of historical records)
  ///
  /// Records whose id already exists are skipped. The merged list is ordered
  /// most recent first; records with equal dates keep their relative order.
  pub async fn import_legacy_json(&mut self, json: &str) -> Result<ImportSummary, StoreError> {
    let legacy: Vec<LegacyTraining> = serde_json::from_str(json)?;

    let mut next: Vec<Training> = self.snapshot.to_vec();
    let mut skipped = 0;
    let mut imported = 0;
    for record in legacy {
      let training = record.into_training(|| Uuid::new_v4().to_string());
      if next.iter().any(|t| t.id == training.id) {
        skipped += 1;
        continue;
      }
      next.push(training);
      imported += 1;
    }

    if imported == 0 {
      tracing::info!(skipped, "legacy import added nothing");
      return Ok(ImportSummary { imported, skipped });
    }

    next.sort_by(|a, b| b.date.cmp(&a.date));
    self.commit(next).await?;

    tracing::info!(imported, skipped, "legacy trainings imported");
    Ok(ImportSummary { imported, skipped })
  }

  async fn commit(&mut self, next: Vec<Training>) -> Result<(), StoreError> {
    self.persistence.save(&next).await?;
    self.snapshot = TrainingSnapshot::new(self.snapshot.revision + 1, next);
    Ok(())
  }
}

/// Keep exercises that have a name and at least one set; require a session name
fn validate(mut new: NewTraining) -> Result<NewTraining, StoreError> {
  if new.name.trim().is_empty() {
    return Err(StoreError::Validation("training name is empty".to_string()));
  }

  new
    .exercises
    .retain(|ex| !ex.name.trim().is_empty() && !ex.sets.is_empty());
  if new.exercises.is_empty() {
    return Err(StoreError::Validation(
      "at least one exercise with a name and a set is required".to_string(),
    ));
  }

  if let Some(category) = &new.category {
    if category.id.trim().is_empty() || category.id == DEFAULT_CATEGORY_ID {
      new.category = None;
    }
  }

  Ok(new)
}
