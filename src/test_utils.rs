//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Mock data factories
//! - Fixed reference instants
//! - Helper assertions

use crate::clock::FixedClock;
use crate::config::AppConfig;
use crate::db::{AppState, SqlitePersistence};
use crate::models::{Exercise, NewTraining, Set, Training};
use crate::store::{TrainingPersistence, TrainingStore};
use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  // Run migrations
  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Application state over an empty in-memory database, clock fixed at [`reference_now`]
pub async fn setup_test_state() -> AppState {
  let pool = setup_test_db().await;
  let store = TrainingStore::open(SqlitePersistence::new(pool))
    .await
    .expect("Failed to open training store");

  AppState::new(
    store,
    Arc::new(FixedClock::new(reference_now())),
    AppConfig::default(),
  )
}

/// Seed the database with `count` trainings, one per day going back from
/// [`reference_now`]. Returns them in stored order (most recent first).
pub async fn seed_test_trainings(pool: &SqlitePool, count: usize) -> Vec<Training> {
  let now = reference_now();
  let trainings: Vec<Training> = (0..count)
    .map(|i| {
      let name = if i % 2 == 0 { "Upper" } else { "Lower" };
      let weight = 40.0 + 10.0 * i as f64;
      mock_training(
        name,
        days_before(now, i as i64),
        vec![mock_exercise("bench", &[(weight, 10), (weight, 8)])],
      )
    })
    .collect();

  SqlitePersistence::new(pool.clone())
    .save(&trainings)
    .await
    .expect("Failed to seed test trainings");

  trainings
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// Sets numbered from 1, all completed
pub fn mock_sets(sets: &[(f64, u32)]) -> Vec<Set> {
  sets
    .iter()
    .enumerate()
    .map(|(idx, &(weight, reps))| Set::new(idx as u32 + 1, weight, reps))
    .collect()
}

/// Exercise whose id and name are both `id`
pub fn mock_exercise(id: &str, sets: &[(f64, u32)]) -> Exercise {
  Exercise {
    id: id.to_string(),
    name: id.to_string(),
    category: None,
    sets: mock_sets(sets),
  }
}

/// Stored training with a random id, no category and computed totals
pub fn mock_training(name: &str, date: DateTime<Utc>, exercises: Vec<Exercise>) -> Training {
  Training::from_new(
    uuid::Uuid::new_v4().to_string(),
    NewTraining {
      name: name.to_string(),
      date: Some(date),
      duration_minutes: 0,
      category: None,
      exercises,
    },
    date,
  )
}

/// Form input with one bench exercise: 50kg x 10, 50kg x 8 (volume 900)
pub fn mock_new_training(name: &str) -> NewTraining {
  NewTraining {
    name: name.to_string(),
    date: None,
    duration_minutes: 60,
    category: None,
    exercises: vec![mock_exercise("bench", &[(50.0, 10), (50.0, 8)])],
  }
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// Wednesday 2024-05-15 12:00 UTC
pub fn reference_now() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap()
}

/// Same wall-clock time `days` earlier
pub fn days_before(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
  now - Duration::days(days)
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Datelike, Weekday};

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> =
      sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = 'trainings'")
        .fetch_all(&pool)
        .await
        .expect("Failed to query tables");

    assert_eq!(tables.len(), 1);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_trainings_returns_correct_count() {
    let pool = setup_test_db().await;

    let seeded = seed_test_trainings(&pool, 5).await;
    assert_eq!(seeded.len(), 5);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trainings")
      .fetch_one(&pool)
      .await
      .expect("Failed to count trainings");

    assert_eq!(count, 5);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_mock_factories_create_valid_data() {
    let training = mock_training("Test", reference_now(), vec![mock_exercise("row", &[(40.0, 10)])]);
    assert_eq!(training.totals.total_volume, 400.0);
    assert_eq!(training.exercises[0].sets[0].number, 1);

    let new = mock_new_training("Form");
    assert_eq!(new.exercises[0].volume(), 900.0);
  }

  #[test]
  fn test_reference_now_is_a_wednesday() {
    assert_eq!(reference_now().weekday(), Weekday::Wed);
    assert_eq!(days_before(reference_now(), 2).weekday(), Weekday::Mon);
  }
}
