use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use crate::analysis::TrainingTotals;
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::models::legacy::decode_exercises;
use crate::models::{CategoryRef, Training};
use crate::store::{StoreError, TrainingPersistence, TrainingStore};

pub type DbPool = SqlitePool;

/// Application state shared by all commands
pub struct AppState {
  pub store: tokio::sync::Mutex<TrainingStore<SqlitePersistence>>,
  pub clock: Arc<dyn Clock>,
  pub config: AppConfig,
}

impl AppState {
  pub fn new(store: TrainingStore<SqlitePersistence>, clock: Arc<dyn Clock>, config: AppConfig) -> Self {
    Self {
      store: tokio::sync::Mutex::new(store),
      clock,
      config,
    }
  }
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(db_path: &Path) -> Result<DbPool, StoreError> {
  // Create directory if it doesn't exist
  if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent)?;
  }

  let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
  tracing::info!(path = %db_path.display(), "initializing database");

  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  tracing::info!("database initialized");
  Ok(pool)
}

/// Trainings stored one row per session in the `trainings` table
///
/// Rows whose `exercises_json` could not be fully decoded keep their original
/// text: saves write it back verbatim instead of the partial exercise list.
/// Sessions are never edited in place, so the raw text stays authoritative.
#[derive(Debug, Clone)]
pub struct SqlitePersistence {
  pool: DbPool,
  /// Training id -> raw `exercises_json` of rows that decoded incompletely
  preserved: Arc<Mutex<HashMap<String, String>>>,
}

impl SqlitePersistence {
  pub fn new(pool: DbPool) -> Self {
    Self {
      pool,
      preserved: Arc::default(),
    }
  }

  fn preserved_exercises(&self) -> HashMap<String, String> {
    self
      .preserved
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }
}

#[async_trait]
impl TrainingPersistence for SqlitePersistence {
  async fn load(&self) -> Result<Vec<Training>, StoreError> {
    let rows = sqlx::query(
      r#"
      SELECT
        id, name, date, duration_minutes, category_id, category_name,
        exercises_json, total_volume, total_sets, total_reps, average_weight
      FROM trainings
      ORDER BY position
      "#,
    )
    .fetch_all(&self.pool)
    .await?;

    let mut trainings = Vec::with_capacity(rows.len());
    let mut preserved = HashMap::new();
    for row in &rows {
      let loaded = training_from_row(row)?;
      if let Some(raw) = loaded.raw_exercises {
        preserved.insert(loaded.training.id.clone(), raw);
      }
      trainings.push(loaded.training);
    }

    if !preserved.is_empty() {
      tracing::warn!(rows = preserved.len(), "some stored exercises could not be read, keeping them as-is");
    }
    *self.preserved.lock().unwrap_or_else(PoisonError::into_inner) = preserved;

    Ok(trainings)
  }

  async fn save(&self, trainings: &[Training]) -> Result<(), StoreError> {
    let preserved = self.preserved_exercises();
    let mut tx = self.pool.begin().await?;

    sqlx::query("DELETE FROM trainings").execute(&mut *tx).await?;

    for (position, t) in trainings.iter().enumerate() {
      let exercises_json = match preserved.get(&t.id) {
        Some(raw) => raw.clone(),
        None => serde_json::to_string(&t.exercises)?,
      };
      let (category_id, category_name) = match &t.category {
        Some(c) => (Some(c.id.as_str()), Some(c.name.as_str())),
        None => (None, None),
      };

      sqlx::query(
        r#"
        INSERT INTO trainings (
          id, position, name, date, duration_minutes, category_id, category_name,
          exercises_json, total_volume, total_sets, total_reps, average_weight
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
      )
      .bind(&t.id)
      .bind(position as i64)
      .bind(&t.name)
      .bind(t.date.to_rfc3339())
      .bind(i64::from(t.duration_minutes))
      .bind(category_id)
      .bind(category_name)
      .bind(&exercises_json)
      .bind(t.totals.total_volume)
      .bind(to_sql_count(t.totals.total_sets))
      .bind(to_sql_count(t.totals.total_reps))
      .bind(t.totals.average_weight)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    tracing::debug!(count = trainings.len(), "trainings saved");
    Ok(())
  }
}

struct LoadedRow {
  training: Training,
  /// Original column text when some exercises could not be decoded
  raw_exercises: Option<String>,
}

fn training_from_row(row: &SqliteRow) -> Result<LoadedRow, StoreError> {
  let id: String = row.get("id");
  let date_str: String = row.get("date");
  let date = DateTime::parse_from_rfc3339(&date_str)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| StoreError::Validation(format!("training {id} has invalid date {date_str:?}: {e}")))?;

  let exercises_json: String = row.get("exercises_json");
  let (exercises, raw_exercises) = match decode_exercises(&exercises_json) {
    Ok(decoded) if decoded.is_complete() => (decoded.exercises, None),
    Ok(decoded) => {
      tracing::warn!(id = %id, rejected = decoded.rejected, "some exercises unreadable");
      (decoded.exercises, Some(exercises_json))
    }
    Err(e) => {
      tracing::warn!(id = %id, error = %e, "unreadable exercises, treating as empty");
      (Vec::new(), Some(exercises_json))
    }
  };

  let category_id: Option<String> = row.get("category_id");
  let category_name: Option<String> = row.get("category_name");
  let category = category_id.filter(|c| !c.is_empty()).map(|id| CategoryRef {
    name: category_name.unwrap_or_else(|| id.clone()),
    id,
  });

  // NULL totals load as zero and get repaired when the store opens
  let totals = TrainingTotals {
    total_volume: optional_column(row, "total_volume").unwrap_or_default(),
    total_sets: optional_column::<i64>(row, "total_sets").map_or(0, from_sql_count),
    total_reps: optional_column::<i64>(row, "total_reps").map_or(0, from_sql_count),
    average_weight: optional_column(row, "average_weight").unwrap_or_default(),
  };

  let training = Training {
    id,
    name: row.get("name"),
    date,
    duration_minutes: clamp_count(row.try_get::<i64, _>("duration_minutes").unwrap_or(0)),
    category,
    exercises,
    totals,
  };

  Ok(LoadedRow {
    training,
    raw_exercises,
  })
}

fn optional_column<T>(row: &SqliteRow, column: &str) -> Option<T>
where
  T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
  row.try_get::<Option<T>, _>(column).ok().flatten()
}

fn clamp_count(value: i64) -> u32 {
  value.clamp(0, i64::from(u32::MAX)) as u32
}

fn from_sql_count(value: i64) -> u64 {
  value.max(0) as u64
}

fn to_sql_count(value: u64) -> i64 {
  i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{
    days_before, mock_exercise, mock_new_training, mock_training, reference_now, seed_test_trainings,
    setup_test_db, teardown_test_db,
  };

  #[tokio::test]
  async fn test_save_then_load_preserves_order_and_fields() {
    let pool = setup_test_db().await;
    let persistence = SqlitePersistence::new(pool.clone());

    let mut first = mock_training(
      "Newest",
      reference_now(),
      vec![mock_exercise("squat", &[(100.0, 5), (105.0, 3)])],
    );
    first.category = Some(CategoryRef {
      id: "split".to_string(),
      name: "Split".to_string(),
    });
    first.duration_minutes = 55;
    let second = mock_training("Older", days_before(reference_now(), 3), vec![]);

    persistence.save(&[first.clone(), second.clone()]).await.unwrap();
    let loaded = persistence.load().await.unwrap();

    assert_eq!(loaded, vec![first, second]);
    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_save_replaces_previous_content() {
    let pool = setup_test_db().await;
    let persistence = SqlitePersistence::new(pool.clone());
    seed_test_trainings(&pool, 4).await;

    let only = mock_training("Only", reference_now(), vec![]);
    persistence.save(std::slice::from_ref(&only)).await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trainings")
      .fetch_one(&pool)
      .await
      .unwrap();
    assert_eq!(count, 1);
    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_load_decodes_flat_exercises_and_null_totals() {
    let pool = setup_test_db().await;
    sqlx::query(
      r#"
      INSERT INTO trainings (id, position, name, date, exercises_json)
      VALUES ('legacy-1', 0, 'Old format', '2024-05-10T09:00:00+00:00',
              '[{"name": "Bench", "sets": 3, "reps": 10, "weight": 50}]')
      "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    let persistence = SqlitePersistence::new(pool.clone());
    let loaded = persistence.load().await.unwrap();
    assert_eq!(loaded[0].exercises[0].sets.len(), 3);
    assert_eq!(loaded[0].totals, TrainingTotals::default());
    assert!(loaded[0].category.is_none());

    // Opening the store fills in the missing cache
    let store = TrainingStore::open(persistence.clone()).await.unwrap();
    assert_eq!(store.list()[0].totals.total_volume, 1500.0);

    let reloaded = persistence.load().await.unwrap();
    assert_eq!(reloaded[0].totals.total_volume, 1500.0);
    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_load_tolerates_malformed_exercises() {
    let pool = setup_test_db().await;
    sqlx::query(
      "INSERT INTO trainings (id, position, name, date, exercises_json) VALUES ('x', 0, 'Broken', '2024-05-10T09:00:00Z', '{oops')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let loaded = SqlitePersistence::new(pool.clone()).load().await.unwrap();
    assert!(loaded[0].exercises.is_empty());
    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_open_never_overwrites_unreadable_exercises() {
    let pool = setup_test_db().await;
    let raw = r#"[{"name":"Bench","sets":[{"weight":"50","reps":10}]},{"name":"Row","sets":2,"reps":10,"weight":40}]"#;
    sqlx::query(
      "INSERT INTO trainings (id, position, name, date, exercises_json, total_volume) VALUES ('kept', 0, 'Push', '2024-05-10T09:00:00Z', ?1, 1300)",
    )
    .bind(raw)
    .execute(&pool)
    .await
    .unwrap();

    let persistence = SqlitePersistence::new(pool.clone());
    let mut store = TrainingStore::open(persistence).await.unwrap();

    // The readable sibling still loads and totals reflect only what was read
    let loaded = store.get("kept").unwrap();
    assert_eq!(loaded.exercises.len(), 1);
    assert_eq!(loaded.exercises[0].name, "Row");
    assert_eq!(loaded.totals.total_volume, 800.0);

    let stored: String = sqlx::query_scalar("SELECT exercises_json FROM trainings WHERE id = 'kept'")
      .fetch_one(&pool)
      .await
      .unwrap();
    assert_eq!(stored, raw);

    // Later writes keep the original text too
    store.add(mock_new_training("Pull"), reference_now()).await.unwrap();
    let stored: String = sqlx::query_scalar("SELECT exercises_json FROM trainings WHERE id = 'kept'")
      .fetch_one(&pool)
      .await
      .unwrap();
    assert_eq!(stored, raw);
    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_large_totals_round_trip() {
    let pool = setup_test_db().await;
    let persistence = SqlitePersistence::new(pool.clone());
    let hold = mock_training(
      "Hold",
      reference_now(),
      vec![mock_exercise("hold", &[(0.0, 3_000_000_000), (0.0, 3_000_000_000)])],
    );

    persistence.save(std::slice::from_ref(&hold)).await.unwrap();
    let loaded = persistence.load().await.unwrap();
    assert_eq!(loaded[0].totals.total_reps, 6_000_000_000);
    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_load_rejects_bad_date() {
    let pool = setup_test_db().await;
    sqlx::query(
      "INSERT INTO trainings (id, position, name, date) VALUES ('x', 0, 'Undated', 'yesterday')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let err = SqlitePersistence::new(pool.clone()).load().await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_initialize_db_creates_parent_directory() {
    let dir = std::env::temp_dir().join(format!("training-log-test-{}", uuid::Uuid::new_v4()));
    let path = dir.join("nested").join("log.db");

    let pool = initialize_db(&path).await.unwrap();
    assert!(path.exists());

    pool.close().await;
    let _ = fs::remove_dir_all(&dir);
  }
}
