//! Tolerant decoding of historical training records
//!
//! Two exercise shapes exist in stored data: the structured shape
//! (`sets: [{weight, reps}]`) and the older flat shape
//! (`{sets: <count>, reps, weight}`). Both are decoded here and normalized into
//! the canonical [`Exercise`] so nothing downstream has to care which one it saw.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use super::training::{
  sanitize_weight, CategoryRef, Exercise, Set, Training, DEFAULT_CATEGORY_NAME,
};
use crate::analysis::TrainingTotals;

/// Upper bound on sets generated from one flat exercise entry
pub const MAX_EXPANDED_SETS: u32 = 100;

/// An exercise as found in storage, either shape
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoredExercise {
  Structured(StructuredExercise),
  Flat(FlatExercise),
}

#[derive(Debug, Clone, Deserialize)]
pub struct StructuredExercise {
  #[serde(default, deserialize_with = "string_or_number")]
  pub id: Option<String>,
  #[serde(default, rename = "exerciseId", deserialize_with = "string_or_number")]
  pub exercise_id: Option<String>,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub category: Option<String>,
  pub sets: Vec<StoredSet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoredSet {
  #[serde(default)]
  pub number: Option<u32>,
  #[serde(default)]
  pub weight: Option<f64>,
  #[serde(default)]
  pub reps: Option<f64>,
  #[serde(default, alias = "isCompleted")]
  pub is_completed: Option<bool>,
}

/// Older single-row entry: `sets` is a count, not a list. A missing count means one set.
#[derive(Debug, Clone, Deserialize)]
pub struct FlatExercise {
  #[serde(default, deserialize_with = "string_or_number")]
  pub id: Option<String>,
  #[serde(default, rename = "exerciseId", deserialize_with = "string_or_number")]
  pub exercise_id: Option<String>,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub sets: Option<f64>,
  #[serde(default)]
  pub reps: f64,
  #[serde(default)]
  pub weight: f64,
}

impl StoredExercise {
  /// Convert into the canonical structured shape
  ///
  /// A flat entry expands into `sets` identical sets, so its volume stays
  /// `sets x reps x weight` and its set count stays what the user entered.
  pub fn normalize(self) -> Exercise {
    match self {
      StoredExercise::Structured(ex) => {
        let name = ex.name.unwrap_or_default().trim().to_string();
        let sets = ex
          .sets
          .into_iter()
          .enumerate()
          .map(|(idx, s)| Set {
            number: s.number.unwrap_or(idx as u32 + 1),
            weight: sanitize_weight(s.weight.unwrap_or(0.0)),
            reps: to_count(s.reps.unwrap_or(0.0)),
            is_completed: s.is_completed.unwrap_or(true),
          })
          .collect();

        Exercise {
          id: fallback_id(ex.id.or(ex.exercise_id), &name),
          name,
          category: ex.category,
          sets,
        }
      }
      StoredExercise::Flat(ex) => {
        let name = ex.name.unwrap_or_default().trim().to_string();
        let requested = ex.sets.map_or(1, to_count);
        let count = requested.min(MAX_EXPANDED_SETS);
        if count < requested {
          tracing::warn!(
            exercise = %name,
            requested,
            kept = count,
            "flat exercise set count capped"
          );
        }

        let reps = to_count(ex.reps);
        let sets = (1..=count).map(|n| Set::new(n, ex.weight, reps)).collect();

        Exercise {
          id: fallback_id(ex.id.or(ex.exercise_id), &name),
          name,
          category: ex.category,
          sets,
        }
      }
    }
  }
}

/// Exercises recovered from a stored list
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedExercises {
  pub exercises: Vec<Exercise>,
  /// Entries that matched neither shape and were left out
  pub rejected: usize,
}

impl DecodedExercises {
  pub fn is_complete(&self) -> bool {
    self.rejected == 0
  }
}

/// Decode a stored exercise list, accepting both shapes
///
/// Entries are decoded one at a time so a single unreadable entry does not
/// take its siblings down with it. Fails only when `json` is not a list.
pub fn decode_exercises(json: &str) -> Result<DecodedExercises, serde_json::Error> {
  let entries: Option<Vec<serde_json::Value>> = serde_json::from_str(json)?;

  let mut decoded = DecodedExercises::default();
  for (idx, entry) in entries.unwrap_or_default().into_iter().enumerate() {
    match StoredExercise::deserialize(entry) {
      Ok(stored) => decoded.exercises.push(stored.normalize()),
      Err(e) => {
        tracing::warn!(index = idx, error = %e, "skipping unreadable exercise entry");
        decoded.rejected += 1;
      }
    }
  }
  Ok(decoded)
}

/// ---------------------------------------------------------------------------
/// Legacy export records (camelCase JSON written by the mobile app)
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTraining {
  #[serde(default, deserialize_with = "string_or_number")]
  pub id: Option<String>,
  #[serde(default, alias = "title")]
  pub name: Option<String>,
  pub date: DateTime<Utc>,
  #[serde(default)]
  pub duration: Option<f64>,
  #[serde(default)]
  pub category: Option<LegacyCategory>,
  #[serde(default)]
  pub exercises: Option<Vec<StoredExercise>>,
  #[serde(default)]
  pub total_volume: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyCategory {
  #[serde(default, deserialize_with = "string_or_number")]
  pub id: Option<String>,
  #[serde(default)]
  pub name: Option<String>,
}

impl LegacyTraining {
  /// Normalize into a canonical record. `new_id` supplies ids for records that lack one.
  pub fn into_training(self, new_id: impl FnOnce() -> String) -> Training {
    let exercises: Vec<Exercise> = self
      .exercises
      .unwrap_or_default()
      .into_iter()
      .map(StoredExercise::normalize)
      .collect();
    let totals = TrainingTotals::compute(&exercises);

    if volume_mismatch(self.total_volume, totals.total_volume) {
      tracing::warn!(
        id = ?self.id,
        cached = ?self.total_volume,
        computed = totals.total_volume,
        "legacy training volume recomputed"
      );
    }

    let category = self.category.and_then(|c| {
      let id = c.id.filter(|id| !id.is_empty())?;
      Some(CategoryRef {
        name: c
          .name
          .filter(|n| !n.trim().is_empty())
          .unwrap_or_else(|| DEFAULT_CATEGORY_NAME.to_string()),
        id,
      })
    });

    Training {
      id: self.id.filter(|id| !id.is_empty()).unwrap_or_else(new_id),
      name: self.name.unwrap_or_default().trim().to_string(),
      date: self.date,
      duration_minutes: to_count(self.duration.unwrap_or(0.0)),
      category,
      exercises,
      totals,
    }
  }
}

fn volume_mismatch(cached: Option<f64>, computed: f64) -> bool {
  cached.is_some_and(|cached| (cached - computed).abs() > 1e-6)
}

fn fallback_id(id: Option<String>, name: &str) -> String {
  id.filter(|id| !id.trim().is_empty())
    .unwrap_or_else(|| name.to_string())
}

/// Counts arrive as JSON numbers of any kind; keep them whole and non-negative
fn to_count(value: f64) -> u32 {
  if value.is_finite() && value > 0.0 {
    value.round().min(f64::from(u32::MAX)) as u32
  } else {
    0
  }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  use serde::de::Error;
  let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
  match value {
    None => Ok(None),
    Some(serde_json::Value::String(s)) => Ok(Some(s)),
    Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
    Some(other) => Err(D::Error::custom(format!(
      "expected string or number, got {other}"
    ))),
  }
}
