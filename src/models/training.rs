use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::TrainingTotals;

/// Bucket id used for trainings logged without a workout type
pub const DEFAULT_CATEGORY_ID: &str = "other";

/// Bucket name paired with [`DEFAULT_CATEGORY_ID`]
pub const DEFAULT_CATEGORY_NAME: &str = "Other";

/// Workout type a session was logged under ("Full body", "Split - Back+Biceps", ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
  pub id: String,
  pub name: String,
}

/// One execution of an exercise at a given weight and rep count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Set {
  pub number: u32,
  #[serde(default)]
  pub weight: f64,
  #[serde(default)]
  pub reps: u32,
  #[serde(default)]
  pub is_completed: bool,
}

impl Set {
  pub fn new(number: u32, weight: f64, reps: u32) -> Self {
    Self {
      number,
      weight: sanitize_weight(weight),
      reps,
      is_completed: true,
    }
  }

  /// Volume contribution: weight x reps
  pub fn volume(&self) -> f64 {
    self.weight * f64::from(self.reps)
  }
}

/// One movement performed within a session, sets in performed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
  pub id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(default)]
  pub sets: Vec<Set>,
}

impl Exercise {
  pub fn volume(&self) -> f64 {
    self.sets.iter().map(Set::volume).sum()
  }

  pub fn total_reps(&self) -> u64 {
    self.sets.iter().map(|s| u64::from(s.reps)).sum()
  }

  /// Heaviest set, 0 when nothing was logged
  pub fn max_weight(&self) -> f64 {
    self.sets.iter().map(|s| s.weight).fold(0.0, f64::max)
  }
}

/// One logged workout session
///
/// `totals` is a cache of values derived from `exercises`. It is written once
/// when the record is created and re-checked whenever records are loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Training {
  pub id: String,
  pub name: String,
  pub date: DateTime<Utc>,
  #[serde(default)]
  pub duration_minutes: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<CategoryRef>,
  #[serde(default)]
  pub exercises: Vec<Exercise>,
  #[serde(flatten)]
  pub totals: TrainingTotals,
}

impl Training {
  /// Build a stored record from form input, computing the cached totals
  pub fn from_new(id: String, new: NewTraining, default_date: DateTime<Utc>) -> Self {
    let exercises: Vec<Exercise> = new
      .exercises
      .into_iter()
      .map(|mut ex| {
        ex.name = ex.name.trim().to_string();
        if ex.id.trim().is_empty() {
          ex.id = ex.name.clone();
        }
        for set in &mut ex.sets {
          set.weight = sanitize_weight(set.weight);
        }
        ex
      })
      .collect();

    let totals = TrainingTotals::compute(&exercises);

    Self {
      id,
      name: new.name.trim().to_string(),
      date: new.date.unwrap_or(default_date),
      duration_minutes: new.duration_minutes,
      category: new.category,
      exercises,
      totals,
    }
  }

  /// Category bucket key, [`DEFAULT_CATEGORY_ID`] for uncategorized sessions
  pub fn category_id(&self) -> &str {
    match &self.category {
      Some(c) if !c.id.is_empty() => &c.id,
      _ => DEFAULT_CATEGORY_ID,
    }
  }

  /// Recompute the cached totals. Returns true when the cache was stale.
  pub fn refresh_totals(&mut self) -> bool {
    let fresh = TrainingTotals::compute(&self.exercises);
    if self.totals.matches(&fresh) {
      false
    } else {
      self.totals = fresh;
      true
    }
  }

  /// Find an exercise entry by movement id (first occurrence)
  pub fn exercise(&self, exercise_id: &str) -> Option<&Exercise> {
    self.exercises.iter().find(|ex| ex.id == exercise_id)
  }
}

/// For creating new trainings (without id and cached totals)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTraining {
  pub name: String,
  /// Defaults to the time of submission
  #[serde(default)]
  pub date: Option<DateTime<Utc>>,
  #[serde(default)]
  pub duration_minutes: u32,
  #[serde(default)]
  pub category: Option<CategoryRef>,
  #[serde(default)]
  pub exercises: Vec<Exercise>,
}

/// Weights are physical loads: anything negative or non-finite counts as 0
pub fn sanitize_weight(weight: f64) -> f64 {
  if weight.is_finite() && weight > 0.0 {
    weight
  } else {
    0.0
  }
}
