//! Per-Exercise Progress Tracking
//!
//! Time series of one movement across sessions, plus a ranking of the
//! movements logged most often. Both are pure reads over a training list:
//! - progress is keyed by exercise id and ordered oldest first
//! - frequency is keyed by exercise name and ordered most frequent first

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Set, Training};

// ---------------------------------------------------------------------------
/// Progress History: one point per session containing the exercise
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseProgressEntry {
    pub date: DateTime<Utc>,
    pub training_id: String,
    pub training_name: String,
    /// Sets logged for the exercise in this session, in entry order
    pub sets: Vec<Set>,
    pub set_count: u32,
    /// Volume of this exercise only, not the whole session
    pub total_volume: f64,
    /// Heaviest set, 0 when the entry has no sets
    pub max_weight: f64,
    pub total_reps: u64,
}

/// Collect the history of one exercise, sorted ascending by date
///
/// Only the first entry with a matching id in each training is used. Sessions
/// sharing a timestamp keep their relative input order.
pub fn exercise_progress(trainings: &[Training], exercise_id: &str) -> Vec<ExerciseProgressEntry> {
    let mut entries: Vec<ExerciseProgressEntry> = trainings
        .iter()
        .filter_map(|t| {
            let ex = t.exercise(exercise_id)?;
            Some(ExerciseProgressEntry {
                date: t.date,
                training_id: t.id.clone(),
                training_name: t.name.clone(),
                sets: ex.sets.clone(),
                set_count: u32::try_from(ex.sets.len()).unwrap_or(u32::MAX),
                total_volume: ex.volume(),
                max_weight: ex.max_weight(),
                total_reps: ex.total_reps(),
            })
        })
        .collect();

    // sort_by_key is stable
    entries.sort_by_key(|e| e.date);
    entries
}

// ---------------------------------------------------------------------------
/// Frequency Ranking: which movements show up most often
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseFrequency {
    pub name: String,
    pub count: u32,
}

/// Count exercise occurrences by name, most frequent first
///
/// Ties keep the order in which names were first seen. Empty names are skipped.
pub fn exercise_frequency(trainings: &[Training], limit: usize) -> Vec<ExerciseFrequency> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<ExerciseFrequency> = Vec::new();

    for ex in trainings.iter().flat_map(|t| t.exercises.iter()) {
        let name = ex.name.trim();
        if name.is_empty() {
            continue;
        }

        match index.get(name) {
            Some(&slot) => counts[slot].count += 1,
            None => {
                index.insert(name, counts.len());
                counts.push(ExerciseFrequency {
                    name: name.to_string(),
                    count: 1,
                });
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{days_before, mock_exercise, mock_training, reference_now};

    fn squat_history() -> Vec<Training> {
        let now = reference_now();
        // Newest first, the way the store keeps them
        vec![
            mock_training("Leg day C", days_before(now, 1), vec![mock_exercise("squat", &[(80.0, 5)])]),
            mock_training(
                "Upper",
                days_before(now, 3),
                vec![mock_exercise("bench", &[(60.0, 8)])],
            ),
            mock_training("Leg day B", days_before(now, 5), vec![mock_exercise("squat", &[(70.0, 5)])]),
            mock_training("Leg day A", days_before(now, 9), vec![mock_exercise("squat", &[(60.0, 5)])]),
        ]
    }

    #[test]
    fn test_progress_sorted_ascending_with_max_weight() {
        let progress = exercise_progress(&squat_history(), "squat");

        assert_eq!(progress.len(), 3);
        let weights: Vec<f64> = progress.iter().map(|e| e.max_weight).collect();
        assert_eq!(weights, vec![60.0, 70.0, 80.0]);
        assert!(progress.windows(2).all(|w| w[0].date <= w[1].date));
        assert_eq!(progress[0].training_name, "Leg day A");
    }

    #[test]
    fn test_progress_volume_is_exercise_only() {
        let now = reference_now();
        let trainings = vec![mock_training(
            "Mixed",
            now,
            vec![
                mock_exercise("squat", &[(100.0, 5), (110.0, 3)]),
                mock_exercise("row", &[(50.0, 10)]),
            ],
        )];

        let progress = exercise_progress(&trainings, "squat");
        assert_eq!(progress.len(), 1);
        assert_eq!(progress[0].total_volume, 830.0);
        assert_eq!(progress[0].set_count, 2);
        let logged: Vec<(f64, u32)> = progress[0].sets.iter().map(|s| (s.weight, s.reps)).collect();
        assert_eq!(logged, vec![(100.0, 5), (110.0, 3)]);
        assert_eq!(progress[0].sets[1].number, 2);
        assert_eq!(progress[0].total_reps, 8);
        assert_eq!(progress[0].max_weight, 110.0);
    }

    #[test]
    fn test_progress_entry_without_sets_has_zero_max() {
        let now = reference_now();
        let trainings = vec![mock_training("Empty", now, vec![mock_exercise("squat", &[])])];

        let progress = exercise_progress(&trainings, "squat");
        assert_eq!(progress.len(), 1);
        assert_eq!(progress[0].max_weight, 0.0);
        assert!(!progress[0].max_weight.is_nan());
        assert!(progress[0].sets.is_empty());
        assert_eq!(progress[0].set_count, 0);
    }

    #[test]
    fn test_progress_unknown_exercise() {
        assert!(exercise_progress(&squat_history(), "deadlift").is_empty());
        assert!(exercise_progress(&[], "squat").is_empty());
    }

    #[test]
    fn test_progress_same_timestamp_is_stable() {
        let now = reference_now();
        let trainings = vec![
            mock_training("First", now, vec![mock_exercise("squat", &[(60.0, 5)])]),
            mock_training("Second", now, vec![mock_exercise("squat", &[(65.0, 5)])]),
        ];

        let progress = exercise_progress(&trainings, "squat");
        assert_eq!(progress[0].training_name, "First");
        assert_eq!(progress[1].training_name, "Second");
    }

    #[test]
    fn test_frequency_ranks_by_count() {
        let freq = exercise_frequency(&squat_history(), 5);

        assert_eq!(
            freq,
            vec![
                ExerciseFrequency { name: "squat".to_string(), count: 3 },
                ExerciseFrequency { name: "bench".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_frequency_ties_keep_first_seen_order() {
        let now = reference_now();
        let trainings = vec![
            mock_training(
                "A",
                now,
                vec![mock_exercise("row", &[(40.0, 10)]), mock_exercise("press", &[(30.0, 10)])],
            ),
            mock_training("B", days_before(now, 1), vec![mock_exercise("curl", &[(10.0, 10)])]),
        ];

        let names: Vec<String> = exercise_frequency(&trainings, 10)
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["row", "press", "curl"]);
    }

    #[test]
    fn test_frequency_truncates_to_limit() {
        let freq = exercise_frequency(&squat_history(), 1);
        assert_eq!(freq.len(), 1);
        assert_eq!(freq[0].name, "squat");

        assert!(exercise_frequency(&squat_history(), 0).is_empty());
    }
}
