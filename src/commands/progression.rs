//! Commands for per-exercise progress tracking

use crate::commands::current_snapshot;
use crate::db::AppState;
use crate::progression::{exercise_frequency, exercise_progress, ExerciseFrequency, ExerciseProgressEntry};

/// History of one exercise, oldest first
pub async fn get_exercise_progress(
    state: &AppState,
    exercise_id: String,
) -> Result<Vec<ExerciseProgressEntry>, String> {
    let snapshot = current_snapshot(state).await;
    Ok(exercise_progress(&snapshot, &exercise_id))
}

/// Most frequently logged exercises
pub async fn get_exercise_frequency(
    state: &AppState,
    limit: usize,
) -> Result<Vec<ExerciseFrequency>, String> {
    let snapshot = current_snapshot(state).await;
    Ok(exercise_frequency(&snapshot, limit))
}
