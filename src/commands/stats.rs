//! Statistics commands: each reads one snapshot and one clock reading

use crate::analysis::{
  category_stats, monthly_comparison_data, weekly_chart_data, CategoryStats, ChartDay, DaySummary,
  GoalProgress, MonthlyBucket, TrainingStats, WeekChanges, WeeklyComparison,
};
use crate::commands::current_snapshot;
use crate::db::AppState;
use crate::models::Training;
use crate::progression::{exercise_frequency, ExerciseFrequency};
use serde::Serialize;

/// Number of entries in the dashboard's most-logged exercise list
const DASHBOARD_TOP_EXERCISES: usize = 5;

pub async fn get_stats(state: &AppState) -> Result<TrainingStats, String> {
  let snapshot = current_snapshot(state).await;
  Ok(TrainingStats::compute(&snapshot, &state.clock.now()))
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyComparisonView {
  #[serde(flatten)]
  pub comparison: WeeklyComparison,
  pub changes: WeekChanges,
}

pub async fn get_weekly_comparison(state: &AppState) -> Result<WeeklyComparisonView, String> {
  let snapshot = current_snapshot(state).await;
  let comparison = WeeklyComparison::compute(&snapshot, &state.clock.now());
  Ok(WeeklyComparisonView {
    changes: comparison.changes(),
    comparison,
  })
}

pub async fn get_weekly_chart_data(state: &AppState) -> Result<Vec<ChartDay>, String> {
  let snapshot = current_snapshot(state).await;
  Ok(weekly_chart_data(&snapshot, &state.clock.now()))
}

pub async fn get_monthly_comparison_data(state: &AppState) -> Result<Vec<MonthlyBucket>, String> {
  let snapshot = current_snapshot(state).await;
  Ok(monthly_comparison_data(&snapshot, &state.clock.now()))
}

pub async fn get_category_stats(state: &AppState) -> Result<Vec<CategoryStats>, String> {
  let snapshot = current_snapshot(state).await;
  Ok(category_stats(&snapshot))
}

pub async fn get_today_summary(state: &AppState) -> Result<DaySummary, String> {
  let snapshot = current_snapshot(state).await;
  Ok(DaySummary::today(&snapshot, &state.clock.now()))
}

pub async fn get_goal_progress(state: &AppState) -> Result<GoalProgress, String> {
  let snapshot = current_snapshot(state).await;
  Ok(GoalProgress::weekly(
    &snapshot,
    &state.clock.now(),
    state.config.weekly_goal,
  ))
}

/// ---------------------------------------------------------------------------
/// Dashboard
/// ---------------------------------------------------------------------------

/// Everything the home screen shows, computed from a single snapshot
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
  pub revision: u64,
  pub stats: TrainingStats,
  pub today: DaySummary,
  pub goal: GoalProgress,
  pub weekly: WeeklyComparisonView,
  pub chart: Vec<ChartDay>,
  pub monthly: Vec<MonthlyBucket>,
  pub categories: Vec<CategoryStats>,
  pub top_exercises: Vec<ExerciseFrequency>,
  pub recent: Vec<Training>,
}

pub async fn get_dashboard(state: &AppState) -> Result<Dashboard, String> {
  let snapshot = current_snapshot(state).await;
  let now = state.clock.now();
  let trainings: &[Training] = &snapshot;

  let stats = TrainingStats::compute(trainings, &now);
  let goal = GoalProgress::from_counts(stats.week.count, state.config.weekly_goal);
  let comparison = WeeklyComparison::compute(trainings, &now);
  let recent_len = state.config.recent_limit.min(trainings.len());

  Ok(Dashboard {
    revision: snapshot.revision(),
    today: DaySummary::today(trainings, &now),
    goal,
    weekly: WeeklyComparisonView {
      changes: comparison.changes(),
      comparison,
    },
    chart: weekly_chart_data(trainings, &now),
    monthly: monthly_comparison_data(trainings, &now),
    categories: category_stats(trainings),
    top_exercises: exercise_frequency(trainings, DASHBOARD_TOP_EXERCISES),
    recent: trainings[..recent_len].to_vec(),
    stats,
  })
}
