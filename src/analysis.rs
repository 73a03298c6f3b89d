//! Deterministic aggregation layer for training statistics
//!
//! Every function here is a pure transform of `(trainings, now)`. Nothing reads
//! the wall clock and nothing mutates the records it is handed, so the same
//! snapshot and the same `now` always produce the same output.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::models::{Exercise, Training, DEFAULT_CATEGORY_NAME};

/// ---------------------------------------------------------------------------
/// Volume & Derived Fields
/// ---------------------------------------------------------------------------

/// Sum over exercises, over sets, of weight x reps
pub fn total_volume(exercises: &[Exercise]) -> f64 {
  exercises.iter().map(Exercise::volume).sum()
}

/// Number of logged set entries
pub fn total_sets(exercises: &[Exercise]) -> u64 {
  exercises.iter().map(|ex| ex.sets.len() as u64).sum()
}

/// Summed in u64: a single set may carry up to `u32::MAX` reps
pub fn total_reps(exercises: &[Exercise]) -> u64 {
  exercises
    .iter()
    .map(Exercise::total_reps)
    .fold(0, u64::saturating_add)
}

/// Mean set weight, not weighted by reps. 0 when no sets were logged.
pub fn average_weight(exercises: &[Exercise]) -> f64 {
  let sets = total_sets(exercises);
  if sets == 0 {
    return 0.0;
  }

  let total_weight: f64 = exercises
    .iter()
    .flat_map(|ex| ex.sets.iter())
    .map(|s| s.weight)
    .sum();
  total_weight / sets as f64
}

/// Per-training cached totals
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingTotals {
  pub total_volume: f64,
  pub total_sets: u64,
  pub total_reps: u64,
  pub average_weight: f64,
}

impl TrainingTotals {
  pub fn compute(exercises: &[Exercise]) -> Self {
    Self {
      total_volume: total_volume(exercises),
      total_sets: total_sets(exercises),
      total_reps: total_reps(exercises),
      average_weight: average_weight(exercises),
    }
  }

  /// Equality with float tolerance, used to validate a stored cache
  pub fn matches(&self, other: &Self) -> bool {
    const EPSILON: f64 = 1e-6;
    self.total_sets == other.total_sets
      && self.total_reps == other.total_reps
      && (self.total_volume - other.total_volume).abs() <= EPSILON
      && (self.average_weight - other.average_weight).abs() <= EPSILON
  }
}

/// ---------------------------------------------------------------------------
/// Period Rollups
/// ---------------------------------------------------------------------------

/// Aggregate over any filtered subset of trainings
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PeriodStats {
  pub count: u32,
  /// Sum of exercise-list lengths
  pub exercises: u32,
  pub sets: u64,
  pub reps: u64,
  /// Minutes
  pub duration: u64,
  pub volume: f64,
  /// Arithmetic mean of per-training average weight
  pub average_weight: f64,
}

impl PeriodStats {
  pub fn from_trainings<'a>(trainings: impl IntoIterator<Item = &'a Training>) -> Self {
    let mut rollup = Rollup::default();
    for t in trainings {
      rollup.add(t);
    }
    rollup.finish()
  }
}

#[derive(Debug, Default)]
struct Rollup {
  stats: PeriodStats,
  average_weight_sum: f64,
}

impl Rollup {
  fn add(&mut self, t: &Training) {
    self.stats.count = self.stats.count.saturating_add(1);
    self.stats.exercises = self
      .stats
      .exercises
      .saturating_add(u32::try_from(t.exercises.len()).unwrap_or(u32::MAX));
    self.stats.sets = self.stats.sets.saturating_add(t.totals.total_sets);
    self.stats.reps = self.stats.reps.saturating_add(t.totals.total_reps);
    self.stats.duration = self.stats.duration.saturating_add(u64::from(t.duration_minutes));
    self.stats.volume += t.totals.total_volume;
    self.average_weight_sum += t.totals.average_weight;
  }

  fn finish(self) -> PeriodStats {
    let mut stats = self.stats;
    stats.average_weight = if stats.count > 0 {
      self.average_weight_sum / f64::from(stats.count)
    } else {
      0.0
    };
    stats
  }
}

/// All-time and trailing-7-day snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
  pub all: PeriodStats,
  pub week: PeriodStats,
}

impl TrainingStats {
  /// The week window is a sliding `now - 7 x 24h` cutoff, inclusive, not a calendar week
  pub fn compute<Tz: TimeZone>(trainings: &[Training], now: &DateTime<Tz>) -> Self {
    let cutoff = now.with_timezone(&Utc) - Duration::days(7);

    Self {
      all: PeriodStats::from_trainings(trainings),
      week: PeriodStats::from_trainings(trainings.iter().filter(|t| t.date >= cutoff)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Calendar Windows
/// ---------------------------------------------------------------------------

/// Half-open local wall-clock interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
  pub start: NaiveDateTime,
  pub end: NaiveDateTime,
}

impl DateWindow {
  /// Monday 00:00 through the following Monday 00:00 for the week containing `day`.
  /// Sunday closes the week that started six days earlier.
  pub fn week_of(day: NaiveDate) -> Self {
    let back = i64::from(day.weekday().num_days_from_monday());
    let start = (day - Duration::days(back)).and_time(NaiveTime::MIN);
    Self {
      start,
      end: start + Duration::days(7),
    }
  }

  pub fn shifted_weeks(self, weeks: i64) -> Self {
    Self {
      start: self.start + Duration::weeks(weeks),
      end: self.end + Duration::weeks(weeks),
    }
  }

  pub fn contains(&self, local: NaiveDateTime) -> bool {
    self.start <= local && local < self.end
  }

  pub fn length(&self) -> Duration {
    self.end - self.start
  }
}

/// Wall-clock time of `instant` in the zone of `now`
fn local_time<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> NaiveDateTime {
  instant.with_timezone(tz).naive_local()
}

fn stats_in_window<Tz: TimeZone>(trainings: &[Training], window: &DateWindow, tz: &Tz) -> PeriodStats {
  PeriodStats::from_trainings(
    trainings
      .iter()
      .filter(|t| window.contains(local_time(&t.date, tz))),
  )
}

/// ---------------------------------------------------------------------------
/// Weekly Comparison
/// ---------------------------------------------------------------------------

/// Relative change between two periods
///
/// Growth from nothing has no meaningful percentage, so it is reported as `New`
/// instead of a fabricated 100%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "percent", rename_all = "snake_case")]
pub enum PercentChange {
  Change(f64),
  New,
}

impl PercentChange {
  pub fn between(previous: f64, current: f64) -> Self {
    if previous == 0.0 {
      if current == 0.0 {
        PercentChange::Change(0.0)
      } else {
        PercentChange::New
      }
    } else {
      PercentChange::Change((current - previous) / previous * 100.0)
    }
  }
}

/// Current calendar week against the one before it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyComparison {
  pub current_week: PeriodStats,
  pub last_week: PeriodStats,
  pub current_window: DateWindow,
  pub last_window: DateWindow,
}

/// Per-metric change from last week to this week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekChanges {
  pub count: PercentChange,
  pub volume: PercentChange,
  pub duration: PercentChange,
  pub exercises: PercentChange,
  pub sets: PercentChange,
  pub reps: PercentChange,
}

impl WeeklyComparison {
  pub fn compute<Tz: TimeZone>(trainings: &[Training], now: &DateTime<Tz>) -> Self {
    let tz = now.timezone();
    let current_window = DateWindow::week_of(now.date_naive());
    let last_window = current_window.shifted_weeks(-1);

    Self {
      current_week: stats_in_window(trainings, &current_window, &tz),
      last_week: stats_in_window(trainings, &last_window, &tz),
      current_window,
      last_window,
    }
  }

  pub fn changes(&self) -> WeekChanges {
    let (cur, prev) = (&self.current_week, &self.last_week);
    WeekChanges {
      count: PercentChange::between(f64::from(prev.count), f64::from(cur.count)),
      volume: PercentChange::between(prev.volume, cur.volume),
      duration: PercentChange::between(prev.duration as f64, cur.duration as f64),
      exercises: PercentChange::between(f64::from(prev.exercises), f64::from(cur.exercises)),
      sets: PercentChange::between(prev.sets as f64, cur.sets as f64),
      reps: PercentChange::between(prev.reps as f64, cur.reps as f64),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Chart Binning
/// ---------------------------------------------------------------------------

/// One fixed Monday..Sunday slot of the trailing-week chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDay {
  pub weekday: Weekday,
  /// The calendar date this slot represents within the trailing 7 days
  pub date: NaiveDate,
  #[serde(flatten)]
  pub stats: PeriodStats,
}

/// Bin the trailing 7 calendar days (today and the 6 before) into Monday..Sunday slots
///
/// Slots are keyed by weekday, so the axis always reads Mon..Sun no matter which
/// seven dates are covered. Anything older than six days back is excluded even if
/// it shares a weekday with a slot.
pub fn weekly_chart_data<Tz: TimeZone>(trainings: &[Training], now: &DateTime<Tz>) -> Vec<ChartDay> {
  let tz = now.timezone();
  let today = now.date_naive();
  let first_day = today - Duration::days(6);

  let mut dates = [today; 7];
  for offset in 0..7 {
    let day = first_day + Duration::days(offset);
    dates[chart_index(day.weekday())] = day;
  }

  let mut slots: Vec<Rollup> = (0..7).map(|_| Rollup::default()).collect();
  for t in trainings {
    let day = t.date.with_timezone(&tz).date_naive();
    if day < first_day || day > today {
      continue;
    }
    slots[chart_index(day.weekday())].add(t);
  }

  slots
    .into_iter()
    .zip(dates)
    .map(|(rollup, date)| ChartDay {
      weekday: date.weekday(),
      date,
      stats: rollup.finish(),
    })
    .collect()
}

/// Monday -> 0 ... Sunday -> 6
fn chart_index(weekday: Weekday) -> usize {
  weekday.num_days_from_monday() as usize
}

/// One calendar week of the four-week rollup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBucket {
  /// 1 = oldest, 4 = current week
  pub week: u8,
  pub start: NaiveDate,
  /// Exclusive
  pub end: NaiveDate,
  #[serde(flatten)]
  pub stats: PeriodStats,
}

/// Four Monday-aligned weeks ending with the current one, oldest first
pub fn monthly_comparison_data<Tz: TimeZone>(trainings: &[Training], now: &DateTime<Tz>) -> Vec<MonthlyBucket> {
  let tz = now.timezone();
  let current = DateWindow::week_of(now.date_naive());

  (0..4u8)
    .rev()
    .map(|weeks_back| {
      let window = current.shifted_weeks(-i64::from(weeks_back));
      MonthlyBucket {
        week: 4 - weeks_back,
        start: window.start.date(),
        end: window.end.date(),
        stats: stats_in_window(trainings, &window, &tz),
      }
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// Category Breakdown
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
  pub id: String,
  pub name: String,
  pub count: u32,
  pub total_volume: f64,
  pub total_duration: u64,
}

/// Group by workout type, in order of first appearance
pub fn category_stats(trainings: &[Training]) -> Vec<CategoryStats> {
  let mut index: HashMap<&str, usize> = HashMap::new();
  let mut out: Vec<CategoryStats> = Vec::new();

  for t in trainings {
    let id = t.category_id();
    let slot = *index.entry(id).or_insert_with(|| {
      let name = t
        .category
        .as_ref()
        .filter(|c| !c.id.is_empty() && !c.name.trim().is_empty())
        .map_or(DEFAULT_CATEGORY_NAME, |c| c.name.as_str());
      out.push(CategoryStats {
        id: id.to_string(),
        name: name.to_string(),
        count: 0,
        total_volume: 0.0,
        total_duration: 0,
      });
      out.len() - 1
    });

    let entry = &mut out[slot];
    entry.count += 1;
    entry.total_volume += t.totals.total_volume;
    entry.total_duration += u64::from(t.duration_minutes);
  }

  out
}

/// ---------------------------------------------------------------------------
/// Daily Summary & Goal
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
  pub date: NaiveDate,
  pub count: u32,
  pub volume: f64,
  pub duration: u64,
}

impl DaySummary {
  /// Trainings on today's local calendar date
  pub fn today<Tz: TimeZone>(trainings: &[Training], now: &DateTime<Tz>) -> Self {
    let tz = now.timezone();
    let today = now.date_naive();
    let stats = PeriodStats::from_trainings(
      trainings
        .iter()
        .filter(|t| t.date.with_timezone(&tz).date_naive() == today),
    );

    Self {
      date: today,
      count: stats.count,
      volume: stats.volume,
      duration: stats.duration,
    }
  }
}

/// Trailing-week session count against a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
  pub target: u32,
  pub completed: u32,
  /// Capped at 100
  pub percent: f64,
}

impl GoalProgress {
  pub fn from_counts(completed: u32, target: u32) -> Self {
    let percent = if target == 0 {
      0.0
    } else {
      (f64::from(completed) / f64::from(target) * 100.0).min(100.0)
    };

    Self {
      target,
      completed,
      percent,
    }
  }

  pub fn weekly<Tz: TimeZone>(trainings: &[Training], now: &DateTime<Tz>, target: u32) -> Self {
    let stats = TrainingStats::compute(trainings, now);
    Self::from_counts(stats.week.count, target)
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
