//! Source of "now" for everything that depends on the calendar

use chrono::{DateTime, FixedOffset, Local, TimeZone};

/// Supplies the current instant together with the local UTC offset
///
/// Only the offset in effect at `now` is carried, not the zone's rules. Calendar
/// grouping applies that one offset to every stored instant, so a session logged
/// on the other side of a DST change can shift by the DST delta near midnight.
/// Week and day buckets are therefore exact only within a single offset period.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in the machine's local timezone, snapshotted to a fixed offset
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
  }
}

/// Always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<FixedOffset>);

impl FixedClock {
  pub fn new<Tz: TimeZone>(at: DateTime<Tz>) -> Self {
    Self(at.fixed_offset())
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<FixedOffset> {
    self.0
  }
}
