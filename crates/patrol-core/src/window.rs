//! Scheduled windows and the overlap rule used for double-booking checks.
//!
//! A patrol is scheduled by a calendar date and a start time. Its occupied
//! range is the half-open interval `[start, start + slot)`, cut off at the end
//! of that calendar day. Two windows overlap iff they fall on the same date and
//! their ranges intersect.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// The operational slot length every patrol is assumed to occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLength(TimeDelta);

impl SlotLength {
  pub const DEFAULT_MINUTES: u32 = 120;

  /// A slot of `minutes` minutes. Zero is rounded up to one minute so that
  /// two patrols starting at the same instant always overlap.
  pub fn minutes(minutes: u32) -> Self {
    Self(TimeDelta::minutes(i64::from(minutes.max(1))))
  }

  pub fn as_delta(&self) -> TimeDelta { self.0 }
}

impl Default for SlotLength {
  fn default() -> Self { Self::minutes(Self::DEFAULT_MINUTES) }
}

/// When a patrol is scheduled to start.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TimeWindow {
  pub date: NaiveDate,
  pub time: NaiveTime,
}

impl TimeWindow {
  pub fn new(date: NaiveDate, time: NaiveTime) -> Self { Self { date, time } }

  pub fn start(&self) -> NaiveDateTime { self.date.and_time(self.time) }

  /// Exclusive end of the occupied range, clamped to midnight.
  pub fn end(&self, slot: SlotLength) -> NaiveDateTime {
    let day_end = self
      .date
      .succ_opt()
      .and_then(|next| next.and_hms_opt(0, 0, 0))
      .unwrap_or(NaiveDateTime::MAX);
    self
      .start()
      .checked_add_signed(slot.as_delta())
      .map_or(day_end, |end| end.min(day_end))
  }

  pub fn overlaps(&self, other: &TimeWindow, slot: SlotLength) -> bool {
    self.date == other.date
      && self.start() < other.end(slot)
      && other.start() < self.end(slot)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn at(date: &str, time: &str) -> TimeWindow {
    TimeWindow::new(
      date.parse().expect("date"),
      NaiveTime::parse_from_str(time, "%H:%M").expect("time"),
    )
  }

  #[test]
  fn half_hour_apart_overlaps_with_default_slot() {
    let a = at("2026-01-10", "10:00");
    let b = at("2026-01-10", "10:30");
    assert!(a.overlaps(&b, SlotLength::default()));
    assert!(b.overlaps(&a, SlotLength::default()));
  }

  #[test]
  fn back_to_back_slots_do_not_overlap() {
    let a = at("2026-01-10", "10:00");
    let b = at("2026-01-10", "12:00");
    assert!(!a.overlaps(&b, SlotLength::default()));
    assert!(a.overlaps(&b, SlotLength::minutes(121)));
  }

  #[test]
  fn different_dates_never_overlap() {
    let late = at("2026-01-10", "23:30");
    let early = at("2026-01-11", "00:15");
    assert!(!late.overlaps(&early, SlotLength::minutes(24 * 60)));
  }

  #[test]
  fn end_is_clamped_to_midnight() {
    let late = at("2026-01-10", "23:00");
    let midnight = at("2026-01-11", "00:00").start();
    assert_eq!(late.end(SlotLength::default()), midnight);
  }

  #[test]
  fn zero_minute_slot_still_covers_its_start() {
    let a = at("2026-01-10", "10:00");
    assert!(a.overlaps(&a, SlotLength::minutes(0)));
  }
}
