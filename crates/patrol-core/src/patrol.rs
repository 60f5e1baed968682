//! Patrol groups — the scheduling unit.
//!
//! A group dispatches one or more staff members to a single incident for a
//! single [`TimeWindow`]. Its membership is a set and is written together with
//! the group, never one staff member at a time.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, incident::IncidentStatus, window::TimeWindow};

// ─── Status machine ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatrolStatus {
  Scheduled,
  InProgress,
  Completed,
  Cancelled,
}

impl PatrolStatus {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Completed | Self::Cancelled)
  }

  /// Scheduled → InProgress → Completed, and any non-terminal → Cancelled.
  pub fn can_transition_to(self, next: PatrolStatus) -> bool {
    use PatrolStatus::*;
    matches!(
      (self, next),
      (Scheduled, InProgress)
        | (InProgress, Completed)
        | (Scheduled | InProgress, Cancelled)
    )
  }

  pub fn transition(self, next: PatrolStatus) -> Result<PatrolStatus> {
    if self.can_transition_to(next) {
      Ok(next)
    } else {
      Err(Error::validation(
        "status",
        format!("illegal patrol transition {self} -> {next}"),
      ))
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Scheduled => "scheduled",
      Self::InProgress => "in_progress",
      Self::Completed => "completed",
      Self::Cancelled => "cancelled",
    }
  }
}

impl std::fmt::Display for PatrolStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for PatrolStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "scheduled" => Ok(Self::Scheduled),
      "in_progress" => Ok(Self::InProgress),
      "completed" => Ok(Self::Completed),
      "cancelled" => Ok(Self::Cancelled),
      other => Err(Error::validation(
        "status",
        format!("unknown patrol status {other:?}"),
      )),
    }
  }
}

// ─── Group ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatrolGroup {
  pub group_id:    Uuid,
  pub incident_id: Uuid,
  pub staff_ids:   BTreeSet<Uuid>,
  #[serde(flatten)]
  pub window:      TimeWindow,
  pub status:      PatrolStatus,
  pub notes:       String,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl PatrolGroup {
  pub fn is_active(&self) -> bool { !self.status.is_terminal() }

  /// Reject any membership change on a closed group.
  pub fn ensure_mutable(&self) -> Result<()> {
    if self.status.is_terminal() {
      return Err(Error::validation(
        "group_id",
        format!("patrol group {} is {}", self.group_id, self.status),
      ));
    }
    Ok(())
  }

  /// Membership after removing `staff_id`, or the reason it is not allowed.
  pub fn without_member(&self, staff_id: Uuid) -> Result<BTreeSet<Uuid>> {
    self.ensure_mutable()?;
    if !self.staff_ids.contains(&staff_id) {
      return Err(Error::validation(
        "staff_id",
        format!("{staff_id} is not a member of patrol group {}", self.group_id),
      ));
    }
    if self.staff_ids.len() == 1 {
      return Err(Error::LastMember { group_id: self.group_id });
    }
    let mut remaining = self.staff_ids.clone();
    remaining.remove(&staff_id);
    Ok(remaining)
  }
}

/// A group together with the owning incident's status, read in one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatrolGroupView {
  #[serde(flatten)]
  pub group:           PatrolGroup,
  pub incident_status: IncidentStatus,
}

/// Input to [`crate::store::PatrolStore::create_group`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewPatrolGroup {
  pub incident_id: Uuid,
  pub staff_ids:   BTreeSet<Uuid>,
  #[serde(flatten)]
  pub window:      TimeWindow,
  #[serde(default)]
  pub notes:       String,
}

impl NewPatrolGroup {
  pub fn new(
    incident_id: Uuid,
    staff_ids: impl IntoIterator<Item = Uuid>,
    window: TimeWindow,
  ) -> Self {
    Self {
      incident_id,
      staff_ids: staff_ids.into_iter().collect(),
      window,
      notes: String::new(),
    }
  }

  /// Shape checks that need no storage access.
  pub fn validate(&self) -> Result<()> {
    if self.staff_ids.is_empty() {
      return Err(Error::validation(
        "staff_ids",
        "a patrol group needs at least one staff member",
      ));
    }
    Ok(())
  }
}

/// Filters for [`crate::store::PatrolStore::list_groups`]. All set fields must
/// match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupQuery {
  pub incident_id: Option<Uuid>,
  /// Groups that include this staff member.
  pub staff_id:    Option<Uuid>,
  pub date:        Option<chrono::NaiveDate>,
  pub status:      Option<PatrolStatus>,
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, NaiveTime};

  use super::*;

  fn group(members: &[Uuid], status: PatrolStatus) -> PatrolGroup {
    let now = Utc::now();
    PatrolGroup {
      group_id: Uuid::new_v4(),
      incident_id: Uuid::new_v4(),
      staff_ids: members.iter().copied().collect(),
      window: TimeWindow::new(
        NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
        NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
      ),
      status,
      notes: String::new(),
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn forward_transitions_are_allowed() {
    use PatrolStatus::*;
    assert_eq!(Scheduled.transition(InProgress).unwrap(), InProgress);
    assert_eq!(InProgress.transition(Completed).unwrap(), Completed);
    assert_eq!(Scheduled.transition(Cancelled).unwrap(), Cancelled);
    assert_eq!(InProgress.transition(Cancelled).unwrap(), Cancelled);
  }

  #[test]
  fn backward_skip_and_terminal_transitions_fail() {
    use PatrolStatus::*;
    for (from, to) in [
      (Completed, Scheduled),
      (Completed, Cancelled),
      (Cancelled, InProgress),
      (InProgress, Scheduled),
      (Scheduled, Completed),
      (Scheduled, Scheduled),
    ] {
      let err = from.transition(to).unwrap_err();
      assert!(matches!(err, Error::Validation { field: "status", .. }), "{from} -> {to}");
    }
  }

  #[test]
  fn removing_last_member_is_distinguished() {
    let only = Uuid::new_v4();
    let g = group(&[only], PatrolStatus::Scheduled);
    assert_eq!(
      g.without_member(only).unwrap_err(),
      Error::LastMember { group_id: g.group_id }
    );
  }

  #[test]
  fn removing_member_from_closed_group_fails() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let g = group(&[a, b], PatrolStatus::Completed);
    assert!(matches!(g.without_member(a), Err(Error::Validation { .. })));
  }

  #[test]
  fn removing_non_member_fails() {
    let g = group(&[Uuid::new_v4(), Uuid::new_v4()], PatrolStatus::Scheduled);
    let err = g.without_member(Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, Error::Validation { field: "staff_id", .. }));
  }

  #[test]
  fn new_group_requires_staff() {
    let g = NewPatrolGroup::new(
      Uuid::new_v4(),
      [],
      TimeWindow::new(
        NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
        NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
      ),
    );
    assert!(matches!(g.validate(), Err(Error::Validation { field: "staff_ids", .. })));
  }
}
