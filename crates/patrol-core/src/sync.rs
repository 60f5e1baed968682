//! Incident status synchronisation.
//!
//! Once a patrol group exists for an incident, the incident's status is a
//! function of its groups and nothing else writes it. [`apply`] is the reducer
//! backends call inside the transaction of every patrol mutation; [`reconcile`]
//! states the same rules over a full set of groups and backs the read-side
//! [`PatrolSummary`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  incident::IncidentStatus,
  patrol::{PatrolGroup, PatrolStatus},
};

/// A patrol mutation that may move the owning incident's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatrolEvent {
  GroupCreated,
  /// A group reached a terminal status (`Completed` or `Cancelled`).
  GroupClosed(PatrolStatus),
}

/// Compute the incident status after `event`.
///
/// `other_active` is the number of non-terminal groups referencing the
/// incident, not counting the group that triggered the event. Returns
/// `Ok(None)` when the status stays as it is. An `Err` means the stored state
/// no longer matches the rules and the surrounding transaction must be rolled
/// back.
pub fn apply(
  incident_id: Uuid,
  current: IncidentStatus,
  event: PatrolEvent,
  other_active: usize,
) -> Result<Option<IncidentStatus>> {
  use IncidentStatus::*;

  let inconsistent = |message: String| Error::Consistency { incident_id, message };

  match event {
    PatrolEvent::GroupCreated => match current {
      Verified => Ok(Some(InProgress)),
      InProgress => Ok(None),
      other => Err(inconsistent(format!("patrol created while incident is {other}"))),
    },
    PatrolEvent::GroupClosed(closed) => {
      if current != InProgress {
        return Err(inconsistent(format!(
          "patrol closed as {closed} while incident is {current}"
        )));
      }
      if other_active > 0 {
        return Ok(None);
      }
      match closed {
        PatrolStatus::Completed => Ok(Some(Resolved)),
        PatrolStatus::Cancelled => Ok(Some(Verified)),
        open => Err(inconsistent(format!("{open} is not a closing status"))),
      }
    }
  }
}

/// The status the sync rules imply for an incident with `groups`.
///
/// With no groups the review status stands. Any open group means
/// `InProgress`. When every group is closed, the most recently closed one
/// decides between `Resolved` and `Verified`.
pub fn reconcile<'a, I>(current: IncidentStatus, groups: I) -> IncidentStatus
where
  I: IntoIterator<Item = &'a PatrolGroup>,
{
  let mut last_closed: Option<&PatrolGroup> = None;
  let mut any = false;
  for group in groups {
    any = true;
    if group.is_active() {
      return IncidentStatus::InProgress;
    }
    if last_closed.is_none_or(|prev| group.updated_at >= prev.updated_at) {
      last_closed = Some(group);
    }
  }
  match last_closed {
    _ if !any => current,
    Some(g) if g.status == PatrolStatus::Completed => IncidentStatus::Resolved,
    _ => IncidentStatus::Verified,
  }
}

/// Per-incident view of patrol activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatrolSummary {
  pub incident_id:       Uuid,
  /// As stored.
  pub incident_status:   IncidentStatus,
  /// As implied by [`reconcile`]; equal to `incident_status` unless the store
  /// has been tampered with outside this engine.
  pub reconciled_status: IncidentStatus,
  pub active:            usize,
  pub completed:         usize,
  pub cancelled:         usize,
}

impl PatrolSummary {
  pub fn build(
    incident_id: Uuid,
    incident_status: IncidentStatus,
    groups: &[PatrolGroup],
  ) -> Self {
    let count = |status: PatrolStatus| groups.iter().filter(|g| g.status == status).count();
    Self {
      incident_id,
      incident_status,
      reconciled_status: reconcile(incident_status, groups),
      active: groups.iter().filter(|g| g.is_active()).count(),
      completed: count(PatrolStatus::Completed),
      cancelled: count(PatrolStatus::Cancelled),
    }
  }

  pub fn in_sync(&self) -> bool { self.incident_status == self.reconciled_status }
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, NaiveTime, TimeDelta, Utc};

  use super::*;
  use crate::window::TimeWindow;

  fn group(status: PatrolStatus, closed_secs_ago: i64) -> PatrolGroup {
    let now = Utc::now();
    PatrolGroup {
      group_id: Uuid::new_v4(),
      incident_id: Uuid::nil(),
      staff_ids: [Uuid::new_v4()].into_iter().collect(),
      window: TimeWindow::new(
        NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
        NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
      ),
      status,
      notes: String::new(),
      created_at: now - TimeDelta::hours(1),
      updated_at: now - TimeDelta::seconds(closed_secs_ago),
    }
  }

  #[test]
  fn creation_promotes_verified_incident() {
    let id = Uuid::nil();
    use IncidentStatus::*;
    assert_eq!(apply(id, Verified, PatrolEvent::GroupCreated, 0).unwrap(), Some(InProgress));
    assert_eq!(apply(id, InProgress, PatrolEvent::GroupCreated, 1).unwrap(), None);
    assert!(matches!(
      apply(id, Pending, PatrolEvent::GroupCreated, 0),
      Err(Error::Consistency { .. })
    ));
  }

  #[test]
  fn closing_last_group_resolves_or_reverts() {
    use IncidentStatus::*;
    let id = Uuid::nil();
    let completed = PatrolEvent::GroupClosed(PatrolStatus::Completed);
    let cancelled = PatrolEvent::GroupClosed(PatrolStatus::Cancelled);

    assert_eq!(apply(id, InProgress, completed, 0).unwrap(), Some(Resolved));
    assert_eq!(apply(id, InProgress, cancelled, 0).unwrap(), Some(Verified));
    assert_eq!(apply(id, InProgress, completed, 1).unwrap(), None);
    assert_eq!(apply(id, InProgress, cancelled, 2).unwrap(), None);
  }

  #[test]
  fn closing_against_unexpected_status_is_inconsistent() {
    let id = Uuid::nil();
    let err = apply(
      id,
      IncidentStatus::Verified,
      PatrolEvent::GroupClosed(PatrolStatus::Completed),
      0,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Consistency { .. }));
    assert!(apply(
      id,
      IncidentStatus::InProgress,
      PatrolEvent::GroupClosed(PatrolStatus::Scheduled),
      0
    )
    .is_err());
  }

  #[test]
  fn reconcile_follows_the_same_rules() {
    use IncidentStatus::*;
    assert_eq!(reconcile(Verified, &[]), Verified);
    assert_eq!(reconcile(Pending, &[]), Pending);

    let open = group(PatrolStatus::Scheduled, 0);
    let done = group(PatrolStatus::Completed, 10);
    let dropped = group(PatrolStatus::Cancelled, 20);

    assert_eq!(reconcile(Verified, [&open, &done]), InProgress);
    assert_eq!(reconcile(Verified, [&done, &dropped]), Resolved);
    assert_eq!(reconcile(Verified, [&dropped]), Verified);

    let late_cancel = group(PatrolStatus::Cancelled, 1);
    assert_eq!(reconcile(Resolved, [&done, &late_cancel]), Verified);
  }

  #[test]
  fn summary_counts_groups() {
    let groups = vec![
      group(PatrolStatus::InProgress, 0),
      group(PatrolStatus::Completed, 5),
      group(PatrolStatus::Cancelled, 6),
    ];
    let summary = PatrolSummary::build(Uuid::nil(), IncidentStatus::InProgress, &groups);
    assert_eq!((summary.active, summary.completed, summary.cancelled), (1, 1, 1));
    assert!(summary.in_sync());
  }
}
