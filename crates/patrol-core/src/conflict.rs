//! Double-booking detection.
//!
//! [`ConflictDetector::check`] is a pure function over the patrol groups a
//! backend hands it. Backends must call it with groups read inside the same
//! write transaction that will persist the result; the advisory pre-flight
//! endpoint runs the identical check without writing.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  patrol::PatrolGroup,
  window::{SlotLength, TimeWindow},
};

/// A staff member who is already booked by `group_id` in an overlapping window.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct StaffConflict {
  pub staff_id: Uuid,
  pub group_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
  pub has_conflict: bool,
  /// Sorted by staff id, then group id.
  pub conflicts:    Vec<StaffConflict>,
}

impl ConflictReport {
  fn from_conflicts(mut conflicts: Vec<StaffConflict>) -> Self {
    conflicts.sort_unstable();
    conflicts.dedup();
    Self { has_conflict: !conflicts.is_empty(), conflicts }
  }

  /// `Err(Error::Conflict)` naming every offending member, if any.
  pub fn into_result(self) -> Result<()> {
    if self.has_conflict {
      Err(Error::Conflict(self.conflicts))
    } else {
      Ok(())
    }
  }
}

/// Parameters for a conflict check.
#[derive(Debug, Clone, Deserialize)]
pub struct ConflictQuery {
  pub staff_ids:        BTreeSet<Uuid>,
  #[serde(flatten)]
  pub window:           TimeWindow,
  /// The group being edited, which must not conflict with itself.
  pub exclude_group_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector {
  slot: SlotLength,
}

impl ConflictDetector {
  pub fn new(slot: SlotLength) -> Self { Self { slot } }

  pub fn slot(&self) -> SlotLength { self.slot }

  /// Report every `(staff, group)` pair where a candidate is already a member
  /// of a non-terminal group whose window overlaps `window`.
  pub fn check<'a, I>(
    &self,
    candidates: &BTreeSet<Uuid>,
    window: &TimeWindow,
    exclude_group_id: Option<Uuid>,
    groups: I,
  ) -> ConflictReport
  where
    I: IntoIterator<Item = &'a PatrolGroup>,
  {
    let conflicts = groups
      .into_iter()
      .filter(|g| g.is_active())
      .filter(|g| Some(g.group_id) != exclude_group_id)
      .filter(|g| g.window.overlaps(window, self.slot))
      .flat_map(|g| {
        g.staff_ids.intersection(candidates).map(|&staff_id| StaffConflict {
          staff_id,
          group_id: g.group_id,
        })
      })
      .collect();
    ConflictReport::from_conflicts(conflicts)
  }

  /// Validate the query shape, then run [`Self::check`].
  pub fn check_query<'a, I>(
    &self,
    query: &ConflictQuery,
    groups: I,
  ) -> Result<ConflictReport>
  where
    I: IntoIterator<Item = &'a PatrolGroup>,
  {
    if query.staff_ids.is_empty() {
      return Err(Error::validation(
        "staff_ids",
        "at least one staff member is required",
      ));
    }
    Ok(self.check(&query.staff_ids, &query.window, query.exclude_group_id, groups))
  }
}
