//! Incidents — citizen-reported animal-control cases.
//!
//! An incident is moved through two independent state machines. Administrative
//! review ([`ReviewDecision`]) handles Pending → Verified/Rejected/Cancelled
//! and is locked once a patrol has been scheduled. From then on the status is
//! owned by [`crate::sync`], which mirrors the patrol groups referencing it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
  Pending,
  Verified,
  Rejected,
  InProgress,
  Resolved,
  Cancelled,
}

impl IncidentStatus {
  /// Whether a new patrol group may be attached to an incident in this state.
  ///
  /// `InProgress` is included: several independent dispatches to one incident
  /// are allowed as long as their staff do not collide.
  pub fn is_schedulable(self) -> bool {
    matches!(self, Self::Verified | Self::InProgress)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Verified => "verified",
      Self::Rejected => "rejected",
      Self::InProgress => "in_progress",
      Self::Resolved => "resolved",
      Self::Cancelled => "cancelled",
    }
  }
}

impl std::fmt::Display for IncidentStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for IncidentStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "pending" => Ok(Self::Pending),
      "verified" => Ok(Self::Verified),
      "rejected" => Ok(Self::Rejected),
      "in_progress" => Ok(Self::InProgress),
      "resolved" => Ok(Self::Resolved),
      "cancelled" => Ok(Self::Cancelled),
      other => Err(Error::validation(
        "status",
        format!("unknown incident status {other:?}"),
      )),
    }
  }
}

// ─── Review ──────────────────────────────────────────────────────────────────

/// An administrative decision on a reported incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
  Verify,
  Reject,
  Cancel,
}

impl ReviewDecision {
  /// The status the decision leads to from `current`.
  ///
  /// Callers must additionally refuse the review once any patrol group
  /// references the incident.
  pub fn apply(self, current: IncidentStatus) -> Result<IncidentStatus> {
    use IncidentStatus::*;
    match (self, current) {
      (Self::Verify, Pending) => Ok(Verified),
      (Self::Reject, Pending) => Ok(Rejected),
      (Self::Cancel, Pending | Verified) => Ok(Cancelled),
      (decision, current) => Err(Error::validation(
        "decision",
        format!("cannot {decision:?} an incident that is {current}")
          .to_lowercase(),
      )),
    }
  }
}

// ─── Incident ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
  pub incident_id: Uuid,
  pub status:      IncidentStatus,
  pub summary:     String,
  pub location:    Option<String>,
  /// Free-text contact for the citizen who filed the report.
  pub reporter:    Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::PatrolStore::report_incident`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewIncident {
  pub summary:  String,
  pub location: Option<String>,
  pub reporter: Option<String>,
}

impl NewIncident {
  pub fn new(summary: impl Into<String>) -> Self {
    Self { summary: summary.into(), location: None, reporter: None }
  }

  pub fn validate(&self) -> Result<()> {
    if self.summary.trim().is_empty() {
      return Err(Error::validation("summary", "must not be blank"));
    }
    Ok(())
  }
}
