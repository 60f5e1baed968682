//! Error types for `patrol-core`.
//!
//! Every variant describes a rejected operation. None of them is fatal to the
//! process, and none of them implies that anything was written.

use thiserror::Error;
use uuid::Uuid;

use crate::conflict::StaffConflict;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("incident not found: {0}")]
  IncidentNotFound(Uuid),

  #[error("patrol group not found: {0}")]
  GroupNotFound(Uuid),

  #[error("staff member not found: {0}")]
  StaffNotFound(Uuid),

  /// Input rejected before any write was attempted.
  #[error("invalid {field}: {message}")]
  Validation {
    field:   &'static str,
    message: String,
  },

  /// One or more staff members are already booked in an overlapping window.
  #[error("{} staff assignment(s) overlap an existing patrol", .0.len())]
  Conflict(Vec<StaffConflict>),

  /// Removing the member would leave a non-terminal group empty. The group
  /// has to be cancelled instead.
  #[error("cannot remove the last staff member")]
  LastMember { group_id: Uuid },

  /// The incident status could not be brought in line with its patrol
  /// groups. The triggering write has been rolled back.
  #[error("incident {incident_id} status out of sync: {message}")]
  Consistency {
    incident_id: Uuid,
    message:     String,
  },
}

impl Error {
  pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
    Self::Validation { field, message: message.into() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
