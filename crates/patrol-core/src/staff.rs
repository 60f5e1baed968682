//! Field staff ("catchers") who can be assigned to patrol groups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
  pub staff_id:     Uuid,
  pub display_name: String,
  /// Inactive staff keep their existing assignments but cannot be scheduled.
  pub active:       bool,
  pub created_at:   DateTime<Utc>,
}

/// Input to [`crate::store::PatrolStore::add_staff`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewStaffMember {
  pub display_name: String,
}

impl NewStaffMember {
  pub fn new(display_name: impl Into<String>) -> Self {
    Self { display_name: display_name.into() }
  }

  pub fn validate(&self) -> Result<()> {
    if self.display_name.trim().is_empty() {
      return Err(Error::validation("display_name", "must not be blank"));
    }
    Ok(())
  }
}
