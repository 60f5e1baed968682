//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, scheduled dates and times as
//! `%Y-%m-%d` / `%H:%M:%S` so they sort lexically. Status enums use their
//! snake_case names. UUIDs are stored as hyphenated lowercase strings.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use patrol_core::{
  incident::{Incident, IncidentStatus},
  patrol::{PatrolGroup, PatrolStatus},
  staff::StaffMember,
  window::TimeWindow,
};
use uuid::Uuid;

use crate::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── Scheduled window ─────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn encode_time(t: NaiveTime) -> String { t.format(TIME_FORMAT).to_string() }

pub fn decode_window(date: &str, time: &str) -> Result<TimeWindow> {
  let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
    .map_err(|e| Error::Decode(format!("date {date:?}: {e}")))?;
  let time = NaiveTime::parse_from_str(time, TIME_FORMAT)
    .map_err(|e| Error::Decode(format!("time {time:?}: {e}")))?;
  Ok(TimeWindow::new(date, time))
}

// ─── Statuses ─────────────────────────────────────────────────────────────────

pub fn decode_incident_status(s: &str) -> Result<IncidentStatus> {
  s.parse().map_err(|_| Error::Decode(format!("unknown incident status: {s:?}")))
}

pub fn decode_patrol_status(s: &str) -> Result<PatrolStatus> {
  s.parse().map_err(|_| Error::Decode(format!("unknown patrol status: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `incidents` row.
pub struct RawIncident {
  pub incident_id: String,
  pub status:      String,
  pub summary:     String,
  pub location:    Option<String>,
  pub reporter:    Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawIncident {
  pub const COLUMNS: &'static str =
    "incident_id, status, summary, location, reporter, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      incident_id: row.get(0)?,
      status:      row.get(1)?,
      summary:     row.get(2)?,
      location:    row.get(3)?,
      reporter:    row.get(4)?,
      created_at:  row.get(5)?,
      updated_at:  row.get(6)?,
    })
  }

  pub fn into_incident(self) -> Result<Incident> {
    Ok(Incident {
      incident_id: decode_uuid(&self.incident_id)?,
      status:      decode_incident_status(&self.status)?,
      summary:     self.summary,
      location:    self.location,
      reporter:    self.reporter,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `staff` row.
pub struct RawStaff {
  pub staff_id:     String,
  pub display_name: String,
  pub active:       bool,
  pub created_at:   String,
}

impl RawStaff {
  pub const COLUMNS: &'static str = "staff_id, display_name, active, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      staff_id:     row.get(0)?,
      display_name: row.get(1)?,
      active:       row.get(2)?,
      created_at:   row.get(3)?,
    })
  }

  pub fn into_staff(self) -> Result<StaffMember> {
    Ok(StaffMember {
      staff_id:     decode_uuid(&self.staff_id)?,
      display_name: self.display_name,
      active:       self.active,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read from a `patrol_groups` row. Membership is loaded
/// separately from `patrol_group_staff`.
pub struct RawGroup {
  pub group_id:       String,
  pub incident_id:    String,
  pub scheduled_date: String,
  pub scheduled_time: String,
  pub status:         String,
  pub notes:          String,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawGroup {
  pub const COLUMNS: &'static str = "g.group_id, g.incident_id, g.scheduled_date, \
     g.scheduled_time, g.status, g.notes, g.created_at, g.updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      group_id:       row.get(0)?,
      incident_id:    row.get(1)?,
      scheduled_date: row.get(2)?,
      scheduled_time: row.get(3)?,
      status:         row.get(4)?,
      notes:          row.get(5)?,
      created_at:     row.get(6)?,
      updated_at:     row.get(7)?,
    })
  }

  pub fn into_group(self, staff_ids: Vec<String>) -> Result<PatrolGroup> {
    let staff_ids = staff_ids
      .iter()
      .map(|s| decode_uuid(s))
      .collect::<Result<BTreeSet<_>>>()?;

    Ok(PatrolGroup {
      group_id: decode_uuid(&self.group_id)?,
      incident_id: decode_uuid(&self.incident_id)?,
      staff_ids,
      window: decode_window(&self.scheduled_date, &self.scheduled_time)?,
      status: decode_patrol_status(&self.status)?,
      notes: self.notes,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
