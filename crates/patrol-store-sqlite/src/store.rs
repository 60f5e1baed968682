//! [`SqliteStore`] — the SQLite implementation of [`PatrolStore`].

use std::{path::Path, time::Duration};

use uuid::Uuid;

use patrol_core::{
  conflict::{ConflictDetector, ConflictQuery, ConflictReport},
  incident::{Incident, IncidentStatus, NewIncident, ReviewDecision},
  patrol::{GroupQuery, NewPatrolGroup, PatrolGroup, PatrolGroupView, PatrolStatus},
  staff::{NewStaffMember, StaffMember},
  store::PatrolStore,
  sync::PatrolSummary,
  window::SlotLength,
};

use crate::{Result, schema::SCHEMA, tx};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Tunables fixed for the lifetime of a store.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
  /// The occupied range of every patrol, used by the conflict check.
  pub slot:         SlotLength,
  /// How long a write waits for another connection's lock before failing.
  pub busy_timeout: Duration,
}

impl Default for StoreOptions {
  fn default() -> Self {
    Self {
      slot:         SlotLength::default(),
      busy_timeout: Duration::from_secs(5),
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A patrol store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  detector:        ConflictDetector,
}

impl SqliteStore {
  /// Open (or create) a store at `path` with default options.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, StoreOptions::default()).await
  }

  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, options).await
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, StoreOptions::default()).await
  }

  async fn init(conn: tokio_rusqlite::Connection, options: StoreOptions) -> Result<Self> {
    let busy_timeout = options.busy_timeout;
    conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn, detector: ConflictDetector::new(options.slot) })
  }

  pub fn detector(&self) -> ConflictDetector { self.detector }
}

// ─── PatrolStore impl ────────────────────────────────────────────────────────

impl PatrolStore for SqliteStore {
  type Error = crate::Error;

  // ── Staff directory ───────────────────────────────────────────────────────

  async fn add_staff(&self, input: NewStaffMember) -> Result<StaffMember> {
    input.validate()?;
    let staff = self.conn.call(move |conn| Ok(tx::add_staff(conn, input))).await??;
    tracing::info!(staff_id = %staff.staff_id, "staff member registered");
    Ok(staff)
  }

  async fn get_staff(&self, id: Uuid) -> Result<Option<StaffMember>> {
    self.conn.call(move |conn| Ok(tx::load_staff(conn, id))).await?
  }

  async fn list_staff(&self, active_only: bool) -> Result<Vec<StaffMember>> {
    self.conn.call(move |conn| Ok(tx::list_staff(conn, active_only))).await?
  }

  async fn set_staff_active(&self, id: Uuid, active: bool) -> Result<StaffMember> {
    let staff = self
      .conn
      .call(move |conn| Ok(tx::set_staff_active(conn, id, active)))
      .await??;
    tracing::info!(staff_id = %id, active, "staff availability changed");
    Ok(staff)
  }

  async fn is_staff_active(&self, id: Uuid) -> Result<bool> {
    let active = self.conn.call(move |conn| Ok(tx::staff_active(conn, id))).await??;
    Ok(active.unwrap_or(false))
  }

  // ── Incidents ─────────────────────────────────────────────────────────────

  async fn report_incident(&self, input: NewIncident) -> Result<Incident> {
    input.validate()?;
    let incident = self
      .conn
      .call(move |conn| Ok(tx::report_incident(conn, input)))
      .await??;
    tracing::info!(incident_id = %incident.incident_id, "incident reported");
    Ok(incident)
  }

  async fn get_incident(&self, id: Uuid) -> Result<Option<Incident>> {
    self.conn.call(move |conn| Ok(tx::load_incident(conn, id))).await?
  }

  async fn list_incidents(&self, status: Option<IncidentStatus>) -> Result<Vec<Incident>> {
    self.conn.call(move |conn| Ok(tx::list_incidents(conn, status))).await?
  }

  async fn review_incident(&self, id: Uuid, decision: ReviewDecision) -> Result<Incident> {
    let incident = self
      .conn
      .call(move |conn| Ok(tx::review_incident(conn, id, decision)))
      .await??;
    tracing::info!(incident_id = %id, status = %incident.status, "incident reviewed");
    Ok(incident)
  }

  async fn delete_incident(&self, id: Uuid) -> Result<()> {
    self.conn.call(move |conn| Ok(tx::delete_incident(conn, id))).await??;
    tracing::info!(incident_id = %id, "incident deleted");
    Ok(())
  }

  // ── Patrol groups ─────────────────────────────────────────────────────────

  async fn check_conflict(&self, query: &ConflictQuery) -> Result<ConflictReport> {
    let date = query.window.date;
    let booked = self
      .conn
      .call(move |conn| Ok(tx::booked_on(conn, date)))
      .await??;
    Ok(self.detector.check_query(query, &booked)?)
  }

  async fn create_group(&self, input: NewPatrolGroup) -> Result<PatrolGroup> {
    input.validate()?;
    let detector = self.detector;
    let group = self
      .conn
      .call(move |conn| Ok(tx::create_group(conn, detector, input)))
      .await??;
    tracing::info!(
      group_id = %group.group_id,
      incident_id = %group.incident_id,
      staff = group.staff_ids.len(),
      "patrol group scheduled"
    );
    Ok(group)
  }

  async fn get_group(&self, id: Uuid) -> Result<Option<PatrolGroupView>> {
    self.conn.call(move |conn| Ok(tx::group_view(conn, id))).await?
  }

  async fn list_groups(&self, query: &GroupQuery) -> Result<Vec<PatrolGroup>> {
    let query = query.clone();
    self.conn.call(move |conn| Ok(tx::list_groups(conn, &query))).await?
  }

  async fn update_status(&self, id: Uuid, status: PatrolStatus) -> Result<PatrolGroup> {
    let group = self
      .conn
      .call(move |conn| Ok(tx::update_status(conn, id, status)))
      .await??;
    tracing::info!(group_id = %id, status = %group.status, "patrol group advanced");
    Ok(group)
  }

  async fn add_staff_member(&self, group_id: Uuid, staff_id: Uuid) -> Result<PatrolGroup> {
    let detector = self.detector;
    let group = self
      .conn
      .call(move |conn| Ok(tx::add_staff_member(conn, detector, group_id, staff_id)))
      .await??;
    tracing::info!(%group_id, %staff_id, "staff member added to patrol group");
    Ok(group)
  }

  async fn remove_staff_member(&self, group_id: Uuid, staff_id: Uuid) -> Result<PatrolGroup> {
    let group = self
      .conn
      .call(move |conn| Ok(tx::remove_staff_member(conn, group_id, staff_id)))
      .await??;
    tracing::info!(%group_id, %staff_id, "staff member removed from patrol group");
    Ok(group)
  }

  async fn patrol_summary(&self, incident_id: Uuid) -> Result<Option<PatrolSummary>> {
    self.conn.call(move |conn| Ok(tx::patrol_summary(conn, incident_id))).await?
  }
}
