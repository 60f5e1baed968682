//! Synchronous operations run on the connection thread.
//!
//! Each public function here is one unit of work passed to
//! [`tokio_rusqlite::Connection::call`]. Mutations open a `BEGIN IMMEDIATE`
//! transaction through [`immediate`]; the conflict read, the group write and
//! the incident status update all happen inside it, and any error rolls the
//! whole unit back.

use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};
use patrol_core::{
  Error as CoreError,
  conflict::ConflictDetector,
  incident::{Incident, IncidentStatus, NewIncident, ReviewDecision},
  patrol::{GroupQuery, NewPatrolGroup, PatrolGroup, PatrolGroupView, PatrolStatus},
  staff::{NewStaffMember, StaffMember},
  sync::{self, PatrolEvent, PatrolSummary},
};
use rusqlite::{Connection, OptionalExtension as _, Transaction, TransactionBehavior, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{RawGroup, RawIncident, RawStaff, encode_date, encode_dt, encode_time, encode_uuid},
};

// ─── Transaction scope ───────────────────────────────────────────────────────

/// Run `f` inside a write-locked transaction; commit on `Ok`, roll back on
/// `Err`.
fn immediate<T>(
  conn: &mut Connection,
  op: &'static str,
  f: impl FnOnce(&Transaction<'_>) -> Result<T>,
) -> Result<T> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  match f(&tx) {
    Ok(value) => {
      tx.commit()?;
      tracing::debug!(op, "committed");
      Ok(value)
    }
    Err(err) => {
      if let Err(rollback) = tx.rollback() {
        tracing::warn!(op, error = %rollback, "rollback failed");
      }
      tracing::debug!(op, error = %err, "rolled back");
      Err(err)
    }
  }
}

/// Run `f` inside a deferred transaction so multi-statement reads see one
/// snapshot.
fn snapshot<T>(
  conn: &mut Connection,
  f: impl FnOnce(&Transaction<'_>) -> Result<T>,
) -> Result<T> {
  let tx = conn.transaction()?;
  let value = f(&tx)?;
  tx.commit()?;
  Ok(value)
}

// ─── Reads ───────────────────────────────────────────────────────────────────

pub fn load_incident(conn: &Connection, id: Uuid) -> Result<Option<Incident>> {
  let raw = conn
    .query_row(
      &format!("SELECT {} FROM incidents WHERE incident_id = ?1", RawIncident::COLUMNS),
      params![encode_uuid(id)],
      RawIncident::from_row,
    )
    .optional()?;
  raw.map(RawIncident::into_incident).transpose()
}

pub fn list_incidents(
  conn: &Connection,
  status: Option<IncidentStatus>,
) -> Result<Vec<Incident>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM incidents
     WHERE (?1 IS NULL OR status = ?1)
     ORDER BY created_at, incident_id",
    RawIncident::COLUMNS
  ))?;
  let raws = stmt
    .query_map(params![status.map(IncidentStatus::as_str)], RawIncident::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawIncident::into_incident).collect()
}

pub fn load_staff(conn: &Connection, id: Uuid) -> Result<Option<StaffMember>> {
  let raw = conn
    .query_row(
      &format!("SELECT {} FROM staff WHERE staff_id = ?1", RawStaff::COLUMNS),
      params![encode_uuid(id)],
      RawStaff::from_row,
    )
    .optional()?;
  raw.map(RawStaff::into_staff).transpose()
}

pub fn list_staff(conn: &Connection, active_only: bool) -> Result<Vec<StaffMember>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM staff
     WHERE (?1 = 0 OR active = 1)
     ORDER BY display_name, staff_id",
    RawStaff::COLUMNS
  ))?;
  let raws = stmt
    .query_map(params![active_only], RawStaff::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawStaff::into_staff).collect()
}

/// `None` if the staff member does not exist.
pub fn staff_active(conn: &Connection, id: Uuid) -> Result<Option<bool>> {
  Ok(
    conn
      .query_row(
        "SELECT active FROM staff WHERE staff_id = ?1",
        params![encode_uuid(id)],
        |r| r.get(0),
      )
      .optional()?,
  )
}

fn load_members(conn: &Connection, group_id: &str) -> Result<Vec<String>> {
  let mut stmt = conn.prepare_cached(
    "SELECT staff_id FROM patrol_group_staff WHERE group_id = ?1 ORDER BY staff_id",
  )?;
  let ids = stmt
    .query_map(params![group_id], |r| r.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;
  Ok(ids)
}

fn hydrate(conn: &Connection, raws: Vec<RawGroup>) -> Result<Vec<PatrolGroup>> {
  raws
    .into_iter()
    .map(|raw| {
      let members = load_members(conn, &raw.group_id)?;
      raw.into_group(members)
    })
    .collect()
}

pub fn load_group(conn: &Connection, id: Uuid) -> Result<Option<PatrolGroup>> {
  let raw = conn
    .query_row(
      &format!("SELECT {} FROM patrol_groups g WHERE g.group_id = ?1", RawGroup::COLUMNS),
      params![encode_uuid(id)],
      RawGroup::from_row,
    )
    .optional()?;
  Ok(hydrate(conn, raw.into_iter().collect())?.pop())
}

pub fn list_groups(conn: &Connection, query: &GroupQuery) -> Result<Vec<PatrolGroup>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM patrol_groups g
     WHERE (?1 IS NULL OR g.incident_id = ?1)
       AND (?2 IS NULL OR g.group_id IN
             (SELECT group_id FROM patrol_group_staff WHERE staff_id = ?2))
       AND (?3 IS NULL OR g.scheduled_date = ?3)
       AND (?4 IS NULL OR g.status = ?4)
     ORDER BY g.scheduled_date, g.scheduled_time, g.created_at",
    RawGroup::COLUMNS
  ))?;
  let raws = stmt
    .query_map(
      params![
        query.incident_id.map(encode_uuid),
        query.staff_id.map(encode_uuid),
        query.date.map(encode_date),
        query.status.map(PatrolStatus::as_str),
      ],
      RawGroup::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  hydrate(conn, raws)
}

/// Non-terminal groups on `date`: the only rows a conflict check can hit.
pub fn active_groups_on(conn: &Connection, date: NaiveDate) -> Result<Vec<PatrolGroup>> {
  let mut stmt = conn.prepare_cached(&format!(
    "SELECT {} FROM patrol_groups g
     WHERE g.scheduled_date = ?1 AND g.status IN ('scheduled', 'in_progress')",
    RawGroup::COLUMNS
  ))?;
  let raws = stmt
    .query_map(params![encode_date(date)], RawGroup::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  hydrate(conn, raws)
}

/// [`active_groups_on`] read under one snapshot, for checks made outside a
/// write transaction.
pub fn booked_on(conn: &mut Connection, date: NaiveDate) -> Result<Vec<PatrolGroup>> {
  snapshot(conn, |tx| active_groups_on(tx, date))
}

fn count_groups_for(conn: &Connection, incident_id: Uuid) -> Result<usize> {
  let n: i64 = conn.query_row(
    "SELECT COUNT(*) FROM patrol_groups WHERE incident_id = ?1",
    params![encode_uuid(incident_id)],
    |r| r.get(0),
  )?;
  Ok(n as usize)
}

fn count_other_active(conn: &Connection, incident_id: Uuid, group_id: Uuid) -> Result<usize> {
  let n: i64 = conn.query_row(
    "SELECT COUNT(*) FROM patrol_groups
     WHERE incident_id = ?1 AND group_id != ?2
       AND status IN ('scheduled', 'in_progress')",
    params![encode_uuid(incident_id), encode_uuid(group_id)],
    |r| r.get(0),
  )?;
  Ok(n as usize)
}

pub fn group_view(conn: &mut Connection, id: Uuid) -> Result<Option<PatrolGroupView>> {
  snapshot(conn, |tx| {
    let Some(group) = load_group(tx, id)? else {
      return Ok(None);
    };
    let incident = load_incident(tx, group.incident_id)?.ok_or_else(|| {
      CoreError::Consistency {
        incident_id: group.incident_id,
        message:     format!("patrol group {id} references a missing incident"),
      }
    })?;
    Ok(Some(PatrolGroupView { group, incident_status: incident.status }))
  })
}

pub fn patrol_summary(conn: &mut Connection, incident_id: Uuid) -> Result<Option<PatrolSummary>> {
  snapshot(conn, |tx| {
    let Some(incident) = load_incident(tx, incident_id)? else {
      return Ok(None);
    };
    let groups = list_groups(tx, &GroupQuery { incident_id: Some(incident_id), ..Default::default() })?;
    Ok(Some(PatrolSummary::build(incident_id, incident.status, &groups)))
  })
}

// ─── Writes ──────────────────────────────────────────────────────────────────

fn write_incident_status(
  tx: &Transaction<'_>,
  incident_id: Uuid,
  status: IncidentStatus,
  at: chrono::DateTime<Utc>,
) -> Result<()> {
  let changed = tx.execute(
    "UPDATE incidents SET status = ?2, updated_at = ?3 WHERE incident_id = ?1",
    params![encode_uuid(incident_id), status.as_str(), encode_dt(at)],
  )?;
  if changed != 1 {
    return Err(
      CoreError::Consistency {
        incident_id,
        message: format!("status update touched {changed} rows"),
      }
      .into(),
    );
  }
  Ok(())
}

fn touch_group(tx: &Transaction<'_>, group: &PatrolGroup) -> Result<()> {
  tx.execute(
    "UPDATE patrol_groups SET status = ?2, updated_at = ?3 WHERE group_id = ?1",
    params![encode_uuid(group.group_id), group.status.as_str(), encode_dt(group.updated_at)],
  )?;
  Ok(())
}

fn insert_member(tx: &Transaction<'_>, group_id: Uuid, staff_id: Uuid) -> Result<()> {
  tx.execute(
    "INSERT INTO patrol_group_staff (group_id, staff_id) VALUES (?1, ?2)",
    params![encode_uuid(group_id), encode_uuid(staff_id)],
  )?;
  Ok(())
}

fn insert_group(tx: &Transaction<'_>, group: &PatrolGroup) -> Result<()> {
  tx.execute(
    "INSERT INTO patrol_groups (
       group_id, incident_id, scheduled_date, scheduled_time,
       status, notes, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      encode_uuid(group.group_id),
      encode_uuid(group.incident_id),
      encode_date(group.window.date),
      encode_time(group.window.time),
      group.status.as_str(),
      group.notes,
      encode_dt(group.created_at),
      encode_dt(group.updated_at),
    ],
  )?;
  for staff_id in &group.staff_ids {
    insert_member(tx, group.group_id, *staff_id)?;
  }
  Ok(())
}

/// Reject any id in `staff_ids` that is unknown or inactive, naming them all.
fn ensure_schedulable_staff(tx: &Transaction<'_>, staff_ids: &BTreeSet<Uuid>) -> Result<()> {
  let mut unknown = Vec::new();
  let mut inactive = Vec::new();
  for &id in staff_ids {
    match staff_active(tx, id)? {
      Some(true) => {}
      Some(false) => inactive.push(id.to_string()),
      None => unknown.push(id.to_string()),
    }
  }
  if !unknown.is_empty() {
    return Err(
      CoreError::validation("staff_ids", format!("unknown staff: {}", unknown.join(", "))).into(),
    );
  }
  if !inactive.is_empty() {
    return Err(
      CoreError::validation("staff_ids", format!("inactive staff: {}", inactive.join(", ")))
        .into(),
    );
  }
  Ok(())
}

/// Apply the status sync reducer for `event` on `group`'s incident.
fn sync_incident(tx: &Transaction<'_>, group: &PatrolGroup, event: PatrolEvent) -> Result<()> {
  let incident_id = group.incident_id;
  let incident = load_incident(tx, incident_id)?.ok_or_else(|| CoreError::Consistency {
    incident_id,
    message: format!("patrol group {} references a missing incident", group.group_id),
  })?;
  let other_active = count_other_active(tx, incident_id, group.group_id)?;

  if let Some(next) = sync::apply(incident_id, incident.status, event, other_active)? {
    write_incident_status(tx, incident_id, next, group.updated_at)?;
    tracing::info!(
      %incident_id,
      group_id = %group.group_id,
      from = %incident.status,
      to = %next,
      "incident status synchronised"
    );
  }
  Ok(())
}

fn check_conflicts(
  tx: &Transaction<'_>,
  detector: ConflictDetector,
  candidates: &BTreeSet<Uuid>,
  group: &PatrolGroup,
  exclude: Option<Uuid>,
) -> Result<()> {
  let booked = active_groups_on(tx, group.window.date)?;
  let report = detector.check(candidates, &group.window, exclude, &booked);
  if report.has_conflict {
    tracing::info!(
      incident_id = %group.incident_id,
      conflicts = report.conflicts.len(),
      "patrol rejected: staff double-booked"
    );
  }
  Ok(report.into_result()?)
}

// ─── Staff ───────────────────────────────────────────────────────────────────

pub fn add_staff(conn: &mut Connection, input: NewStaffMember) -> Result<StaffMember> {
  let staff = StaffMember {
    staff_id:     Uuid::new_v4(),
    display_name: input.display_name.trim().to_owned(),
    active:       true,
    created_at:   Utc::now(),
  };
  conn.execute(
    "INSERT INTO staff (staff_id, display_name, active, created_at) VALUES (?1, ?2, ?3, ?4)",
    params![
      encode_uuid(staff.staff_id),
      staff.display_name,
      staff.active,
      encode_dt(staff.created_at)
    ],
  )?;
  Ok(staff)
}

pub fn set_staff_active(conn: &mut Connection, id: Uuid, active: bool) -> Result<StaffMember> {
  immediate(conn, "set_staff_active", |tx| {
    let changed = tx.execute(
      "UPDATE staff SET active = ?2 WHERE staff_id = ?1",
      params![encode_uuid(id), active],
    )?;
    if changed == 0 {
      return Err(CoreError::StaffNotFound(id).into());
    }
    load_staff(tx, id)?.ok_or_else(|| CoreError::StaffNotFound(id).into())
  })
}

// ─── Incidents ───────────────────────────────────────────────────────────────

pub fn report_incident(conn: &mut Connection, input: NewIncident) -> Result<Incident> {
  let now = Utc::now();
  let incident = Incident {
    incident_id: Uuid::new_v4(),
    status:      IncidentStatus::Pending,
    summary:     input.summary.trim().to_owned(),
    location:    input.location,
    reporter:    input.reporter,
    created_at:  now,
    updated_at:  now,
  };
  conn.execute(
    "INSERT INTO incidents (
       incident_id, status, summary, location, reporter, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      encode_uuid(incident.incident_id),
      incident.status.as_str(),
      incident.summary,
      incident.location,
      incident.reporter,
      encode_dt(incident.created_at),
      encode_dt(incident.updated_at),
    ],
  )?;
  Ok(incident)
}

pub fn review_incident(
  conn: &mut Connection,
  id: Uuid,
  decision: ReviewDecision,
) -> Result<Incident> {
  immediate(conn, "review_incident", |tx| {
    let mut incident = load_incident(tx, id)?.ok_or(CoreError::IncidentNotFound(id))?;
    if count_groups_for(tx, id)? > 0 {
      return Err(
        CoreError::validation(
          "incident_id",
          format!("incident {id} has patrol groups; its status follows them"),
        )
        .into(),
      );
    }
    incident.status = decision.apply(incident.status)?;
    incident.updated_at = Utc::now();
    write_incident_status(tx, id, incident.status, incident.updated_at)?;
    Ok(incident)
  })
}

pub fn delete_incident(conn: &mut Connection, id: Uuid) -> Result<()> {
  immediate(conn, "delete_incident", |tx| {
    load_incident(tx, id)?.ok_or(CoreError::IncidentNotFound(id))?;
    if count_groups_for(tx, id)? > 0 {
      return Err(
        CoreError::validation(
          "incident_id",
          format!("incident {id} is referenced by patrol groups"),
        )
        .into(),
      );
    }
    tx.execute("DELETE FROM incidents WHERE incident_id = ?1", params![encode_uuid(id)])?;
    Ok(())
  })
}

// ─── Patrol groups ───────────────────────────────────────────────────────────

pub fn create_group(
  conn: &mut Connection,
  detector: ConflictDetector,
  input: NewPatrolGroup,
) -> Result<PatrolGroup> {
  immediate(conn, "create_group", |tx| {
    let incident_id = input.incident_id;
    let incident = load_incident(tx, incident_id)?.ok_or_else(|| {
      CoreError::validation("incident_id", format!("unknown incident {incident_id}"))
    })?;
    if !incident.status.is_schedulable() {
      return Err(
        CoreError::validation(
          "incident_id",
          format!("incident {incident_id} is {}; only verified or in-progress incidents can be patrolled", incident.status),
        )
        .into(),
      );
    }
    ensure_schedulable_staff(tx, &input.staff_ids)?;

    let now = Utc::now();
    let group = PatrolGroup {
      group_id: Uuid::new_v4(),
      incident_id,
      staff_ids: input.staff_ids,
      window: input.window,
      status: PatrolStatus::Scheduled,
      notes: input.notes,
      created_at: now,
      updated_at: now,
    };
    check_conflicts(tx, detector, &group.staff_ids, &group, None)?;

    insert_group(tx, &group)?;
    sync_incident(tx, &group, PatrolEvent::GroupCreated)?;
    Ok(group)
  })
}

pub fn update_status(
  conn: &mut Connection,
  id: Uuid,
  status: PatrolStatus,
) -> Result<PatrolGroup> {
  immediate(conn, "update_status", |tx| {
    let mut group = load_group(tx, id)?.ok_or(CoreError::GroupNotFound(id))?;
    group.status = group.status.transition(status)?;
    group.updated_at = Utc::now();
    touch_group(tx, &group)?;
    if group.status.is_terminal() {
      sync_incident(tx, &group, PatrolEvent::GroupClosed(group.status))?;
    }
    Ok(group)
  })
}

pub fn add_staff_member(
  conn: &mut Connection,
  detector: ConflictDetector,
  group_id: Uuid,
  staff_id: Uuid,
) -> Result<PatrolGroup> {
  immediate(conn, "add_staff_member", |tx| {
    let mut group = load_group(tx, group_id)?.ok_or(CoreError::GroupNotFound(group_id))?;
    group.ensure_mutable()?;
    if group.staff_ids.contains(&staff_id) {
      return Err(
        CoreError::validation(
          "staff_id",
          format!("{staff_id} is already a member of patrol group {group_id}"),
        )
        .into(),
      );
    }
    let incoming = BTreeSet::from([staff_id]);
    ensure_schedulable_staff(tx, &incoming)?;
    check_conflicts(tx, detector, &incoming, &group, Some(group_id))?;

    insert_member(tx, group_id, staff_id)?;
    group.staff_ids.insert(staff_id);
    group.updated_at = Utc::now();
    touch_group(tx, &group)?;
    Ok(group)
  })
}

pub fn remove_staff_member(
  conn: &mut Connection,
  group_id: Uuid,
  staff_id: Uuid,
) -> Result<PatrolGroup> {
  immediate(conn, "remove_staff_member", |tx| {
    let mut group = load_group(tx, group_id)?.ok_or(CoreError::GroupNotFound(group_id))?;
    group.staff_ids = group.without_member(staff_id)?;
    tx.execute(
      "DELETE FROM patrol_group_staff WHERE group_id = ?1 AND staff_id = ?2",
      params![encode_uuid(group_id), encode_uuid(staff_id)],
    )?;
    group.updated_at = Utc::now();
    touch_group(tx, &group)?;
    Ok(group)
  })
}
