//! The `PatrolStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `patrol-store-sqlite`).
//! Higher layers (`patrol-api`, `patrol-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  conflict::{ConflictQuery, ConflictReport},
  incident::{Incident, IncidentStatus, NewIncident, ReviewDecision},
  patrol::{GroupQuery, NewPatrolGroup, PatrolGroup, PatrolGroupView, PatrolStatus},
  staff::{NewStaffMember, StaffMember},
  sync::PatrolSummary,
};

/// A backend error that may wrap a domain [`crate::Error`].
///
/// Lets callers tell a rejected operation (conflict, validation, …) apart from
/// an infrastructure failure without knowing the backend.
pub trait StoreError: std::error::Error + Send + Sync + Sized + 'static {
  /// The domain error, or `self` back if this is a backend failure.
  fn into_domain(self) -> Result<crate::Error, Self>;
}

/// Abstraction over a patrol scheduling backend.
///
/// Every mutating patrol operation is atomic: the conflict check, the write,
/// and the incident status synchronisation either all commit or none do.
/// Backends must serialise the conflict read with the write so two concurrent
/// requests can never both book the same staff member in overlapping windows.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait PatrolStore: Send + Sync {
  type Error: StoreError;

  // ── Staff directory ───────────────────────────────────────────────────

  fn add_staff(
    &self,
    input: NewStaffMember,
  ) -> impl Future<Output = Result<StaffMember, Self::Error>> + Send + '_;

  fn get_staff(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<StaffMember>, Self::Error>> + Send + '_;

  fn list_staff(
    &self,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<StaffMember>, Self::Error>> + Send + '_;

  /// Activate or deactivate a staff member. Existing assignments are kept.
  fn set_staff_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> impl Future<Output = Result<StaffMember, Self::Error>> + Send + '_;

  /// `false` for unknown ids as well as inactive staff.
  fn is_staff_active(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Incidents ─────────────────────────────────────────────────────────

  /// File a new report; it starts out `Pending`.
  fn report_incident(
    &self,
    input: NewIncident,
  ) -> impl Future<Output = Result<Incident, Self::Error>> + Send + '_;

  fn get_incident(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Incident>, Self::Error>> + Send + '_;

  fn list_incidents(
    &self,
    status: Option<IncidentStatus>,
  ) -> impl Future<Output = Result<Vec<Incident>, Self::Error>> + Send + '_;

  /// Apply an administrative review decision.
  ///
  /// Refused once any patrol group references the incident: from then on its
  /// status belongs to the synchronisation engine.
  fn review_incident(
    &self,
    id: Uuid,
    decision: ReviewDecision,
  ) -> impl Future<Output = Result<Incident, Self::Error>> + Send + '_;

  /// Delete an incident that no patrol group references.
  fn delete_incident(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Patrol groups ─────────────────────────────────────────────────────

  /// Advisory, read-only conflict check. Uses the same algorithm as the
  /// authoritative check inside [`Self::create_group`].
  fn check_conflict<'a>(
    &'a self,
    query: &'a ConflictQuery,
  ) -> impl Future<Output = Result<ConflictReport, Self::Error>> + Send + 'a;

  /// Create a group with its full staff set and promote the incident.
  fn create_group(
    &self,
    input: NewPatrolGroup,
  ) -> impl Future<Output = Result<PatrolGroup, Self::Error>> + Send + '_;

  /// Retrieve a group together with the live incident status.
  fn get_group(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<PatrolGroupView>, Self::Error>> + Send + '_;

  fn list_groups<'a>(
    &'a self,
    query: &'a GroupQuery,
  ) -> impl Future<Output = Result<Vec<PatrolGroup>, Self::Error>> + Send + 'a;

  /// Advance the group's status and synchronise the incident.
  fn update_status(
    &self,
    id: Uuid,
    status: PatrolStatus,
  ) -> impl Future<Output = Result<PatrolGroup, Self::Error>> + Send + '_;

  /// Add one staff member after checking them against the group's window.
  fn add_staff_member(
    &self,
    group_id: Uuid,
    staff_id: Uuid,
  ) -> impl Future<Output = Result<PatrolGroup, Self::Error>> + Send + '_;

  /// Remove one staff member. Never empties a group.
  fn remove_staff_member(
    &self,
    group_id: Uuid,
    staff_id: Uuid,
  ) -> impl Future<Output = Result<PatrolGroup, Self::Error>> + Send + '_;

  /// Patrol activity for an incident. Returns `None` if it does not exist.
  fn patrol_summary(
    &self,
    incident_id: Uuid,
  ) -> impl Future<Output = Result<Option<PatrolSummary>, Self::Error>> + Send + '_;
}
