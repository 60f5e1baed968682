//! JSON REST API for patrol scheduling.
//!
//! Exposes an axum [`Router`] backed by any [`patrol_core::store::PatrolStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", patrol_api::api_router(store.clone()))
//! ```
//!
//! # Status codes
//!
//! | Code | When |
//! |------|------|
//! | 201  | A staff member, incident, or patrol group was created |
//! | 400  | Malformed body or input, unknown or inactive staff, unschedulable incident |
//! | 404  | The id in the path does not exist |
//! | 409  | Double-booking, or removing a group's last staff member |
//! | 500  | Storage failure or an incident status mismatch (rolled back) |
//!
//! Every error a handler returns has a JSON body; 400s carry the offending
//! `field` when known, including bodies that fail to deserialise.
//!
//! # Field names
//!
//! Bodies use snake_case throughout. A group's id is `group_id` (clients
//! written against camelCase names map `id` to `group_id`, `staffIds` to
//! `staff_ids`, `remainingStaffIds` to `remaining_staff_ids` and
//! `incidentStatus` to `incident_status`). A window is flattened into the
//! body as `date` (`YYYY-MM-DD`) and `time` (`HH:MM:SS`).

pub mod error;
pub mod extract;
pub mod incidents;
pub mod patrol_groups;
pub mod staff;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use patrol_core::store::PatrolStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: PatrolStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // Staff
    .route("/staff", get(staff::list::<S>).post(staff::create::<S>))
    .route("/staff/{id}", get(staff::get_one::<S>).put(staff::set_active::<S>))
    // Incidents
    .route("/incidents", get(incidents::list::<S>).post(incidents::create::<S>))
    .route(
      "/incidents/{id}",
      get(incidents::get_one::<S>).delete(incidents::delete_one::<S>),
    )
    .route("/incidents/{id}/review", post(incidents::review::<S>))
    .route("/incidents/{id}/patrol", get(incidents::patrol::<S>))
    // Patrol groups
    .route(
      "/patrol-groups",
      get(patrol_groups::list::<S>).post(patrol_groups::create::<S>),
    )
    .route(
      "/patrol-groups/conflict-check",
      post(patrol_groups::conflict_check::<S>),
    )
    .route(
      "/patrol-groups/{id}",
      get(patrol_groups::get_one::<S>).put(patrol_groups::update_status::<S>),
    )
    .route("/patrol-groups/{id}/staff", post(patrol_groups::add_staff::<S>))
    .route(
      "/patrol-groups/{id}/staff/{staff_id}",
      delete(patrol_groups::remove_staff::<S>),
    )
    .with_state(store)
}
