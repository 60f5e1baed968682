//! Handlers for `/patrol-groups` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/patrol-groups` | Optional `incident_id`, `staff_id`, `date`, `status` |
//! | `POST`   | `/patrol-groups` | Body: [`NewPatrolGroup`]; 201, 400, or 409 with conflicts |
//! | `POST`   | `/patrol-groups/conflict-check` | Advisory; never writes |
//! | `GET`    | `/patrol-groups/:id` | Includes the live `incident_status` |
//! | `PUT`    | `/patrol-groups/:id` | Body: `{"status":"in_progress"}` |
//! | `POST`   | `/patrol-groups/:id/staff` | Body: `{"staff_id":"..."}` |
//! | `DELETE` | `/patrol-groups/:id/staff/:staff_id` | 409 when it would empty the group |

use std::sync::Arc;

use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use patrol_core::{
  conflict::{ConflictQuery, ConflictReport},
  patrol::{GroupQuery, NewPatrolGroup, PatrolGroup, PatrolGroupView, PatrolStatus},
  store::PatrolStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, extract::Json};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /patrol-groups[?incident_id=...][&staff_id=...][&date=YYYY-MM-DD][&status=...]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(query): Query<GroupQuery>,
) -> Result<Json<Vec<PatrolGroup>>, ApiError>
where
  S: PatrolStore,
{
  let groups = store.list_groups(&query).await.map_err(ApiError::store)?;
  Ok(Json(groups))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /patrol-groups` — returns 201 + the scheduled group.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewPatrolGroup>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PatrolStore,
{
  let group = store.create_group(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(group)))
}

// ─── Conflict pre-flight ──────────────────────────────────────────────────────

/// `POST /patrol-groups/conflict-check`
pub async fn conflict_check<S>(
  State(store): State<Arc<S>>,
  Json(query): Json<ConflictQuery>,
) -> Result<Json<ConflictReport>, ApiError>
where
  S: PatrolStore,
{
  let report = store.check_conflict(&query).await.map_err(ApiError::store)?;
  Ok(Json(report))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /patrol-groups/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<PatrolGroupView>, ApiError>
where
  S: PatrolStore,
{
  let view = store
    .get_group(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("patrol group {id} not found")))?;
  Ok(Json(view))
}

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: PatrolStatus,
}

/// `PUT /patrol-groups/:id` — body: `{"status":"completed"}`
pub async fn update_status<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<PatrolGroup>, ApiError>
where
  S: PatrolStore,
{
  let group = store
    .update_status(id, body.status)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(group))
}

// ─── Membership ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AddStaffBody {
  pub staff_id: Uuid,
}

/// `POST /patrol-groups/:id/staff` — body: `{"staff_id":"..."}`
pub async fn add_staff<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AddStaffBody>,
) -> Result<Json<PatrolGroup>, ApiError>
where
  S: PatrolStore,
{
  let group = store
    .add_staff_member(id, body.staff_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(group))
}

#[derive(Debug, Serialize)]
pub struct RemainingStaff {
  pub group_id:            Uuid,
  pub remaining_staff_ids: Vec<Uuid>,
}

/// `DELETE /patrol-groups/:id/staff/:staff_id`
pub async fn remove_staff<S>(
  State(store): State<Arc<S>>,
  Path((id, staff_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<RemainingStaff>, ApiError>
where
  S: PatrolStore,
{
  let group = store
    .remove_staff_member(id, staff_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(RemainingStaff {
    group_id:            group.group_id,
    remaining_staff_ids: group.staff_ids.into_iter().collect(),
  }))
}
