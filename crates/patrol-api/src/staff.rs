//! Handlers for `/staff` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/staff` | Optional `?active=true` |
//! | `POST` | `/staff` | Body: `{"display_name":"..."}` |
//! | `GET`  | `/staff/:id` | 404 if not found |
//! | `PUT`  | `/staff/:id` | Body: `{"active":false}` |

use std::sync::Arc;

use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use patrol_core::{
  staff::{NewStaffMember, StaffMember},
  store::PatrolStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, extract::Json};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub active: bool,
}

/// `GET /staff[?active=true]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<StaffMember>>, ApiError>
where
  S: PatrolStore,
{
  let staff = store
    .list_staff(params.active)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(staff))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /staff` — body: `{"display_name":"A. Catcher"}`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewStaffMember>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PatrolStore,
{
  let staff = store.add_staff(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(staff)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /staff/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<StaffMember>, ApiError>
where
  S: PatrolStore,
{
  let staff = store
    .get_staff(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("staff member {id} not found")))?;
  Ok(Json(staff))
}

// ─── Availability ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
  pub active: bool,
}

/// `PUT /staff/:id` — body: `{"active":false}`
pub async fn set_active<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ActiveBody>,
) -> Result<Json<StaffMember>, ApiError>
where
  S: PatrolStore,
{
  let staff = store
    .set_staff_active(id, body.active)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(staff))
}
