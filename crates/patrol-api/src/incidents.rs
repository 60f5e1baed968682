//! Handlers for `/incidents` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/incidents` | Optional `?status=verified` |
//! | `POST`   | `/incidents` | Body: `{"summary":"...","location":"...","reporter":"..."}` |
//! | `GET`    | `/incidents/:id` | 404 if not found |
//! | `DELETE` | `/incidents/:id` | 204; 400 once patrols exist |
//! | `POST`   | `/incidents/:id/review` | Body: `{"decision":"verify\|reject\|cancel"}` |
//! | `GET`    | `/incidents/:id/patrol` | Patrol counts and the reconciled status |

use std::sync::Arc;

use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use patrol_core::{
  incident::{Incident, IncidentStatus, NewIncident, ReviewDecision},
  store::PatrolStore,
  sync::PatrolSummary,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, extract::Json};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<IncidentStatus>,
}

/// `GET /incidents[?status=<status>]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Incident>>, ApiError>
where
  S: PatrolStore,
{
  let incidents = store
    .list_incidents(params.status)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(incidents))
}

// ─── Report ───────────────────────────────────────────────────────────────────

/// `POST /incidents` — returns 201 + the pending incident.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewIncident>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PatrolStore,
{
  let incident = store.report_incident(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(incident)))
}

// ─── Get / delete ─────────────────────────────────────────────────────────────

/// `GET /incidents/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Incident>, ApiError>
where
  S: PatrolStore,
{
  let incident = store
    .get_incident(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("incident {id} not found")))?;
  Ok(Json(incident))
}

/// `DELETE /incidents/:id`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: PatrolStore,
{
  store.delete_incident(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Review ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
  pub decision: ReviewDecision,
}

/// `POST /incidents/:id/review` — body: `{"decision":"verify"}`
pub async fn review<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ReviewBody>,
) -> Result<Json<Incident>, ApiError>
where
  S: PatrolStore,
{
  let incident = store
    .review_incident(id, body.decision)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(incident))
}

// ─── Patrol summary ───────────────────────────────────────────────────────────

/// `GET /incidents/:id/patrol`
pub async fn patrol<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<PatrolSummary>, ApiError>
where
  S: PatrolStore,
{
  let summary = store
    .patrol_summary(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("incident {id} not found")))?;
  Ok(Json(summary))
}
