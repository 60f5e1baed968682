//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use patrol_core::{conflict::StaffConflict, store::StoreError};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("invalid {field}: {message}")]
  Validation {
    field:   &'static str,
    message: String,
  },

  /// A request body that could not be read as the expected JSON shape.
  #[error("invalid request body: {message}")]
  Body {
    field:   Option<String>,
    message: String,
  },

  #[error("staff double-booked")]
  Conflict(Vec<StaffConflict>),

  #[error("cannot remove the last staff member")]
  LastMember { group_id: Uuid },

  #[error("consistency error: {0}")]
  Consistency(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a backend error, surfacing domain rejections with their own status.
  pub fn store<E: StoreError>(e: E) -> Self {
    match e.into_domain() {
      Ok(domain) => domain.into(),
      Err(e) => ApiError::Store(Box::new(e)),
    }
  }
}

impl From<patrol_core::Error> for ApiError {
  fn from(e: patrol_core::Error) -> Self {
    use patrol_core::Error as E;
    match e {
      E::IncidentNotFound(_) | E::GroupNotFound(_) | E::StaffNotFound(_) => {
        ApiError::NotFound(e.to_string())
      }
      E::Validation { field, message } => ApiError::Validation { field, message },
      E::Conflict(conflicts) => ApiError::Conflict(conflicts),
      E::LastMember { group_id } => ApiError::LastMember { group_id },
      e @ E::Consistency { .. } => ApiError::Consistency(e.to_string()),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    let text = rejection.body_text();
    let message = text
      .split_once("target type: ")
      .map_or(text.as_str(), |(_, rest)| rest)
      .to_string();
    ApiError::Body { field: offending_field(&message), message }
  }
}

/// The field a serde error points at: the missing one if a field is absent,
/// otherwise the path serde prefixed to the message.
fn offending_field(message: &str) -> Option<String> {
  if let Some((_, rest)) = message.split_once("missing field `") {
    return rest.split_once('`').map(|(name, _)| name.to_string());
  }
  let (path, _) = message.split_once(": ")?;
  (!path.is_empty() && !path.contains(char::is_whitespace)).then(|| path.to_string())
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::Validation { field, message } => (
        StatusCode::BAD_REQUEST,
        json!({ "error": format!("invalid {field}: {message}"), "field": field }),
      ),
      ApiError::Body { field, message } => (
        StatusCode::BAD_REQUEST,
        json!({ "error": format!("invalid request body: {message}"), "field": field }),
      ),
      ApiError::Conflict(conflicts) => (
        StatusCode::CONFLICT,
        json!({ "error": "staff double-booked", "conflicts": conflicts }),
      ),
      ApiError::LastMember { group_id } => (
        StatusCode::CONFLICT,
        json!({
          "message":  "cannot remove the last staff member",
          "group_id": group_id,
        }),
      ),
      ApiError::Consistency(m) => {
        tracing::error!(error = %m, "request rolled back");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": m }))
      }
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
      }
    };
    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::offending_field;

  #[test]
  fn field_is_taken_from_serde_messages() {
    assert_eq!(
      offending_field("missing field `staff_ids` at line 1 column 60").as_deref(),
      Some("staff_ids")
    );
    assert_eq!(
      offending_field("status: unknown variant `paused`, expected one of `scheduled`")
        .as_deref(),
      Some("status")
    );
    assert_eq!(offending_field("expected value at line 1 column 1"), None);
  }
}
