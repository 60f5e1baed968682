use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode},
};
use patrol_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::api_router;

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  api_router(Arc::new(store))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(v) => {
      builder = builder.header("content-type", "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes)
      .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
  };
  (status, value)
}

async fn staff(app: &Router, name: &str) -> String {
  let (status, body) =
    send(app, "POST", "/staff", Some(json!({ "display_name": name }))).await;
  assert_eq!(status, StatusCode::CREATED);
  body["staff_id"].as_str().unwrap().to_string()
}

async fn verified_incident(app: &Router) -> String {
  let (status, body) = send(
    app,
    "POST",
    "/incidents",
    Some(json!({ "summary": "stray dog near the school gate" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["status"], "pending");
  let id = body["incident_id"].as_str().unwrap().to_string();

  let (status, body) = send(
    app,
    "POST",
    &format!("/incidents/{id}/review"),
    Some(json!({ "decision": "verify" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "verified");
  id
}

async fn schedule(
  app: &Router,
  incident_id: &str,
  staff_ids: &[&str],
  time: &str,
) -> (StatusCode, Value) {
  send(
    app,
    "POST",
    "/patrol-groups",
    Some(json!({
      "incident_id": incident_id,
      "staff_ids":   staff_ids,
      "date":        "2026-03-14",
      "time":        time,
    })),
  )
  .await
}

// ── Creation ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_group_returns_201_and_promotes_incident() {
  let app = app().await;
  let a = staff(&app, "Ana").await;
  let incident = verified_incident(&app).await;

  let (status, body) = schedule(&app, &incident, &[&a], "09:00:00").await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["status"], "scheduled");
  assert_eq!(body["staff_ids"], json!([a]));
  assert_eq!(body["date"], "2026-03-14");

  let group_id = body["group_id"].as_str().unwrap();
  let (status, view) = send(&app, "GET", &format!("/patrol-groups/{group_id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(view["incident_status"], "in_progress");
}

#[tokio::test]
async fn double_booking_returns_409_with_conflicts() {
  let app = app().await;
  let a = staff(&app, "Ana").await;
  let b = staff(&app, "Ben").await;
  let incident = verified_incident(&app).await;

  let (_, first) = schedule(&app, &incident, &[&a], "09:00:00").await;
  let (status, body) = schedule(&app, &incident, &[&a, &b], "10:00:00").await;

  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(
    body["conflicts"],
    json!([{ "staff_id": a, "group_id": first["group_id"] }])
  );

  let (_, groups) = send(&app, "GET", "/patrol-groups", None).await;
  assert_eq!(groups.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_incident_is_a_validation_error() {
  let app = app().await;
  let a = staff(&app, "Ana").await;

  let (status, body) =
    schedule(&app, &Uuid::new_v4().to_string(), &[&a], "09:00:00").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["field"], "incident_id");
}

#[tokio::test]
async fn empty_staff_set_is_rejected() {
  let app = app().await;
  let incident = verified_incident(&app).await;

  let (status, body) = schedule(&app, &incident, &[], "09:00:00").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["field"], "staff_ids");
}

#[tokio::test]
async fn missing_staff_ids_is_a_json_400() {
  let app = app().await;
  let incident = verified_incident(&app).await;

  let (status, body) = send(
    &app,
    "POST",
    "/patrol-groups",
    Some(json!({ "incident_id": incident, "date": "2026-03-14", "time": "09:00:00" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
  assert_eq!(body["field"], "staff_ids");
  assert!(body["error"].as_str().unwrap().contains("staff_ids"));
}

#[tokio::test]
async fn malformed_body_is_a_json_400_without_field() {
  let app = app().await;

  let resp = app
    .clone()
    .oneshot(
      Request::builder()
        .method("POST")
        .uri("/staff")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap(),
    )
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body: Value = serde_json::from_slice(&bytes).unwrap();
  assert_eq!(body["field"], Value::Null);
  assert!(body["error"].is_string());
}

// ── Conflict pre-flight ──────────────────────────────────────────────────────

#[tokio::test]
async fn conflict_check_reports_without_writing() {
  let app = app().await;
  let a = staff(&app, "Ana").await;
  let incident = verified_incident(&app).await;
  let (_, group) = schedule(&app, &incident, &[&a], "09:00:00").await;

  let query = json!({ "staff_ids": [a], "date": "2026-03-14", "time": "10:30:00" });
  let (status, report) =
    send(&app, "POST", "/patrol-groups/conflict-check", Some(query.clone())).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(report["has_conflict"], true);
  assert_eq!(report["conflicts"][0]["group_id"], group["group_id"]);

  let mut excluded = query;
  excluded["exclude_group_id"] = group["group_id"].clone();
  let (_, report) =
    send(&app, "POST", "/patrol-groups/conflict-check", Some(excluded)).await;
  assert_eq!(report["has_conflict"], false);
  assert_eq!(report["conflicts"], json!([]));
}

// ── Status and sync ──────────────────────────────────────────────────────────

#[tokio::test]
async fn completing_last_group_resolves_incident() {
  let app = app().await;
  let a = staff(&app, "Ana").await;
  let incident = verified_incident(&app).await;
  let (_, group) = schedule(&app, &incident, &[&a], "09:00:00").await;
  let uri = format!("/patrol-groups/{}", group["group_id"].as_str().unwrap());

  for next in ["in_progress", "completed"] {
    let (status, body) =
      send(&app, "PUT", &uri, Some(json!({ "status": next }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], next);
  }

  let (_, body) = send(&app, "GET", &format!("/incidents/{incident}"), None).await;
  assert_eq!(body["status"], "resolved");

  let (status, summary) =
    send(&app, "GET", &format!("/incidents/{incident}/patrol"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(summary["completed"], 1);
  assert_eq!(summary["active"], 0);
}

#[tokio::test]
async fn illegal_transition_is_rejected() {
  let app = app().await;
  let a = staff(&app, "Ana").await;
  let incident = verified_incident(&app).await;
  let (_, group) = schedule(&app, &incident, &[&a], "09:00:00").await;
  let uri = format!("/patrol-groups/{}", group["group_id"].as_str().unwrap());

  send(&app, "PUT", &uri, Some(json!({ "status": "cancelled" }))).await;
  let (status, body) =
    send(&app, "PUT", &uri, Some(json!({ "status": "in_progress" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["field"], "status");
}

#[tokio::test]
async fn unknown_status_is_a_json_400() {
  let app = app().await;
  let a = staff(&app, "Ana").await;
  let incident = verified_incident(&app).await;
  let (_, group) = schedule(&app, &incident, &[&a], "09:00:00").await;
  let uri = format!("/patrol-groups/{}", group["group_id"].as_str().unwrap());

  let (status, body) = send(&app, "PUT", &uri, Some(json!({ "status": "paused" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
  assert_eq!(body["field"], "status");

  let (_, view) = send(&app, "GET", &uri, None).await;
  assert_eq!(view["status"], "scheduled");
}

// ── Membership ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn removing_last_member_returns_409() {
  let app = app().await;
  let a = staff(&app, "Ana").await;
  let b = staff(&app, "Ben").await;
  let incident = verified_incident(&app).await;
  let (_, group) = schedule(&app, &incident, &[&a, &b], "09:00:00").await;
  let group_id = group["group_id"].as_str().unwrap();

  let (status, body) = send(
    &app,
    "DELETE",
    &format!("/patrol-groups/{group_id}/staff/{b}"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["group_id"], group_id);
  assert_eq!(body["remaining_staff_ids"], json!([a]));

  let (status, body) = send(
    &app,
    "DELETE",
    &format!("/patrol-groups/{group_id}/staff/{a}"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["message"], "cannot remove the last staff member");
  assert_eq!(body["group_id"], group_id);
}

#[tokio::test]
async fn adding_booked_staff_conflicts() {
  let app = app().await;
  let a = staff(&app, "Ana").await;
  let b = staff(&app, "Ben").await;
  let incident = verified_incident(&app).await;
  let (_, morning) = schedule(&app, &incident, &[&a], "09:00:00").await;
  let (_, _) = schedule(&app, &incident, &[&b], "10:00:00").await;

  let (status, body) = send(
    &app,
    "POST",
    &format!("/patrol-groups/{}/staff", morning["group_id"].as_str().unwrap()),
    Some(json!({ "staff_id": b })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["conflicts"][0]["staff_id"], b);
}

// ── Not found ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_ids_return_404() {
  let app = app().await;
  let id = Uuid::new_v4();

  for uri in [
    format!("/patrol-groups/{id}"),
    format!("/incidents/{id}"),
    format!("/incidents/{id}/patrol"),
    format!("/staff/{id}"),
  ] {
    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
  }

  let (status, _) = send(
    &app,
    "PUT",
    &format!("/patrol-groups/{id}"),
    Some(json!({ "status": "completed" })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Staff and incidents ──────────────────────────────────────────────────────

#[tokio::test]
async fn inactive_staff_cannot_be_scheduled() {
  let app = app().await;
  let a = staff(&app, "Ana").await;
  let incident = verified_incident(&app).await;

  let (status, body) =
    send(&app, "PUT", &format!("/staff/{a}"), Some(json!({ "active": false }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["active"], false);

  let (_, active) = send(&app, "GET", "/staff?active=true", None).await;
  assert_eq!(active, json!([]));

  let (status, body) = schedule(&app, &incident, &[&a], "09:00:00").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["field"], "staff_ids");
}

#[tokio::test]
async fn incident_with_patrols_cannot_be_deleted() {
  let app = app().await;
  let a = staff(&app, "Ana").await;
  let incident = verified_incident(&app).await;
  schedule(&app, &incident, &[&a], "09:00:00").await;

  let (status, _) = send(&app, "DELETE", &format!("/incidents/{incident}"), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) =
    send(&app, "POST", "/incidents", Some(json!({ "summary": "loose cat" }))).await;
  assert_eq!(status, StatusCode::CREATED);
  let spare = body["incident_id"].as_str().unwrap();
  let (status, body) = send(&app, "DELETE", &format!("/incidents/{spare}"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  assert_eq!(body, Value::Null);

  let (_, listed) = send(&app, "GET", "/incidents?status=in_progress", None).await;
  assert_eq!(listed.as_array().unwrap().len(), 1);
}
