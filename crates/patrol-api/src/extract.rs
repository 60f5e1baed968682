//! JSON extractor whose rejections are reported as [`ApiError`]s.

use axum::{
  extract::FromRequest,
  response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::ApiError;

/// Drop-in for [`axum::Json`]. A body that fails to parse is answered with a
/// 400 and a JSON `{error, field}` body instead of axum's plain-text 422.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
  fn into_response(self) -> Response { axum::Json(self.0).into_response() }
}
