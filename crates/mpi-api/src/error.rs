//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use mpi_core::{Classify, ErrorKind};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("{message}")]
  Fault { kind: ErrorKind, message: String },
}

impl ApiError {
  /// Wrap a store failure, keeping its kind for the status mapping.
  pub fn from_store<E>(error: E) -> Self
  where
    E: std::error::Error + Classify,
  {
    ApiError::Fault { kind: error.kind(), message: error.to_string() }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, kind, message) = match self {
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, ErrorKind::Validation, m)
      }
      ApiError::Fault { kind, message } => (status_for(kind), kind, message),
    };
    (status, Json(json!({ "error": message, "kind": kind }))).into_response()
  }
}

/// The engine distinguishes error kind only; the transport mapping lives
/// here.
fn status_for(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::Validation => StatusCode::BAD_REQUEST,
    ErrorKind::NotFound => StatusCode::NOT_FOUND,
    ErrorKind::Conflict => StatusCode::CONFLICT,
    ErrorKind::BusinessRule => StatusCode::UNPROCESSABLE_ENTITY,
    ErrorKind::Integrity | ErrorKind::Storage => {
      StatusCode::INTERNAL_SERVER_ERROR
    }
  }
}
