//! Caller-context extraction.
//!
//! The surrounding platform authenticates the caller and derives the tenant
//! context; this layer only carries it, via request headers:
//!
//! | Header | Meaning |
//! |--------|---------|
//! | `x-actor-id` | acting user (required on writes) |
//! | `x-organization-id` | ambient organisation |
//! | `x-hospital-id` | ambient hospital |
//! | `x-department-id` | ambient department |
//! | `x-permitted-departments` | comma-separated department ids |

use axum::{extract::FromRequestParts, http::request::Parts};
use mpi_core::context::{ActorContext, TenantScope};
use uuid::Uuid;

use crate::error::ApiError;

/// Extractor wrapping [`ActorContext`] for axum handlers.
#[derive(Debug, Clone)]
pub struct Caller(pub ActorContext);

impl<S> FromRequestParts<S> for Caller
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    let actor_id = required_uuid(parts, "x-actor-id")?;
    let scope = TenantScope {
      organization_id: optional_uuid(parts, "x-organization-id")?,
      hospital_id:     optional_uuid(parts, "x-hospital-id")?,
      department_id:   optional_uuid(parts, "x-department-id")?,
    };
    let permitted_departments =
      match header_str(parts, "x-permitted-departments") {
        Some(raw) => raw
          .split(',')
          .map(str::trim)
          .filter(|s| !s.is_empty())
          .map(|s| parse_uuid(s, "x-permitted-departments"))
          .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
      };

    Ok(Caller(ActorContext { actor_id, scope, permitted_departments }))
  }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
  parts.headers.get(name).and_then(|v| v.to_str().ok())
}

fn parse_uuid(raw: &str, name: &str) -> Result<Uuid, ApiError> {
  Uuid::parse_str(raw)
    .map_err(|_| ApiError::BadRequest(format!("{name}: invalid uuid {raw:?}")))
}

fn required_uuid(parts: &Parts, name: &str) -> Result<Uuid, ApiError> {
  let raw = header_str(parts, name)
    .ok_or_else(|| ApiError::BadRequest(format!("{name} header is required")))?;
  parse_uuid(raw, name)
}

fn optional_uuid(parts: &Parts, name: &str) -> Result<Option<Uuid>, ApiError> {
  header_str(parts, name)
    .map(|raw| parse_uuid(raw, name))
    .transpose()
}
