//! Handlers for identity resolution and reads.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/identities/link` | find-or-create; 201 when created |
//! | `GET`  | `/identities` | `?patient_id=` or `?alias_kind=&alias_value=` |
//! | `GET`  | `/identities/{id}` | 404 if not found |
//! | `GET`  | `/identities/by-number/{number}` | 404 if not found |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use mpi_core::{
  alias::AliasKind,
  identity::{Identity, LinkRequest},
  store::IdentityStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, Caller, error::ApiError};

// ─── Link ─────────────────────────────────────────────────────────────────────

/// `POST /identities/link`
///
/// The change event (if the call wrote anything) is published only after the
/// store call — and therefore the transaction — has returned.
pub async fn link<S>(
  State(state): State<ApiState<S>>,
  Caller(actor): Caller,
  Json(body): Json<LinkRequest>,
) -> Result<impl IntoResponse, ApiError>
where
  S: IdentityStore,
{
  let outcome = state
    .store
    .link_identity(body, actor)
    .await
    .map_err(ApiError::from_store)?;

  if let Some(event) = outcome.change_event() {
    state.events.publish(event);
  }

  let status = if outcome.created {
    StatusCode::CREATED
  } else {
    StatusCode::OK
  };
  Ok((status, Json(outcome.identity)))
}

// ─── Find ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FindParams {
  pub patient_id:  Option<Uuid>,
  pub alias_kind:  Option<AliasKind>,
  pub alias_value: Option<String>,
}

/// `GET /identities?patient_id=…` or `?alias_kind=…&alias_value=…`
///
/// Returns an array with zero or one element; an absent match is an empty
/// result, not a 404.
pub async fn find<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<FindParams>,
) -> Result<Json<Vec<Identity>>, ApiError>
where
  S: IdentityStore,
{
  let found = if let Some(patient_id) = params.patient_id {
    state
      .store
      .find_by_patient(patient_id)
      .await
      .map_err(ApiError::from_store)?
  } else if let (Some(kind), Some(value)) =
    (params.alias_kind, params.alias_value)
  {
    state
      .store
      .find_by_alias(kind, value)
      .await
      .map_err(ApiError::from_store)?
  } else {
    return Err(ApiError::BadRequest(
      "expected patient_id, or alias_kind with alias_value".into(),
    ));
  };
  Ok(Json(found.into_iter().collect()))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /identities/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Identity>, ApiError>
where
  S: IdentityStore,
{
  let identity = state
    .store
    .get_identity(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(identity))
}

/// `GET /identities/by-number/{number}`
pub async fn get_by_number<S>(
  State(state): State<ApiState<S>>,
  Path(number): Path<String>,
) -> Result<Json<Identity>, ApiError>
where
  S: IdentityStore,
{
  let identity = state
    .store
    .get_identity_by_number(number)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(identity))
}
