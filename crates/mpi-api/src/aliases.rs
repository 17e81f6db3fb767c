//! Handlers for `/identities/{id}/aliases` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST`   | `/identities/{id}/aliases` | Body: `{"kind":"MRN","value":"…"}` |
//! | `DELETE` | `/identities/{id}/aliases/{alias_id}` | 404 unless owned by `{id}` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use mpi_core::{alias::NewAlias, store::IdentityStore};
use uuid::Uuid;

use crate::{ApiState, Caller, error::ApiError};

/// `POST /identities/{id}/aliases`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<NewAlias>,
) -> Result<impl IntoResponse, ApiError>
where
  S: IdentityStore,
{
  let added = state
    .store
    .add_alias(id, body, actor)
    .await
    .map_err(ApiError::from_store)?;

  state.events.publish(added.change_event());
  Ok((StatusCode::CREATED, Json(added.alias)))
}

/// `DELETE /identities/{id}/aliases/{alias_id}`
///
/// Removal emits no change event — intentionally asymmetric with add.
pub async fn remove<S>(
  State(state): State<ApiState<S>>,
  Path((id, alias_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError>
where
  S: IdentityStore,
{
  state
    .store
    .remove_alias(id, alias_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
