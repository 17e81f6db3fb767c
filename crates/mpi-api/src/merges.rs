//! Handler for `/identities/{id}/merge`.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use mpi_core::{merge::MergeRequest, store::IdentityStore};
use uuid::Uuid;

use crate::{ApiState, Caller, error::ApiError};

/// `POST /identities/{id}/merge` — fold `body.secondary_id` into `{id}`.
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<MergeRequest>,
) -> Result<impl IntoResponse, ApiError>
where
  S: IdentityStore,
{
  let outcome = state
    .store
    .merge_identities(id, body, actor)
    .await
    .map_err(ApiError::from_store)?;

  state.events.publish(outcome.change_event());
  Ok((StatusCode::CREATED, Json(outcome.merge)))
}
