//! The merge orchestrator: folding one identity into another.
//!
//! Runs inside the caller's transaction. Content is deliberately not
//! migrated from the secondary; a merge records intent, and reconciliation
//! is a separate explicit call.

use chrono::Utc;
use mpi_core::{
  context::ActorContext,
  identity::{IdentityStatus, ResolutionState},
  merge::{MergeEvent, MergeRequest, resolve_scope},
  store::MergeOutcome,
};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{encode_dt, encode_uuid},
  fetch,
};

pub fn merge_identities(
  conn: &rusqlite::Connection,
  primary_id: Uuid,
  request: &MergeRequest,
  actor: &ActorContext,
) -> Result<MergeOutcome> {
  // Self-merge is rejected before any lookup, for any id.
  if primary_id == request.secondary_id {
    return Err(Error::SelfMerge);
  }

  let primary = fetch::identity_by_id(conn, primary_id)?
    .ok_or(Error::IdentityNotFound(primary_id))?;
  let secondary = fetch::identity_by_id(conn, request.secondary_id)?
    .ok_or(Error::IdentityNotFound(request.secondary_id))?;

  if secondary.status == IdentityStatus::Merged {
    return Err(Error::AlreadyMerged(secondary.identity_id));
  }

  let event = MergeEvent {
    merge_id:     Uuid::new_v4(),
    primary_id:   primary.identity_id,
    secondary_id: secondary.identity_id,
    scope:        resolve_scope(&primary.scope, &secondary.scope, actor),
    merge_type:   request.merge_type,
    resolution:   request.resolution,
    notes:        request.notes.clone(),
    undo_token:   Uuid::new_v4(),
    merged_by:    actor.actor_id,
    merged_at:    Utc::now(),
  };
  insert_merge(conn, &event)?;

  let stamp_at = encode_dt(event.merged_at);
  let stamp_by = encode_uuid(actor.actor_id);

  // The secondary is folded: superseded, confirmed, inactive. Its aliases,
  // patient link and metadata stay in place.
  conn.execute(
    "UPDATE identities SET
       status = ?2, resolution = ?3, active = 0,
       updated_at = ?4, updated_by = ?5
     WHERE identity_id = ?1",
    rusqlite::params![
      encode_uuid(secondary.identity_id),
      IdentityStatus::Merged.to_string(),
      ResolutionState::Confirmed.to_string(),
      stamp_at,
      stamp_by,
    ],
  )?;
  conn.execute(
    "UPDATE identities SET updated_at = ?2, updated_by = ?3
     WHERE identity_id = ?1",
    rusqlite::params![encode_uuid(primary.identity_id), stamp_at, stamp_by],
  )?;

  // Reload both sides so the outcome reflects the persisted state.
  let primary = fetch::identity_by_id(conn, primary_id)?
    .ok_or(Error::IdentityNotFound(primary_id))?;
  let secondary = fetch::identity_by_id(conn, request.secondary_id)?
    .ok_or(Error::IdentityNotFound(request.secondary_id))?;

  Ok(MergeOutcome { merge: event, primary, secondary })
}

fn insert_merge(conn: &rusqlite::Connection, event: &MergeEvent) -> Result<()> {
  conn.execute(
    "INSERT INTO merges (
       merge_id, primary_id, secondary_id,
       organization_id, hospital_id, department_id,
       merge_type, resolution, notes, undo_token, merged_by, merged_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    rusqlite::params![
      encode_uuid(event.merge_id),
      encode_uuid(event.primary_id),
      encode_uuid(event.secondary_id),
      event.scope.organization_id.map(encode_uuid),
      event.scope.hospital_id.map(encode_uuid),
      event.scope.department_id.map(encode_uuid),
      event.merge_type.to_string(),
      event.resolution.to_string(),
      event.notes,
      encode_uuid(event.undo_token),
      encode_uuid(event.merged_by),
      encode_dt(event.merged_at),
    ],
  )?;
  Ok(())
}
