//! The resolution engine: find-or-create linking and alias management.
//!
//! Every function here runs inside the caller's transaction. Pre-checks give
//! precise errors; the schema's UNIQUE constraints stay authoritative when
//! two writers race.

use mpi_core::{
  alias::{Alias, NewAlias},
  context::ActorContext,
  identity::{self, Identity, LinkRequest},
  store::{AliasAdded, LinkOutcome},
};
use rand::Rng as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{encode_dt, encode_uuid},
  fetch,
};

// ─── linkIdentity ────────────────────────────────────────────────────────────

pub fn link_identity(
  conn: &rusqlite::Connection,
  request: &LinkRequest,
  actor: &ActorContext,
) -> Result<LinkOutcome> {
  let patient_id = request.validate()?;

  // Resolve an existing identity: by patient id first, then by alias.
  let mut found_by_patient = false;
  let mut existing = fetch::identity_by_patient(conn, patient_id)?;
  if existing.is_some() {
    found_by_patient = true;
  } else if let Some((kind, value)) = request.alias_pair() {
    existing = fetch::identity_by_alias(conn, kind, value)?;
  }

  // A resolved identity must agree with the request about the patient
  // binding; reassignment goes through the merge path, never through
  // linking.
  if let Some(found) = &existing {
    if found.patient_id.is_some() && found.patient_id != Some(patient_id) {
      return Err(Error::PatientAlreadyLinked(found.identity_id));
    }
    if let Some((kind, value)) = request.alias_pair() {
      match fetch::alias_owner(conn, kind, value)? {
        Some(owner) if owner != found.identity_id => {
          if found_by_patient {
            return Err(Error::PatientAlreadyLinked(found.identity_id));
          }
          return Err(Error::AliasTaken { kind, value: value.to_owned() });
        }
        _ => {}
      }
    }
  }

  let mut created = false;
  let mut fields_updated = false;

  let mut identity = match existing {
    Some(identity) => identity,
    None => {
      let number = assign_public_number(conn)?;
      let fresh = Identity::create(number, patient_id, request, actor);
      insert_identity(conn, &fresh)?;
      created = true;
      fresh
    }
  };

  if !created {
    fields_updated = identity.absorb(request, actor);
    if fields_updated {
      update_identity(conn, &identity)?;
    }
  }

  // Attach the alias unless this identity already owns it.
  let mut alias_attached = false;
  if let Some((kind, value)) = request.alias_pair() {
    if !identity.owns_alias(kind, value) {
      let alias = Alias::attach(
        identity.identity_id,
        kind,
        value.to_owned(),
        request.alias_source.clone(),
        actor,
      );
      insert_alias(conn, &alias)?;
      identity.aliases.push(alias);
      alias_attached = true;
    }
  }

  Ok(LinkOutcome { identity, created, fields_updated, alias_attached })
}

// ─── addAlias ────────────────────────────────────────────────────────────────

pub fn add_alias(
  conn: &rusqlite::Connection,
  identity_id: Uuid,
  request: &NewAlias,
  actor: &ActorContext,
) -> Result<AliasAdded> {
  let mut identity = fetch::identity_by_id(conn, identity_id)?
    .ok_or(Error::IdentityNotFound(identity_id))?;
  let (kind, value) = request.validate()?;

  if fetch::alias_owner(conn, kind, &value)?.is_some() {
    return Err(Error::AliasTaken { kind, value });
  }

  let alias = Alias::attach(
    identity_id,
    kind,
    value,
    request.source_system.clone(),
    actor,
  );
  insert_alias(conn, &alias)?;
  identity.aliases.push(alias.clone());

  Ok(AliasAdded { identity, alias })
}

// ─── removeAlias ─────────────────────────────────────────────────────────────

/// Hard-remove `alias_id` from `identity_id`'s collection. The alias must
/// belong to that identity specifically; an alias id that exists under a
/// different identity is still not-found here.
pub fn remove_alias(
  conn: &rusqlite::Connection,
  identity_id: Uuid,
  alias_id: Uuid,
) -> Result<()> {
  if !fetch::identity_exists(conn, identity_id)? {
    return Err(Error::IdentityNotFound(identity_id));
  }

  let removed = conn.execute(
    "DELETE FROM aliases WHERE alias_id = ?1 AND identity_id = ?2",
    rusqlite::params![encode_uuid(alias_id), encode_uuid(identity_id)],
  )?;
  if removed == 0 {
    return Err(Error::AliasNotFound { identity_id, alias_id });
  }
  Ok(())
}

// ─── Public numbering ────────────────────────────────────────────────────────

const NUMBER_SPACE: u32 = 1_000_000;

/// Draw `EMP-` plus six zero-padded decimal digits until an unused number
/// turns up. Exhausting the bound means the number space is effectively full
/// or the index is corrupt, and is not retried past.
fn assign_public_number(conn: &rusqlite::Connection) -> Result<String> {
  let mut rng = rand::thread_rng();
  for _ in 0..identity::NUMBER_DRAW_BOUND {
    let candidate = format!(
      "{}{:0width$}",
      identity::NUMBER_PREFIX,
      rng.gen_range(0..NUMBER_SPACE),
      width = identity::NUMBER_DIGITS,
    );
    if !fetch::number_exists(conn, &candidate)? {
      return Ok(candidate);
    }
  }
  Err(Error::NumberSpaceExhausted(identity::NUMBER_DRAW_BOUND))
}

// ─── Row writes ──────────────────────────────────────────────────────────────

fn insert_identity(
  conn: &rusqlite::Connection,
  identity: &Identity,
) -> Result<()> {
  conn.execute(
    "INSERT INTO identities (
       identity_id, public_number, patient_id, status, resolution, active,
       organization_id, hospital_id, department_id,
       source_system, metadata, mrn_snapshot,
       created_at, created_by, updated_at, updated_by
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
               ?15, ?16)",
    rusqlite::params![
      encode_uuid(identity.identity_id),
      identity.public_number,
      identity.patient_id.map(encode_uuid),
      identity.status.to_string(),
      identity.resolution.to_string(),
      identity.active,
      identity.scope.organization_id.map(encode_uuid),
      identity.scope.hospital_id.map(encode_uuid),
      identity.scope.department_id.map(encode_uuid),
      identity.source_system,
      metadata_json(identity)?,
      identity.mrn_snapshot,
      encode_dt(identity.created_at),
      encode_uuid(identity.created_by),
      encode_dt(identity.updated_at),
      encode_uuid(identity.updated_by),
    ],
  )?;
  Ok(())
}

/// Persist the scalar fields [`Identity::absorb`] may have changed, plus the
/// refreshed audit stamp. Status transitions are the merge path's business.
fn update_identity(
  conn: &rusqlite::Connection,
  identity: &Identity,
) -> Result<()> {
  conn.execute(
    "UPDATE identities SET
       patient_id = ?2, organization_id = ?3, hospital_id = ?4,
       department_id = ?5, source_system = ?6, metadata = ?7,
       mrn_snapshot = ?8, updated_at = ?9, updated_by = ?10
     WHERE identity_id = ?1",
    rusqlite::params![
      encode_uuid(identity.identity_id),
      identity.patient_id.map(encode_uuid),
      identity.scope.organization_id.map(encode_uuid),
      identity.scope.hospital_id.map(encode_uuid),
      identity.scope.department_id.map(encode_uuid),
      identity.source_system,
      metadata_json(identity)?,
      identity.mrn_snapshot,
      encode_dt(identity.updated_at),
      encode_uuid(identity.updated_by),
    ],
  )?;
  Ok(())
}

/// Insert relying on the schema's `UNIQUE (kind, value)`: under a race the
/// constraint, not the pre-check, is what holds the invariant.
pub(crate) fn insert_alias(
  conn: &rusqlite::Connection,
  alias: &Alias,
) -> Result<()> {
  let inserted = conn.execute(
    "INSERT INTO aliases (
       alias_id, identity_id, kind, value, source_system, active,
       created_at, created_by
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    rusqlite::params![
      encode_uuid(alias.alias_id),
      encode_uuid(alias.identity_id),
      alias.kind.to_string(),
      alias.value,
      alias.source_system,
      alias.active,
      encode_dt(alias.created_at),
      encode_uuid(alias.created_by),
    ],
  );
  match inserted {
    Ok(_) => Ok(()),
    Err(rusqlite::Error::SqliteFailure(e, _))
      if e.code == rusqlite::ErrorCode::ConstraintViolation =>
    {
      Err(Error::AliasTaken {
        kind:  alias.kind,
        value: alias.value.clone(),
      })
    }
    Err(e) => Err(e.into()),
  }
}

fn metadata_json(identity: &Identity) -> Result<Option<String>> {
  identity
    .metadata
    .as_ref()
    .map(serde_json::to_string)
    .transpose()
    .map_err(Error::from)
}
