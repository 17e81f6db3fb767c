//! Shared row-loading helpers.
//!
//! All functions are synchronous and borrow a connection, so they compose
//! inside a write transaction as well as a plain read.

use mpi_core::{
  alias::{Alias, AliasKind},
  identity::Identity,
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{IDENTITY_COLUMNS, RawAlias, RawIdentity, decode_uuid, encode_uuid},
};

pub fn identity_by_id(
  conn: &rusqlite::Connection,
  identity_id: Uuid,
) -> Result<Option<Identity>> {
  let raw = conn
    .query_row(
      &format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE identity_id = ?1"),
      rusqlite::params![encode_uuid(identity_id)],
      RawIdentity::from_row,
    )
    .optional()?;
  hydrate(conn, raw)
}

pub fn identity_by_number(
  conn: &rusqlite::Connection,
  public_number: &str,
) -> Result<Option<Identity>> {
  let raw = conn
    .query_row(
      &format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE public_number = ?1"),
      rusqlite::params![public_number],
      RawIdentity::from_row,
    )
    .optional()?;
  hydrate(conn, raw)
}

/// The patient lookup sees non-merged identities only; the one-per-patient
/// invariant is scoped the same way.
pub fn identity_by_patient(
  conn: &rusqlite::Connection,
  patient_id: Uuid,
) -> Result<Option<Identity>> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {IDENTITY_COLUMNS} FROM identities
         WHERE patient_id = ?1 AND status != 'MERGED'"
      ),
      rusqlite::params![encode_uuid(patient_id)],
      RawIdentity::from_row,
    )
    .optional()?;
  hydrate(conn, raw)
}

/// Resolve an alias pair to its owning identity. A dangling alias row is an
/// integrity failure, not an empty result.
pub fn identity_by_alias(
  conn: &rusqlite::Connection,
  kind: AliasKind,
  value: &str,
) -> Result<Option<Identity>> {
  let Some(owner) = alias_owner(conn, kind, value)? else {
    return Ok(None);
  };
  match identity_by_id(conn, owner)? {
    Some(identity) => Ok(Some(identity)),
    None => Err(Error::OrphanAlias { kind, value: value.to_owned() }),
  }
}

/// The identity currently owning `(kind, value)`, if the pair is indexed.
pub fn alias_owner(
  conn: &rusqlite::Connection,
  kind: AliasKind,
  value: &str,
) -> Result<Option<Uuid>> {
  let owner: Option<String> = conn
    .query_row(
      "SELECT identity_id FROM aliases WHERE kind = ?1 AND value = ?2",
      rusqlite::params![kind.to_string(), value],
      |row| row.get(0),
    )
    .optional()?;
  owner.as_deref().map(decode_uuid).transpose()
}

pub fn identity_exists(
  conn: &rusqlite::Connection,
  identity_id: Uuid,
) -> Result<bool> {
  let exists: bool = conn
    .query_row(
      "SELECT 1 FROM identities WHERE identity_id = ?1",
      rusqlite::params![encode_uuid(identity_id)],
      |_| Ok(true),
    )
    .optional()?
    .unwrap_or(false);
  Ok(exists)
}

pub fn number_exists(
  conn: &rusqlite::Connection,
  public_number: &str,
) -> Result<bool> {
  let exists: bool = conn
    .query_row(
      "SELECT 1 FROM identities WHERE public_number = ?1",
      rusqlite::params![public_number],
      |_| Ok(true),
    )
    .optional()?
    .unwrap_or(false);
  Ok(exists)
}

fn aliases_for(
  conn: &rusqlite::Connection,
  identity_key: &str,
) -> Result<Vec<Alias>> {
  let mut stmt = conn.prepare(
    "SELECT alias_id, identity_id, kind, value, source_system, active,
            created_at, created_by
     FROM aliases WHERE identity_id = ?1
     ORDER BY created_at, alias_id",
  )?;
  let raws = stmt
    .query_map(rusqlite::params![identity_key], RawAlias::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawAlias::into_alias).collect()
}

fn hydrate(
  conn: &rusqlite::Connection,
  raw: Option<RawIdentity>,
) -> Result<Option<Identity>> {
  match raw {
    Some(raw) => {
      let aliases = aliases_for(conn, &raw.identity_id)?;
      Ok(Some(raw.into_identity(aliases)?))
    }
    None => Ok(None),
  }
}
