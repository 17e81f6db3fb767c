//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Closed enums are stored as
//! their SCREAMING_SNAKE_CASE strings, metadata as compact JSON, and UUIDs
//! as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use mpi_core::{
  alias::Alias,
  context::TenantScope,
  identity::Identity,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

/// Decode a SCREAMING_SNAKE_CASE enum column via its `FromStr`.
pub fn decode_enum<T: std::str::FromStr>(s: &str, what: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown {what}: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every identity SELECT.
pub const IDENTITY_COLUMNS: &str = "identity_id, public_number, patient_id, \
   status, resolution, active, organization_id, hospital_id, department_id, \
   source_system, metadata, mrn_snapshot, created_at, created_by, \
   updated_at, updated_by";

/// Raw strings read directly from an `identities` row.
pub struct RawIdentity {
  pub identity_id:     String,
  pub public_number:   String,
  pub patient_id:      Option<String>,
  pub status:          String,
  pub resolution:      String,
  pub active:          bool,
  pub organization_id: Option<String>,
  pub hospital_id:     Option<String>,
  pub department_id:   Option<String>,
  pub source_system:   Option<String>,
  pub metadata:        Option<String>,
  pub mrn_snapshot:    Option<String>,
  pub created_at:      String,
  pub created_by:      String,
  pub updated_at:      String,
  pub updated_by:      String,
}

impl RawIdentity {
  /// Mapper for queries selecting [`IDENTITY_COLUMNS`] in order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      identity_id:     row.get(0)?,
      public_number:   row.get(1)?,
      patient_id:      row.get(2)?,
      status:          row.get(3)?,
      resolution:      row.get(4)?,
      active:          row.get(5)?,
      organization_id: row.get(6)?,
      hospital_id:     row.get(7)?,
      department_id:   row.get(8)?,
      source_system:   row.get(9)?,
      metadata:        row.get(10)?,
      mrn_snapshot:    row.get(11)?,
      created_at:      row.get(12)?,
      created_by:      row.get(13)?,
      updated_at:      row.get(14)?,
      updated_by:      row.get(15)?,
    })
  }

  pub fn into_identity(self, aliases: Vec<Alias>) -> Result<Identity> {
    Ok(Identity {
      identity_id: decode_uuid(&self.identity_id)?,
      public_number: self.public_number,
      patient_id: self.patient_id.as_deref().map(decode_uuid).transpose()?,
      status: decode_enum(&self.status, "identity status")?,
      resolution: decode_enum(&self.resolution, "resolution state")?,
      active: self.active,
      scope: TenantScope {
        organization_id: self
          .organization_id
          .as_deref()
          .map(decode_uuid)
          .transpose()?,
        hospital_id: self.hospital_id.as_deref().map(decode_uuid).transpose()?,
        department_id: self
          .department_id
          .as_deref()
          .map(decode_uuid)
          .transpose()?,
      },
      source_system: self.source_system,
      metadata: self
        .metadata
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?,
      mrn_snapshot: self.mrn_snapshot,
      aliases,
      created_at: decode_dt(&self.created_at)?,
      created_by: decode_uuid(&self.created_by)?,
      updated_at: decode_dt(&self.updated_at)?,
      updated_by: decode_uuid(&self.updated_by)?,
    })
  }
}

/// Raw strings read directly from an `aliases` row.
pub struct RawAlias {
  pub alias_id:      String,
  pub identity_id:   String,
  pub kind:          String,
  pub value:         String,
  pub source_system: Option<String>,
  pub active:        bool,
  pub created_at:    String,
  pub created_by:    String,
}

impl RawAlias {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      alias_id:      row.get(0)?,
      identity_id:   row.get(1)?,
      kind:          row.get(2)?,
      value:         row.get(3)?,
      source_system: row.get(4)?,
      active:        row.get(5)?,
      created_at:    row.get(6)?,
      created_by:    row.get(7)?,
    })
  }

  pub fn into_alias(self) -> Result<Alias> {
    Ok(Alias {
      alias_id: decode_uuid(&self.alias_id)?,
      identity_id: decode_uuid(&self.identity_id)?,
      kind: decode_enum(&self.kind, "alias kind")?,
      value: self.value,
      source_system: self.source_system,
      active: self.active,
      created_at: decode_dt(&self.created_at)?,
      created_by: decode_uuid(&self.created_by)?,
    })
  }
}
