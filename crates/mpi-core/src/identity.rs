//! Identity — the canonical record representing one real-world patient.
//!
//! An identity is created by the first unmatched link call, mutated by later
//! link/add-alias calls, and can only transition to merged by being the
//! secondary of a merge. It is never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  alias::{Alias, AliasKind},
  context::{ActorContext, TenantScope},
  error::Error,
};

// ─── Public numbering ────────────────────────────────────────────────────────

/// Prefix of every public identity number.
pub const NUMBER_PREFIX: &str = "EMP-";
/// Count of zero-padded decimal digits after the prefix.
pub const NUMBER_DIGITS: usize = 6;
/// How many candidates the store may draw before giving up. Exhausting the
/// bound is treated as index corruption or capacity exhaustion, not
/// something to retry past.
pub const NUMBER_DRAW_BOUND: u32 = 25;

// ─── States ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityStatus {
  Active,
  Merged,
}

/// Verification status of an identity.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionState {
  Unverified,
  Confirmed,
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// The canonical record for one real-world patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
  pub identity_id:   Uuid,
  /// Human-readable public number; globally unique and immutable once
  /// assigned.
  pub public_number: String,
  /// 1:1 link to the local patient record, when known.
  pub patient_id:    Option<Uuid>,
  pub status:        IdentityStatus,
  pub resolution:    ResolutionState,
  pub active:        bool,
  pub scope:         TenantScope,
  pub source_system: Option<String>,
  pub metadata:      Option<serde_json::Value>,
  /// Denormalised record-number snapshot from the source system.
  pub mrn_snapshot:  Option<String>,
  pub aliases:       Vec<Alias>,
  pub created_at:    DateTime<Utc>,
  pub created_by:    Uuid,
  pub updated_at:    DateTime<Utc>,
  pub updated_by:    Uuid,
}

impl Identity {
  /// Build a fresh identity for `patient_id`, absorbing the request's
  /// scalar fields and stamping the acting caller.
  pub fn create(
    public_number: String,
    patient_id: Uuid,
    request: &LinkRequest,
    actor: &ActorContext,
  ) -> Self {
    let now = Utc::now();
    Self {
      identity_id: Uuid::new_v4(),
      public_number,
      patient_id: Some(patient_id),
      status: IdentityStatus::Active,
      resolution: ResolutionState::Unverified,
      active: true,
      scope: TenantScope {
        organization_id: request.organization_id,
        hospital_id:     request.hospital_id,
        department_id:   request.department_id,
      },
      source_system: request.source_system.clone(),
      metadata: request.metadata.clone(),
      mrn_snapshot: request.mrn_snapshot.clone(),
      aliases: Vec::new(),
      created_at: now,
      created_by: actor.actor_id,
      updated_at: now,
      updated_by: actor.actor_id,
    }
  }

  /// Fold the request's non-null scalar fields into this identity,
  /// last-write-wins. A null request field never overwrites an existing
  /// value. Returns whether anything changed; the audit stamp is refreshed
  /// only in that case.
  pub fn absorb(&mut self, request: &LinkRequest, actor: &ActorContext) -> bool {
    let mut changed = false;
    if self.patient_id.is_none() && request.patient_id.is_some() {
      self.patient_id = request.patient_id;
      changed = true;
    }
    changed |= overwrite(&mut self.scope.organization_id, &request.organization_id);
    changed |= overwrite(&mut self.scope.hospital_id, &request.hospital_id);
    changed |= overwrite(&mut self.scope.department_id, &request.department_id);
    changed |= overwrite(&mut self.source_system, &request.source_system);
    changed |= overwrite(&mut self.metadata, &request.metadata);
    changed |= overwrite(&mut self.mrn_snapshot, &request.mrn_snapshot);
    if changed {
      self.updated_at = Utc::now();
      self.updated_by = actor.actor_id;
    }
    changed
  }

  /// Whether `(kind, value)` is already attached to this identity.
  pub fn owns_alias(&self, kind: AliasKind, value: &str) -> bool {
    self.aliases.iter().any(|a| a.kind == kind && a.value == value)
  }
}

/// Overwrite `field` when the incoming value is present and differs.
fn overwrite<T: Clone + PartialEq>(field: &mut Option<T>, incoming: &Option<T>) -> bool {
  match incoming {
    Some(value) if field.as_ref() != Some(value) => {
      *field = Some(value.clone());
      true
    }
    _ => false,
  }
}

// ─── LinkRequest ─────────────────────────────────────────────────────────────

/// Input to [`crate::store::IdentityStore::link_identity`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkRequest {
  pub patient_id:      Option<Uuid>,
  pub organization_id: Option<Uuid>,
  pub hospital_id:     Option<Uuid>,
  pub department_id:   Option<Uuid>,
  pub source_system:   Option<String>,
  pub metadata:        Option<serde_json::Value>,
  pub mrn_snapshot:    Option<String>,
  pub alias_kind:      Option<AliasKind>,
  pub alias_value:     Option<String>,
  pub alias_source:    Option<String>,
}

impl LinkRequest {
  /// Check the request shape and return the mandatory patient id.
  ///
  /// The alias triple is optional as a whole, but type and value must be
  /// supplied together.
  pub fn validate(&self) -> Result<Uuid, Error> {
    let patient_id = self.patient_id.ok_or(Error::MissingPatientId)?;
    if self.alias_kind.is_some() != self.alias_value.is_some() {
      return Err(Error::AliasPairIncomplete);
    }
    Ok(patient_id)
  }

  /// The alias pair, when both halves are present.
  pub fn alias_pair(&self) -> Option<(AliasKind, &str)> {
    match (self.alias_kind, self.alias_value.as_deref()) {
      (Some(kind), Some(value)) => Some((kind, value)),
      _ => None,
    }
  }
}
