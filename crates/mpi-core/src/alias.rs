//! Alias — a secondary identifier bound to exactly one identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{context::ActorContext, error::Error};

/// The namespace an alias value lives in.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AliasKind {
  Mrn,
  NationalId,
  Passport,
  DriversLicense,
  InsuranceId,
}

/// A secondary identifier owned by one identity.
///
/// The `(kind, value)` pair is unique across the whole index, independent of
/// the owner. An alias is never reassigned; it is removed only by
/// [`crate::store::IdentityStore::remove_alias`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alias {
  pub alias_id:      Uuid,
  pub identity_id:   Uuid,
  pub kind:          AliasKind,
  pub value:         String,
  pub source_system: Option<String>,
  pub active:        bool,
  pub created_at:    DateTime<Utc>,
  pub created_by:    Uuid,
}

impl Alias {
  /// Build a fresh, active alias stamped with the acting caller.
  pub fn attach(
    identity_id: Uuid,
    kind: AliasKind,
    value: String,
    source_system: Option<String>,
    actor: &ActorContext,
  ) -> Self {
    Self {
      alias_id: Uuid::new_v4(),
      identity_id,
      kind,
      value,
      source_system,
      active: true,
      created_at: Utc::now(),
      created_by: actor.actor_id,
    }
  }
}

/// Input to [`crate::store::IdentityStore::add_alias`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewAlias {
  pub kind:          Option<AliasKind>,
  pub value:         Option<String>,
  pub source_system: Option<String>,
}

impl NewAlias {
  /// Both kind and value are required.
  pub fn validate(&self) -> Result<(AliasKind, String), Error> {
    match (self.kind, self.value.clone()) {
      (Some(kind), Some(value)) => Ok((kind, value)),
      _ => Err(Error::AliasFieldsRequired),
    }
  }
}
