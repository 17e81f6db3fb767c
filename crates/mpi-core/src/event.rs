//! Change events published to downstream consumers of the index.
//!
//! Publishing is best-effort and strictly post-commit: the domain write has
//! already been persisted by the time a publisher sees the payload, and a
//! publish failure must never surface to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{identity::Identity, merge::MergeEvent};

/// What happened to an identity.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
  IdentityLinked,
  IdentityAliasCreated,
  IdentitiesMerged,
}

/// The payload handed to downstream consumers, keyed by the identity's
/// public number so transports can order per identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
  pub event_type:      ChangeKind,
  pub public_number:   String,
  pub identity_id:     Uuid,
  pub patient_id:      Option<Uuid>,
  pub organization_id: Option<Uuid>,
  pub hospital_id:     Option<Uuid>,
  pub department_id:   Option<Uuid>,
  pub occurred_at:     DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub primary_number:  Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub secondary_number: Option<String>,
}

impl ChangeEvent {
  /// Payload for a link or alias change on a single identity.
  pub fn for_identity(event_type: ChangeKind, identity: &Identity) -> Self {
    Self {
      event_type,
      public_number: identity.public_number.clone(),
      identity_id: identity.identity_id,
      patient_id: identity.patient_id,
      organization_id: identity.scope.organization_id,
      hospital_id: identity.scope.hospital_id,
      department_id: identity.scope.department_id,
      occurred_at: Utc::now(),
      primary_number: None,
      secondary_number: None,
    }
  }

  /// Payload for a completed merge, keyed by the primary; carries both
  /// public numbers.
  pub fn for_merge(
    merge: &MergeEvent,
    primary: &Identity,
    secondary: &Identity,
  ) -> Self {
    Self {
      event_type: ChangeKind::IdentitiesMerged,
      public_number: primary.public_number.clone(),
      identity_id: primary.identity_id,
      patient_id: primary.patient_id,
      organization_id: merge.scope.organization_id,
      hospital_id: merge.scope.hospital_id,
      department_id: merge.scope.department_id,
      occurred_at: Utc::now(),
      primary_number: Some(primary.public_number.clone()),
      secondary_number: Some(secondary.public_number.clone()),
    }
  }
}

/// Forwards change payloads to an external channel, best-effort.
///
/// Implementations catch and log their own failures; a committed write never
/// appears to fail because notification failed. A disabled publisher is a
/// silent no-op.
pub trait EventPublisher: Send + Sync {
  fn publish(&self, event: ChangeEvent);
}

/// Publisher that drops every event. Stands in where notification is not
/// wired up (tests, offline tooling).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
  fn publish(&self, _event: ChangeEvent) {}
}
