//! Merge — folding a duplicate identity into a canonical one.
//!
//! A merge records intent only: the secondary is marked superseded, but its
//! aliases, patient link and metadata stay where they are. Reconciling
//! content is a separate, explicit step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  context::{ActorContext, TenantScope},
  identity::ResolutionState,
};

/// Why two identities are being folded together.
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
pub enum MergeType {
  Duplicate,
  Overlay,
  Manual,
}

/// An append-only record of one merge operation. Immutable once written,
/// never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeEvent {
  pub merge_id:     Uuid,
  pub primary_id:   Uuid,
  pub secondary_id: Uuid,
  pub scope:        TenantScope,
  pub merge_type:   MergeType,
  pub resolution:   ResolutionState,
  pub notes:        Option<String>,
  /// Single-use token reserved for a future undo operation; nothing
  /// consumes it today.
  pub undo_token:   Uuid,
  pub merged_by:    Uuid,
  pub merged_at:    DateTime<Utc>,
}

/// Input to [`crate::store::IdentityStore::merge_identities`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRequest {
  pub secondary_id: Uuid,
  pub merge_type:   MergeType,
  pub resolution:   ResolutionState,
  pub notes:        Option<String>,
}

/// Resolve the tenant scope recorded on a merge event.
///
/// Preference order per level: the primary's own scope, then the
/// secondary's, then the caller's ambient context. The department level
/// additionally falls back to the lowest-sorting of the caller's permitted
/// departments, which keeps the choice deterministic.
pub fn resolve_scope(
  primary: &TenantScope,
  secondary: &TenantScope,
  actor: &ActorContext,
) -> TenantScope {
  TenantScope {
    organization_id: primary
      .organization_id
      .or(secondary.organization_id)
      .or(actor.scope.organization_id),
    hospital_id: primary
      .hospital_id
      .or(secondary.hospital_id)
      .or(actor.scope.hospital_id),
    department_id: primary
      .department_id
      .or(secondary.department_id)
      .or(actor.scope.department_id)
      .or_else(|| actor.permitted_departments.iter().min().copied()),
  }
}
