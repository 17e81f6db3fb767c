//! The `IdentityStore` trait and operation outcome types.
//!
//! The trait is implemented by storage backends (e.g. `mpi-store-sqlite`).
//! Higher layers depend on this abstraction, not on any concrete backend.
//! Every write method runs start-to-finish inside one storage transaction,
//! uniqueness re-checks included; no internal scheduler or background task
//! exists.

use std::future::Future;

use uuid::Uuid;

use crate::{
  alias::{Alias, AliasKind, NewAlias},
  context::ActorContext,
  error::Classify,
  event::{ChangeEvent, ChangeKind},
  identity::{Identity, LinkRequest},
  merge::{MergeEvent, MergeRequest},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of [`IdentityStore::link_identity`]. Tracks what was actually
/// written so the caller can publish the right event — or none at all for a
/// repeated identical request.
#[derive(Debug, Clone)]
pub struct LinkOutcome {
  pub identity:       Identity,
  /// A new identity was created this call.
  pub created:        bool,
  /// Scalar fields changed on an existing identity.
  pub fields_updated: bool,
  /// The supplied alias was attached this call.
  pub alias_attached: bool,
}

impl LinkOutcome {
  /// Whether the call persisted anything.
  pub fn wrote(&self) -> bool {
    self.created || self.fields_updated || self.alias_attached
  }

  /// The event to publish, if any: alias attachment wins over a plain link,
  /// and a no-op write publishes nothing.
  pub fn change_event(&self) -> Option<ChangeEvent> {
    if self.alias_attached {
      Some(ChangeEvent::for_identity(
        ChangeKind::IdentityAliasCreated,
        &self.identity,
      ))
    } else if self.wrote() {
      Some(ChangeEvent::for_identity(
        ChangeKind::IdentityLinked,
        &self.identity,
      ))
    } else {
      None
    }
  }
}

/// Result of [`IdentityStore::add_alias`].
#[derive(Debug, Clone)]
pub struct AliasAdded {
  pub identity: Identity,
  pub alias:    Alias,
}

impl AliasAdded {
  pub fn change_event(&self) -> ChangeEvent {
    ChangeEvent::for_identity(ChangeKind::IdentityAliasCreated, &self.identity)
  }
}

/// Result of [`IdentityStore::merge_identities`], after all writes
/// committed.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
  pub merge:     MergeEvent,
  pub primary:   Identity,
  pub secondary: Identity,
}

impl MergeOutcome {
  pub fn change_event(&self) -> ChangeEvent {
    ChangeEvent::for_merge(&self.merge, &self.primary, &self.secondary)
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Master Patient Index backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait IdentityStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Resolve `(patient id, alias)` to a canonical identity, creating one if
  /// nothing matches. Idempotent for repeated identical input: the second
  /// call is a no-op returning the same logical state.
  fn link_identity(
    &self,
    request: LinkRequest,
    actor: ActorContext,
  ) -> impl Future<Output = Result<LinkOutcome, Self::Error>> + Send + '_;

  /// Attach a new alias to an existing identity.
  fn add_alias(
    &self,
    identity_id: Uuid,
    request: NewAlias,
    actor: ActorContext,
  ) -> impl Future<Output = Result<AliasAdded, Self::Error>> + Send + '_;

  /// Hard-remove an alias that belongs to `identity_id` specifically.
  /// No event is emitted — intentionally asymmetric with add.
  fn remove_alias(
    &self,
    identity_id: Uuid,
    alias_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Fold `request.secondary_id` into `primary_id`. Deliberately not
  /// idempotent: a second call against the same secondary fails rather than
  /// silently double-processing.
  fn merge_identities(
    &self,
    primary_id: Uuid,
    request: MergeRequest,
    actor: ActorContext,
  ) -> impl Future<Output = Result<MergeOutcome, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Fetch by id; an absent identity is a not-found error.
  fn get_identity(
    &self,
    identity_id: Uuid,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Fetch by public number; an absent number is a not-found error.
  fn get_identity_by_number(
    &self,
    public_number: String,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Look up the non-merged identity linked to `patient_id`, if any.
  fn find_by_patient(
    &self,
    patient_id: Uuid,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  /// Look up the identity owning `(kind, value)`, if any.
  fn find_by_alias(
    &self,
    kind: AliasKind,
    value: String,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;
}
