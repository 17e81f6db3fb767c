//! Integration tests for `SqliteStore` against an in-memory database.

use mpi_core::{
  Classify, ErrorKind,
  alias::{AliasKind, NewAlias},
  context::{ActorContext, TenantScope},
  event::ChangeKind,
  identity::{IdentityStatus, LinkRequest, ResolutionState},
  merge::{MergeRequest, MergeType},
  store::IdentityStore,
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn actor() -> ActorContext { ActorContext::bare(Uuid::new_v4()) }

fn link(patient_id: Uuid) -> LinkRequest {
  LinkRequest { patient_id: Some(patient_id), ..Default::default() }
}

fn link_with_alias(
  patient_id: Uuid,
  kind: AliasKind,
  value: &str,
) -> LinkRequest {
  LinkRequest {
    patient_id:  Some(patient_id),
    alias_kind:  Some(kind),
    alias_value: Some(value.into()),
    ..Default::default()
  }
}

fn alias(kind: AliasKind, value: &str) -> NewAlias {
  NewAlias {
    kind: Some(kind),
    value: Some(value.into()),
    source_system: None,
  }
}

fn duplicate_merge(secondary_id: Uuid) -> MergeRequest {
  MergeRequest {
    secondary_id,
    merge_type: MergeType::Duplicate,
    resolution: ResolutionState::Confirmed,
    notes:      None,
  }
}

// ─── Linking ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn link_creates_identity_with_public_number() {
  let s = store().await;
  let who = actor();

  let out = s.link_identity(link(Uuid::new_v4()), who.clone()).await.unwrap();
  assert!(out.created);
  assert!(out.wrote());

  let identity = &out.identity;
  assert!(identity.public_number.starts_with("EMP-"));
  assert_eq!(identity.public_number.len(), 10);
  assert!(
    identity.public_number[4..].chars().all(|c| c.is_ascii_digit())
  );
  assert_eq!(identity.status, IdentityStatus::Active);
  assert_eq!(identity.resolution, ResolutionState::Unverified);
  assert!(identity.active);
  assert!(identity.aliases.is_empty());
  assert_eq!(identity.created_by, who.actor_id);

  let event = out.change_event().unwrap();
  assert_eq!(event.event_type, ChangeKind::IdentityLinked);
  assert_eq!(event.public_number, identity.public_number);
}

#[tokio::test]
async fn public_numbers_are_unique() {
  let s = store().await;

  let mut numbers = std::collections::HashSet::new();
  for _ in 0..20 {
    let out = s.link_identity(link(Uuid::new_v4()), actor()).await.unwrap();
    assert!(numbers.insert(out.identity.public_number.clone()));
  }
}

#[tokio::test]
async fn link_same_patient_is_idempotent() {
  let s = store().await;
  let patient = Uuid::new_v4();

  let first = s.link_identity(link(patient), actor()).await.unwrap();
  let second = s.link_identity(link(patient), actor()).await.unwrap();

  assert_eq!(second.identity.identity_id, first.identity.identity_id);
  assert!(!second.wrote());
  assert!(second.change_event().is_none());
}

#[tokio::test]
async fn link_attaches_alias_and_reports_the_right_event() {
  let s = store().await;
  let patient = Uuid::new_v4();

  let plain = s.link_identity(link(patient), actor()).await.unwrap();
  assert_eq!(
    plain.change_event().unwrap().event_type,
    ChangeKind::IdentityLinked
  );
  assert!(plain.identity.aliases.is_empty());

  let with_alias = s
    .link_identity(link_with_alias(patient, AliasKind::Mrn, "M-500"), actor())
    .await
    .unwrap();
  assert_eq!(with_alias.identity.identity_id, plain.identity.identity_id);
  assert!(with_alias.alias_attached);
  assert_eq!(
    with_alias.change_event().unwrap().event_type,
    ChangeKind::IdentityAliasCreated
  );
  assert_eq!(with_alias.identity.aliases.len(), 1);
  assert_eq!(with_alias.identity.aliases[0].kind, AliasKind::Mrn);
  assert_eq!(with_alias.identity.aliases[0].value, "M-500");

  // Identical repeat: same identity, still one alias row, no event.
  let repeat = s
    .link_identity(link_with_alias(patient, AliasKind::Mrn, "M-500"), actor())
    .await
    .unwrap();
  assert!(!repeat.wrote());
  assert!(repeat.change_event().is_none());
  assert_eq!(repeat.identity.aliases.len(), 1);
}

#[tokio::test]
async fn link_without_patient_id_is_a_validation_error() {
  let s = store().await;
  let err = s
    .link_identity(LinkRequest::default(), actor())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn link_with_half_an_alias_pair_is_a_validation_error() {
  let s = store().await;
  let request = LinkRequest {
    patient_id: Some(Uuid::new_v4()),
    alias_kind: Some(AliasKind::Passport),
    ..Default::default()
  };
  let err = s.link_identity(request, actor()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn link_merges_scalar_fields_last_write_wins() {
  let s = store().await;
  let patient = Uuid::new_v4();
  let org = Uuid::new_v4();

  s.link_identity(link(patient), actor()).await.unwrap();

  let mut request = link(patient);
  request.organization_id = Some(org);
  request.source_system = Some("his-north".into());
  let updated = s.link_identity(request, actor()).await.unwrap();
  assert!(updated.fields_updated);
  assert_eq!(
    updated.change_event().unwrap().event_type,
    ChangeKind::IdentityLinked
  );
  assert_eq!(updated.identity.scope.organization_id, Some(org));

  // A null request field never clears an existing value.
  let retained = s.link_identity(link(patient), actor()).await.unwrap();
  assert!(!retained.wrote());
  assert_eq!(retained.identity.scope.organization_id, Some(org));
  assert_eq!(retained.identity.source_system.as_deref(), Some("his-north"));
}

#[tokio::test]
async fn link_rejects_alias_owned_by_a_different_patient_binding() {
  let s = store().await;
  let p1 = Uuid::new_v4();

  s.link_identity(link_with_alias(p1, AliasKind::Mrn, "M-1"), actor())
    .await
    .unwrap();

  // A fresh patient arriving under an alias that is already bound: the
  // identity found by alias is linked to a different patient.
  let err = s
    .link_identity(link_with_alias(Uuid::new_v4(), AliasKind::Mrn, "M-1"), actor())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::PatientAlreadyLinked(_)));
  assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn link_rejects_binding_to_an_alias_held_elsewhere() {
  let s = store().await;
  let p1 = Uuid::new_v4();
  let p2 = Uuid::new_v4();

  s.link_identity(link(p1), actor()).await.unwrap();
  s.link_identity(link_with_alias(p2, AliasKind::Mrn, "M-2"), actor())
    .await
    .unwrap();

  // P1's identity exists; the request also names P2's alias. Reassignment
  // must go through the merge path.
  let err = s
    .link_identity(link_with_alias(p1, AliasKind::Mrn, "M-2"), actor())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::PatientAlreadyLinked(_)));
  assert_eq!(err.kind(), ErrorKind::Conflict);
}

// ─── Alias management ────────────────────────────────────────────────────────

#[tokio::test]
async fn add_alias_appends_and_stamps_the_actor() {
  let s = store().await;
  let who = actor();

  let identity = s
    .link_identity(link(Uuid::new_v4()), who.clone())
    .await
    .unwrap()
    .identity;
  let added = s
    .add_alias(
      identity.identity_id,
      alias(AliasKind::NationalId, "N-100"),
      who.clone(),
    )
    .await
    .unwrap();

  assert_eq!(added.alias.identity_id, identity.identity_id);
  assert_eq!(added.alias.created_by, who.actor_id);
  assert!(added.alias.active);
  assert_eq!(
    added.change_event().event_type,
    ChangeKind::IdentityAliasCreated
  );

  let fetched = s.get_identity(identity.identity_id).await.unwrap();
  assert_eq!(fetched.aliases.len(), 1);
}

#[tokio::test]
async fn add_alias_owned_by_another_identity_conflicts() {
  let s = store().await;

  let i1 = s
    .link_identity(
      link_with_alias(Uuid::new_v4(), AliasKind::NationalId, "N-900"),
      actor(),
    )
    .await
    .unwrap()
    .identity;
  let i2 = s
    .link_identity(link(Uuid::new_v4()), actor())
    .await
    .unwrap()
    .identity;
  assert_ne!(i1.identity_id, i2.identity_id);

  let err = s
    .add_alias(i2.identity_id, alias(AliasKind::NationalId, "N-900"), actor())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::AliasTaken { .. }));
  assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn add_alias_requires_kind_and_value() {
  let s = store().await;
  let identity = s
    .link_identity(link(Uuid::new_v4()), actor())
    .await
    .unwrap()
    .identity;

  let err = s
    .add_alias(identity.identity_id, NewAlias::default(), actor())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn add_alias_to_unknown_identity_is_not_found() {
  let s = store().await;
  let err = s
    .add_alias(Uuid::new_v4(), alias(AliasKind::Mrn, "M-1"), actor())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::IdentityNotFound(_)));
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn remove_alias_hard_deletes() {
  let s = store().await;
  let identity = s
    .link_identity(
      link_with_alias(Uuid::new_v4(), AliasKind::Passport, "P-77"),
      actor(),
    )
    .await
    .unwrap()
    .identity;
  let alias_id = identity.aliases[0].alias_id;

  s.remove_alias(identity.identity_id, alias_id).await.unwrap();

  let fetched = s.get_identity(identity.identity_id).await.unwrap();
  assert!(fetched.aliases.is_empty());

  // The pair is free again.
  let reused = s
    .add_alias(identity.identity_id, alias(AliasKind::Passport, "P-77"), actor())
    .await
    .unwrap();
  assert_eq!(reused.alias.value, "P-77");
}

#[tokio::test]
async fn remove_alias_owned_by_another_identity_is_not_found() {
  let s = store().await;

  let i1 = s
    .link_identity(link(Uuid::new_v4()), actor())
    .await
    .unwrap()
    .identity;
  let i2 = s
    .link_identity(
      link_with_alias(Uuid::new_v4(), AliasKind::Mrn, "M-42"),
      actor(),
    )
    .await
    .unwrap()
    .identity;
  let foreign_alias = i2.aliases[0].alias_id;

  let err = s
    .remove_alias(i1.identity_id, foreign_alias)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::AliasNotFound { .. }));
  assert_eq!(err.kind(), ErrorKind::NotFound);

  // Neither collection changed.
  assert!(s.get_identity(i1.identity_id).await.unwrap().aliases.is_empty());
  assert_eq!(s.get_identity(i2.identity_id).await.unwrap().aliases.len(), 1);
}

#[tokio::test]
async fn remove_alias_on_unknown_identity_is_not_found() {
  let s = store().await;
  let err = s
    .remove_alias(Uuid::new_v4(), Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::IdentityNotFound(_)));
}

// ─── Merging ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn merge_folds_the_secondary() {
  let s = store().await;
  let who = actor();

  let primary = s
    .link_identity(link(Uuid::new_v4()), who.clone())
    .await
    .unwrap()
    .identity;
  let secondary = s
    .link_identity(link(Uuid::new_v4()), who.clone())
    .await
    .unwrap()
    .identity;

  let out = s
    .merge_identities(
      primary.identity_id,
      duplicate_merge(secondary.identity_id),
      who.clone(),
    )
    .await
    .unwrap();

  assert_eq!(out.merge.primary_id, primary.identity_id);
  assert_eq!(out.merge.secondary_id, secondary.identity_id);
  assert_eq!(out.merge.merge_type, MergeType::Duplicate);
  assert_eq!(out.merge.merged_by, who.actor_id);
  assert!(!out.merge.undo_token.is_nil());

  assert_eq!(out.secondary.status, IdentityStatus::Merged);
  assert_eq!(out.secondary.resolution, ResolutionState::Confirmed);
  assert!(!out.secondary.active);
  assert_eq!(out.secondary.updated_by, who.actor_id);
  assert_eq!(out.primary.updated_by, who.actor_id);

  let event = out.change_event();
  assert_eq!(event.event_type, ChangeKind::IdentitiesMerged);
  assert_eq!(event.primary_number.as_deref(), Some(primary.public_number.as_str()));
  assert_eq!(
    event.secondary_number.as_deref(),
    Some(secondary.public_number.as_str())
  );

  let fetched = s.get_identity(secondary.identity_id).await.unwrap();
  assert_eq!(fetched.status, IdentityStatus::Merged);
}

#[tokio::test]
async fn merge_is_deliberately_not_idempotent() {
  let s = store().await;

  let primary = s
    .link_identity(link(Uuid::new_v4()), actor())
    .await
    .unwrap()
    .identity;
  let secondary = s
    .link_identity(link(Uuid::new_v4()), actor())
    .await
    .unwrap()
    .identity;

  s.merge_identities(
    primary.identity_id,
    duplicate_merge(secondary.identity_id),
    actor(),
  )
  .await
  .unwrap();

  let err = s
    .merge_identities(
      primary.identity_id,
      duplicate_merge(secondary.identity_id),
      actor(),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::AlreadyMerged(_)));
  assert_eq!(err.kind(), ErrorKind::BusinessRule);
}

#[tokio::test]
async fn merge_with_itself_fails_for_any_id() {
  let s = store().await;

  // An id that exists…
  let identity = s
    .link_identity(link(Uuid::new_v4()), actor())
    .await
    .unwrap()
    .identity;
  let err = s
    .merge_identities(
      identity.identity_id,
      duplicate_merge(identity.identity_id),
      actor(),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::SelfMerge));
  assert_eq!(err.kind(), ErrorKind::BusinessRule);

  // …and one that does not.
  let ghost = Uuid::new_v4();
  let err = s
    .merge_identities(ghost, duplicate_merge(ghost), actor())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::SelfMerge));
}

#[tokio::test]
async fn merge_with_unknown_participants_is_not_found() {
  let s = store().await;
  let known = s
    .link_identity(link(Uuid::new_v4()), actor())
    .await
    .unwrap()
    .identity;

  let err = s
    .merge_identities(Uuid::new_v4(), duplicate_merge(known.identity_id), actor())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::IdentityNotFound(_)));

  let err = s
    .merge_identities(known.identity_id, duplicate_merge(Uuid::new_v4()), actor())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::IdentityNotFound(_)));
}

#[tokio::test]
async fn merge_scope_prefers_primary_then_secondary_then_actor() {
  let s = store().await;
  let org = Uuid::new_v4();
  let hospital = Uuid::new_v4();
  let department = Uuid::new_v4();

  let mut primary_req = link(Uuid::new_v4());
  primary_req.organization_id = Some(org);
  let primary = s.link_identity(primary_req, actor()).await.unwrap().identity;

  let mut secondary_req = link(Uuid::new_v4());
  secondary_req.hospital_id = Some(hospital);
  let secondary = s
    .link_identity(secondary_req, actor())
    .await
    .unwrap()
    .identity;

  let mut who = actor();
  who.scope = TenantScope {
    organization_id: Some(Uuid::new_v4()), // shadowed by the primary's own
    hospital_id:     None,
    department_id:   Some(department),
  };

  let out = s
    .merge_identities(
      primary.identity_id,
      duplicate_merge(secondary.identity_id),
      who,
    )
    .await
    .unwrap();

  assert_eq!(out.merge.scope.organization_id, Some(org));
  assert_eq!(out.merge.scope.hospital_id, Some(hospital));
  assert_eq!(out.merge.scope.department_id, Some(department));
}

#[tokio::test]
async fn merge_department_tie_break_takes_the_lowest_permitted() {
  let s = store().await;

  let primary = s
    .link_identity(link(Uuid::new_v4()), actor())
    .await
    .unwrap()
    .identity;
  let secondary = s
    .link_identity(link(Uuid::new_v4()), actor())
    .await
    .unwrap()
    .identity;

  let low = Uuid::from_u128(1);
  let high = Uuid::from_u128(2);
  let mut who = actor();
  who.permitted_departments = vec![high, low];

  let out = s
    .merge_identities(
      primary.identity_id,
      duplicate_merge(secondary.identity_id),
      who,
    )
    .await
    .unwrap();

  assert_eq!(out.merge.scope.department_id, Some(low));
}

#[tokio::test]
async fn merge_does_not_migrate_secondary_content() {
  let s = store().await;
  let secondary_patient = Uuid::new_v4();

  let primary = s
    .link_identity(link(Uuid::new_v4()), actor())
    .await
    .unwrap()
    .identity;
  let secondary = s
    .link_identity(
      link_with_alias(secondary_patient, AliasKind::Mrn, "M-KEEP"),
      actor(),
    )
    .await
    .unwrap()
    .identity;

  s.merge_identities(
    primary.identity_id,
    duplicate_merge(secondary.identity_id),
    actor(),
  )
  .await
  .unwrap();

  let primary = s.get_identity(primary.identity_id).await.unwrap();
  let secondary = s.get_identity(secondary.identity_id).await.unwrap();
  assert!(primary.aliases.is_empty());
  assert_eq!(secondary.aliases.len(), 1);
  assert_eq!(secondary.patient_id, Some(secondary_patient));
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_identity_by_number_roundtrip() {
  let s = store().await;
  let identity = s
    .link_identity(link(Uuid::new_v4()), actor())
    .await
    .unwrap()
    .identity;

  let fetched = s
    .get_identity_by_number(identity.public_number.clone())
    .await
    .unwrap();
  assert_eq!(fetched.identity_id, identity.identity_id);

  let err = s
    .get_identity_by_number("EMP-MISSING".into())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn get_unknown_identity_is_not_found() {
  let s = store().await;
  let err = s.get_identity(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::IdentityNotFound(_)));
}

#[tokio::test]
async fn find_by_patient_excludes_merged_identities() {
  let s = store().await;
  let secondary_patient = Uuid::new_v4();

  let primary = s
    .link_identity(link(Uuid::new_v4()), actor())
    .await
    .unwrap()
    .identity;
  let secondary = s
    .link_identity(link(secondary_patient), actor())
    .await
    .unwrap()
    .identity;

  assert!(s.find_by_patient(secondary_patient).await.unwrap().is_some());

  s.merge_identities(
    primary.identity_id,
    duplicate_merge(secondary.identity_id),
    actor(),
  )
  .await
  .unwrap();

  // The folded identity no longer resolves by patient, but is still
  // readable by id.
  assert!(s.find_by_patient(secondary_patient).await.unwrap().is_none());
  assert!(s.get_identity(secondary.identity_id).await.is_ok());
}

#[tokio::test]
async fn find_by_alias_roundtrip() {
  let s = store().await;
  let identity = s
    .link_identity(
      link_with_alias(Uuid::new_v4(), AliasKind::NationalId, "N-7"),
      actor(),
    )
    .await
    .unwrap()
    .identity;

  let found = s
    .find_by_alias(AliasKind::NationalId, "N-7".into())
    .await
    .unwrap();
  assert_eq!(found.unwrap().identity_id, identity.identity_id);

  let missing = s
    .find_by_alias(AliasKind::NationalId, "N-8".into())
    .await
    .unwrap();
  assert!(missing.is_none());
}
