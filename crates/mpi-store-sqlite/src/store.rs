//! [`SqliteStore`] — the SQLite implementation of [`IdentityStore`].

use std::path::Path;

use mpi_core::{
  alias::{AliasKind, NewAlias},
  context::ActorContext,
  identity::{Identity, LinkRequest},
  merge::MergeRequest,
  store::{AliasAdded, IdentityStore, LinkOutcome, MergeOutcome},
};
use uuid::Uuid;

use crate::{Error, Result, fetch, merge, resolve, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Master Patient Index backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection without a write transaction.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Run `f` inside one transaction: committed on success, rolled back on
  /// any error. Every uniqueness re-check of a write operation happens in
  /// here, alongside the writes it guards.
  async fn write_tx<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        match f(&tx) {
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          Err(error) => Ok(Err(error)),
        }
      })
      .await?
  }
}

// ─── IdentityStore impl ──────────────────────────────────────────────────────

impl IdentityStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn link_identity(
    &self,
    request: LinkRequest,
    actor: ActorContext,
  ) -> Result<LinkOutcome> {
    self
      .write_tx(move |conn| resolve::link_identity(conn, &request, &actor))
      .await
  }

  async fn add_alias(
    &self,
    identity_id: Uuid,
    request: NewAlias,
    actor: ActorContext,
  ) -> Result<AliasAdded> {
    self
      .write_tx(move |conn| resolve::add_alias(conn, identity_id, &request, &actor))
      .await
  }

  async fn remove_alias(&self, identity_id: Uuid, alias_id: Uuid) -> Result<()> {
    self
      .write_tx(move |conn| resolve::remove_alias(conn, identity_id, alias_id))
      .await
  }

  async fn merge_identities(
    &self,
    primary_id: Uuid,
    request: MergeRequest,
    actor: ActorContext,
  ) -> Result<MergeOutcome> {
    self
      .write_tx(move |conn| {
        merge::merge_identities(conn, primary_id, &request, &actor)
      })
      .await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_identity(&self, identity_id: Uuid) -> Result<Identity> {
    self
      .read(move |conn| fetch::identity_by_id(conn, identity_id))
      .await?
      .ok_or(Error::IdentityNotFound(identity_id))
  }

  async fn get_identity_by_number(
    &self,
    public_number: String,
  ) -> Result<Identity> {
    let wanted = public_number.clone();
    self
      .read(move |conn| fetch::identity_by_number(conn, &wanted))
      .await?
      .ok_or(Error::NumberNotFound(public_number))
  }

  async fn find_by_patient(&self, patient_id: Uuid) -> Result<Option<Identity>> {
    self
      .read(move |conn| fetch::identity_by_patient(conn, patient_id))
      .await
  }

  async fn find_by_alias(
    &self,
    kind: AliasKind,
    value: String,
  ) -> Result<Option<Identity>> {
    self
      .read(move |conn| fetch::identity_by_alias(conn, kind, &value))
      .await
  }
}
