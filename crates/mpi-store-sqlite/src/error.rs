//! Error type for `mpi-store-sqlite`.

use mpi_core::{Classify, ErrorKind, alias::AliasKind};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] mpi_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("stored value could not be decoded: {0}")]
  Decode(String),

  #[error("identity not found: {0}")]
  IdentityNotFound(Uuid),

  #[error("identity number not found: {0}")]
  NumberNotFound(String),

  /// The alias id is absent, or belongs to a different identity than the
  /// one named in the request.
  #[error("alias {alias_id} not found on identity {identity_id}")]
  AliasNotFound { identity_id: Uuid, alias_id: Uuid },

  #[error("alias {kind} {value:?} is already in use")]
  AliasTaken { kind: AliasKind, value: String },

  /// Linking would rebind a patient/identity pair; reassignment goes
  /// through the merge path, never through linking.
  #[error("patient link conflicts with identity {0}; reassign via merge")]
  PatientAlreadyLinked(Uuid),

  #[error("cannot merge an identity into itself")]
  SelfMerge,

  #[error("identity {0} is already merged")]
  AlreadyMerged(Uuid),

  /// An alias row exists with no resolvable owning identity.
  #[error("alias {kind} {value:?} has no owning identity")]
  OrphanAlias { kind: AliasKind, value: String },

  #[error("public number space exhausted after {0} attempts")]
  NumberSpaceExhausted(u32),
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::Core(e) => e.kind(),
      Error::Database(_)
      | Error::Sqlite(_)
      | Error::Json(_)
      | Error::Uuid(_)
      | Error::Decode(_) => ErrorKind::Storage,
      Error::IdentityNotFound(_)
      | Error::NumberNotFound(_)
      | Error::AliasNotFound { .. } => ErrorKind::NotFound,
      Error::AliasTaken { .. } | Error::PatientAlreadyLinked(_) => {
        ErrorKind::Conflict
      }
      Error::SelfMerge | Error::AlreadyMerged(_) => ErrorKind::BusinessRule,
      Error::OrphanAlias { .. } | Error::NumberSpaceExhausted(_) => {
        ErrorKind::Integrity
      }
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
