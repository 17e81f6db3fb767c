//! Error taxonomy for `mpi-core`.
//!
//! The index distinguishes error *kind* only; transport layers map kinds to
//! their own status codes.

use serde::Serialize;
use thiserror::Error;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  /// Malformed or incomplete request.
  Validation,
  /// Referenced identity or alias is absent, or not owned as stated.
  NotFound,
  /// Alias bound elsewhere, or patient bound to a different identity.
  Conflict,
  /// Self-merge, or merging an already-merged identity.
  BusinessRule,
  /// The index contradicts its own invariants.
  Integrity,
  /// The storage backend failed.
  Storage,
}

/// Implemented by every error surfaced through
/// [`crate::store::IdentityStore`], so callers can map kind without knowing
/// the backend's concrete error type.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

/// Request-shape errors, raised before the store is touched.
#[derive(Debug, Error)]
pub enum Error {
  #[error("patient id is required")]
  MissingPatientId,

  #[error("alias type and alias value must be supplied together")]
  AliasPairIncomplete,

  #[error("alias type and alias value are required")]
  AliasFieldsRequired,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::MissingPatientId
      | Error::AliasPairIncomplete
      | Error::AliasFieldsRequired => ErrorKind::Validation,
      Error::Serialization(_) => ErrorKind::Storage,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
