//! JSON REST API for the Master Patient Index.
//!
//! Exposes an axum [`Router`] backed by any
//! [`mpi_core::store::IdentityStore`]. Auth, TLS, and transport concerns are
//! the caller's responsibility; the routes carry the index's logical
//! operations and nothing more.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", mpi_api::api_router(state))
//! ```

pub mod aliases;
pub mod context;
pub mod error;
pub mod identities;
pub mod merges;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use mpi_core::{event::EventPublisher, store::IdentityStore};

pub use context::Caller;
pub use error::ApiError;


/// Shared state threaded through all handlers.
///
/// Handlers publish change events through `events` only after the store call
/// — and therefore the transaction — has returned.
pub struct ApiState<S> {
  pub store:  Arc<S>,
  pub events: Arc<dyn EventPublisher>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      events: Arc::clone(&self.events),
    }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: IdentityStore + 'static,
{
  Router::new()
    // Resolution
    .route("/identities/link", post(identities::link::<S>))
    // Reads
    .route("/identities", get(identities::find::<S>))
    .route("/identities/{id}", get(identities::get_one::<S>))
    .route(
      "/identities/by-number/{number}",
      get(identities::get_by_number::<S>),
    )
    // Aliases
    .route("/identities/{id}/aliases", post(aliases::create::<S>))
    .route(
      "/identities/{id}/aliases/{alias_id}",
      delete(aliases::remove::<S>),
    )
    // Merge
    .route("/identities/{id}/merge", post(merges::create::<S>))
    .with_state(state)
}
