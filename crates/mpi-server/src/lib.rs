//! Server wiring for the Master Patient Index.
//!
//! Exposes the runtime configuration and the broadcast-based change-event
//! publisher; the binary in `src/main.rs` assembles them around
//! [`mpi_api::api_router`].

pub mod events;

use std::path::PathBuf;

use serde::Deserialize;

/// Runtime server configuration, deserialised from `config.toml` and
/// `MPI_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// When false, every publish is a silent no-op; domain writes are
  /// unaffected.
  #[serde(default = "default_events_enabled")]
  pub events_enabled: bool,
  /// Capacity of the in-process broadcast channel.
  #[serde(default = "default_event_buffer")]
  pub event_buffer: usize,
}

fn default_events_enabled() -> bool { true }

fn default_event_buffer() -> usize { 1024 }
