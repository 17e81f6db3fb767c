//! Broadcast-channel change-event publisher.
//!
//! Delivery is best-effort by contract: the domain write has already
//! committed when `publish` runs, so every failure here is caught, logged
//! and dropped — never rolled back, retried, or surfaced to the caller.
//! Send order on the channel preserves per-identity ordering for
//! subscribers.

use mpi_core::event::{ChangeEvent, EventPublisher};
use tokio::sync::broadcast;

/// Publisher forwarding change events onto a broadcast channel.
pub struct ChangePublisher {
  tx:      broadcast::Sender<ChangeEvent>,
  enabled: bool,
}

impl ChangePublisher {
  pub fn new(capacity: usize, enabled: bool) -> Self {
    let (tx, _) = broadcast::channel(capacity);
    Self { tx, enabled }
  }

  /// Subscribe to the change stream.
  pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
    self.tx.subscribe()
  }
}

impl EventPublisher for ChangePublisher {
  fn publish(&self, event: ChangeEvent) {
    if !self.enabled {
      return;
    }
    match self.tx.send(event) {
      Ok(receivers) => {
        tracing::debug!(receivers, "change event published");
      }
      Err(broadcast::error::SendError(event)) => {
        tracing::warn!(
          event_type = %event.event_type,
          public_number = %event.public_number,
          "change event dropped; no active subscribers"
        );
      }
    }
  }
}

/// Consume the change stream and log every event; keeps one subscriber
/// attached for the life of the server. Runs until the channel closes.
pub async fn log_stream(mut rx: broadcast::Receiver<ChangeEvent>) {
  loop {
    match rx.recv().await {
      Ok(event) => {
        tracing::info!(
          event_type = %event.event_type,
          public_number = %event.public_number,
          identity_id = %event.identity_id,
          "identity change"
        );
      }
      Err(broadcast::error::RecvError::Lagged(missed)) => {
        tracing::warn!(missed, "change stream lagged; events skipped");
      }
      Err(broadcast::error::RecvError::Closed) => break,
    }
  }
}
