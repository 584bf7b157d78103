/// Status bus - fan-in of status events for the user-facing surface
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::types::StatusEvent;

/// Cloneable publisher side of the status channel
#[derive(Debug, Clone)]
pub struct StatusBus {
    tx: mpsc::UnboundedSender<StatusEvent>,
}

impl StatusBus {
    /// Create a bus and the receiver the UI drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (StatusBus { tx }, rx)
    }

    /// Publish an event; a closed surface is not an error for the publisher
    pub fn publish(&self, event: StatusEvent) {
        if event.is_error() {
            warn!(session = ?event.session_id, "{}", event.status_line());
        } else {
            info!(session = ?event.session_id, "{}", event.status_line());
        }

        if self.tx.send(event).is_err() {
            debug!("Status receiver dropped, event discarded");
        }
    }
}
