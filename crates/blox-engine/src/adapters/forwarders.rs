//! Event forwarder implementations.

use crate::events::TxNotification;
use crate::ports::outbound::EventForwarder;

/// Collects every forwarded notification.
#[derive(Debug, Default)]
pub struct RecordingForwarder {
    /// Notifications received, in order.
    pub notifications: Vec<TxNotification>,
}

impl RecordingForwarder {
    /// Creates a new recording forwarder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventForwarder for RecordingForwarder {
    fn forward(&mut self, notification: &TxNotification) -> Result<(), String> {
        self.notifications.push(notification.clone());
        Ok(())
    }
}

/// Refuses every notification. Forwarder failures must never affect the
/// engine's own outcome; this adapter exists to prove it.
#[derive(Debug, Default)]
pub struct DroppingForwarder {
    /// Number of notifications refused.
    pub refused: usize,
}

impl EventForwarder for DroppingForwarder {
    fn forward(&mut self, _notification: &TxNotification) -> Result<(), String> {
        self.refused += 1;
        Err("forwarder offline".to_string())
    }
}
