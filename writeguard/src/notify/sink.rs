//! Notification sink trait and implementations.

use super::{Notification, Severity};
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Receives phase-by-phase save notifications.
///
/// Implementations must not fail; delivery problems are logged and
/// swallowed so they can never affect the save itself.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers a notification.
    async fn notify(&self, notification: Notification);
}

/// A sink that discards all notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNotificationSink;

#[async_trait]
impl NotificationSink for NoOpNotificationSink {
    async fn notify(&self, _notification: Notification) {
        // Intentionally empty - discards all notifications
    }
}

/// A sink that writes notifications to the tracing framework, choosing the
/// level from the notification's severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotificationSink;

impl LoggingNotificationSink {
    /// Creates a new logging sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for LoggingNotificationSink {
    async fn notify(&self, notification: Notification) {
        let event_type = notification.event_type();
        let message = notification.message();
        match notification.severity() {
            Severity::Info | Severity::Success => {
                info!(event_type = %event_type, "{}", message);
            }
            Severity::Warning => warn!(event_type = %event_type, "{}", message),
            Severity::Error => error!(event_type = %event_type, "{}", message),
        }
    }
}

/// A sink that records every notification, for tests and audit views.
#[derive(Debug, Default)]
pub struct CollectingNotificationSink {
    notifications: RwLock<Vec<Notification>>,
}

impl CollectingNotificationSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected notifications.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.read().clone()
    }

    /// Returns the event types in order of arrival.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        self.notifications
            .read()
            .iter()
            .map(Notification::event_type)
            .collect()
    }

    /// Returns the number of collected notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notifications.read().len()
    }

    /// Returns true if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifications.read().is_empty()
    }

    /// Clears all collected notifications.
    pub fn clear(&self) {
        self.notifications.write().clear();
    }
}

#[async_trait]
impl NotificationSink for CollectingNotificationSink {
    async fn notify(&self, notification: Notification) {
        self.notifications.write().push(notification);
    }
}

/// A sink that forwards notifications over an unbounded channel, e.g. to a
/// UI task rendering toasts.
#[derive(Debug, Clone)]
pub struct ChannelNotificationSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotificationSink {
    /// Creates a sink and the receiver that consumes its notifications.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotificationSink for ChannelNotificationSink {
    async fn notify(&self, notification: Notification) {
        if let Err(err) = self.tx.send(notification) {
            debug!(event_type = %err.0.event_type(), "Notification receiver dropped");
        }
    }
}
