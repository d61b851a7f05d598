//! Lifecycle notifications.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// A message announcing a completed lifecycle step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Notification {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

/// Delivers notifications to interested clients.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification);
}

impl fmt::Debug for dyn Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Notifier")
    }
}

/// Fan-out notifier backed by a broadcast channel.
///
/// Notifications sent while nobody subscribes are dropped.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    /// Create a notifier buffering up to `capacity` notifications per
    /// lagging subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(16)
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn notify(&self, notification: Notification) {
        let kind = notification.kind.clone();
        match self.sender.send(notification) {
            Ok(receivers) => debug!(kind, receivers, "notification sent"),
            Err(_) => debug!(kind, "notification dropped, no subscribers"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let notifier = BroadcastNotifier::default();
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();

        notifier.notify(Notification::new("installed")).await;

        assert_eq!(a.recv().await.unwrap().kind, "installed");
        assert_eq!(b.recv().await.unwrap().kind, "installed");
    }

    #[tokio::test]
    async fn test_no_subscribers_is_not_an_error() {
        BroadcastNotifier::new(1)
            .notify(Notification::new("activated"))
            .await;
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_string(&Notification::new("installed")).unwrap();
        assert_eq!(json, r#"{"type":"installed"}"#);
    }
}
