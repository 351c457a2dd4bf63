use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use keep_types::events::PushEvent;

use crate::sink::{DeliveryError, Notification, NotificationSink};

/// Live per-user channels for the notifications WebSocket.
#[derive(Clone, Default)]
pub struct PushHub {
    /// user_id -> (conn_id, sender). The newest connection wins.
    channels: Arc<RwLock<HashMap<Uuid, (Uuid, mpsc::UnboundedSender<PushEvent>)>>>,
}

impl PushHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `user_id`. Returns (conn_id, receiver).
    pub async fn register(&self, user_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<PushEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels.write().await.insert(user_id, (conn_id, tx));
        debug!("Push channel {} registered for {}", conn_id, user_id);
        (conn_id, rx)
    }

    /// Unregister, but only if `conn_id` still owns the slot.
    pub async fn unregister(&self, user_id: Uuid, conn_id: Uuid) {
        let mut channels = self.channels.write().await;
        if channels.get(&user_id).is_some_and(|(current, _)| *current == conn_id) {
            channels.remove(&user_id);
        }
    }

    /// Returns false when the user has no open channel.
    pub async fn send_to_user(&self, user_id: Uuid, event: PushEvent) -> bool {
        let channels = self.channels.read().await;
        match channels.get(&user_id) {
            Some((_, tx)) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

/// Pushes reminders to the owner's open WebSocket. Without one the
/// delivery fails and the engine retries on its next cycle.
pub struct PushSink {
    hub: PushHub,
}

impl PushSink {
    pub fn new(hub: PushHub) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl NotificationSink for PushSink {
    async fn deliver(&self, n: &Notification) -> Result<(), DeliveryError> {
        let event = PushEvent::Reminder {
            note_id: n.note_id,
            title: n.title.clone(),
            body: n.body.clone(),
            reminder_at: n.reminder_at,
        };

        if self.hub.send_to_user(n.recipient, event).await {
            Ok(())
        } else {
            Err(DeliveryError::NoRecipient(n.recipient))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn notification(recipient: Uuid) -> Notification {
        Notification {
            recipient,
            note_id: 42,
            title: "Milk".into(),
            body: "You have a reminder".into(),
            reminder_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn delivers_to_connected_user() {
        let hub = PushHub::new();
        let user = Uuid::new_v4();
        let (_conn, mut rx) = hub.register(user).await;

        let sink = PushSink::new(hub.clone());
        sink.deliver(&notification(user)).await.unwrap();

        match rx.recv().await {
            Some(PushEvent::Reminder { note_id, title, .. }) => {
                assert_eq!(note_id, 42);
                assert_eq!(title, "Milk");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn offline_user_is_a_failure() {
        let sink = PushSink::new(PushHub::new());
        let err = sink.deliver(&notification(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, DeliveryError::NoRecipient(_)));
    }

    #[tokio::test]
    async fn stale_connection_cannot_unregister_newer_one() {
        let hub = PushHub::new();
        let user = Uuid::new_v4();
        let (old, _old_rx) = hub.register(user).await;
        let (_new, mut new_rx) = hub.register(user).await;

        hub.unregister(user, old).await;
        assert!(hub.send_to_user(user, PushEvent::Ready).await);
        assert_eq!(new_rx.recv().await, Some(PushEvent::Ready));
    }
}
