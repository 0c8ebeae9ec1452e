use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use waggle_types::api::{MatchResult, MessageResponse};
use waggle_types::events::GatewayEvent;

/// Routes targeted events to currently-connected clients.
///
/// The routing table lives for the process only. A user without a registered
/// channel simply misses the event; store rows stay the source of truth and
/// clients re-fetch on reconnect, so nothing is queued or replayed.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Per-user targeted send channels: user_id -> (conn_id, sender)
    user_channels: RwLock<HashMap<Uuid, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                user_channels: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register a per-user targeted channel. Returns (conn_id, receiver).
    /// A newer connection for the same user takes over the slot.
    pub async fn register_user_channel(
        &self,
        user_id: Uuid,
    ) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .user_channels
            .write()
            .await
            .insert(user_id, (conn_id, tx));
        (conn_id, rx)
    }

    /// Unregister a per-user targeted channel, but only if conn_id matches.
    /// A stale disconnect must never tear down a newer session.
    pub async fn unregister_user_channel(&self, user_id: Uuid, conn_id: Uuid) {
        let mut channels = self.inner.user_channels.write().await;
        if let Some((stored_conn_id, _)) = channels.get(&user_id) {
            if *stored_conn_id == conn_id {
                channels.remove(&user_id);
            }
        }
    }

    /// Send a targeted event to a specific user. Delivery is at most once:
    /// offline recipients are skipped and nothing is retried.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) {
        let channels = self.inner.user_channels.read().await;
        match channels.get(&user_id) {
            Some((_, tx)) => {
                if tx.send(event).is_err() {
                    debug!("Gateway channel for {} is closing, event dropped", user_id);
                }
            }
            None => {
                debug!("No gateway session for {}, event dropped", user_id);
            }
        }
    }

    /// Notify both parties that a swipe confirmed their match.
    pub async fn send_match_notification(&self, user_a: Uuid, user_b: Uuid, result: &MatchResult) {
        for user_id in [user_a, user_b] {
            self.send_to_user(
                user_id,
                GatewayEvent::ReceiveMatchNotification {
                    result: result.clone(),
                },
            )
            .await;
        }
    }

    /// Notify the recipient of a freshly stored message.
    pub async fn send_message_notification(&self, recipient_id: Uuid, message: &MessageResponse) {
        self.send_to_user(
            recipient_id,
            GatewayEvent::ReceiveMessage {
                message: message.clone(),
            },
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn match_result() -> MatchResult {
        MatchResult {
            match_id: Some(Uuid::new_v4()),
            confirmed: true,
        }
    }

    #[tokio::test]
    async fn match_notification_reaches_both_parties_once() {
        let dispatcher = Dispatcher::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (_, mut rx_a) = dispatcher.register_user_channel(a).await;
        let (_, mut rx_b) = dispatcher.register_user_channel(b).await;

        dispatcher.send_match_notification(a, b, &match_result()).await;

        assert!(matches!(
            rx_a.try_recv(),
            Ok(GatewayEvent::ReceiveMatchNotification { .. })
        ));
        assert!(rx_a.try_recv().is_err(), "exactly one event per party");
        assert!(matches!(
            rx_b.try_recv(),
            Ok(GatewayEvent::ReceiveMatchNotification { .. })
        ));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn offline_recipient_is_skipped() {
        let dispatcher = Dispatcher::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (_, mut rx_a) = dispatcher.register_user_channel(a).await;

        // b never connected; only a's channel sees anything.
        dispatcher.send_match_notification(a, b, &match_result()).await;
        assert!(rx_a.try_recv().is_ok());
    }

    #[tokio::test]
    async fn stale_disconnect_keeps_newer_session() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();

        let (old_conn, _old_rx) = dispatcher.register_user_channel(user).await;
        let (_new_conn, mut new_rx) = dispatcher.register_user_channel(user).await;

        // The old connection unwinds after the new one registered.
        dispatcher.unregister_user_channel(user, old_conn).await;

        dispatcher
            .send_to_user(
                user,
                GatewayEvent::Ready {
                    user_id: user,
                    name: "ada".to_string(),
                },
            )
            .await;
        assert!(new_rx.try_recv().is_ok(), "newer session must survive");
    }
}
