use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use waggle_db::Database;
use waggle_db::models::MessageRow;
use waggle_types::api::MessageResponse;
use waggle_types::events::{GatewayCommand, GatewayEvent};
use waggle_types::time;

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Handle a WebSocket connection. The JWT was already validated at the HTTP
/// upgrade layer, so the loop starts with Ready and goes straight to events.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    db: Arc<Database>,
    user_id: Uuid,
    name: String,
) {
    let (mut sender, mut receiver) = socket.split();

    info!("{} ({}) connected to gateway", name, user_id);

    let ready = GatewayEvent::Ready {
        user_id,
        name: name.clone(),
    };
    if sender
        .send(Message::Text(serde_json::to_string(&ready).unwrap().into()))
        .await
        .is_err()
    {
        return;
    }

    let (conn_id, mut user_rx) = dispatcher.register_user_channel(user_id).await;

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward targeted events to the client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = user_rx.recv() => {
                    let event = match result {
                        Some(event) => event,
                        None => break,
                    };
                    let text = serde_json::to_string(&event).unwrap();
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from the client
    let dispatcher_recv = dispatcher.clone();
    let name_recv = name.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => {
                        handle_command(&dispatcher_recv, &db, user_id, cmd).await;
                    }
                    Err(e) => {
                        warn!(
                            "{} ({}) bad command: {} -- raw: {}",
                            name_recv,
                            user_id,
                            e,
                            clip_for_log(&text, 200)
                        );
                        dispatcher_recv
                            .send_to_user(
                                user_id,
                                GatewayEvent::Error {
                                    message: "Unrecognized command".to_string(),
                                },
                            )
                            .await;
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.unregister_user_channel(user_id, conn_id).await;
    info!("{} ({}) disconnected from gateway", name, user_id);
}

async fn handle_command(
    dispatcher: &Dispatcher,
    db: &Arc<Database>,
    user_id: Uuid,
    cmd: GatewayCommand,
) {
    match cmd {
        GatewayCommand::SendMessage {
            recipient_id,
            content,
        } => {
            if recipient_id == user_id {
                send_error(dispatcher, user_id, "Cannot message yourself").await;
                return;
            }
            if content.trim().is_empty() {
                send_error(dispatcher, user_id, "Message content must not be empty").await;
                return;
            }

            let message_id = Uuid::new_v4();
            let db = db.clone();
            let stored = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<MessageRow>> {
                let sender_id = user_id.to_string();
                let rid = recipient_id.to_string();
                if db.get_user_by_id(&rid)?.is_none() || db.get_user_by_id(&sender_id)?.is_none() {
                    return Ok(None);
                }
                let row = db.insert_message(&message_id.to_string(), &sender_id, &rid, &content)?;
                Ok(Some(row))
            })
            .await;

            let row = match stored {
                Ok(Ok(Some(row))) => row,
                Ok(Ok(None)) => {
                    send_error(dispatcher, user_id, "Recipient not found").await;
                    return;
                }
                Ok(Err(e)) => {
                    error!("Message insert failed: {}", e);
                    send_error(dispatcher, user_id, "Could not store message").await;
                    return;
                }
                Err(e) => {
                    error!("spawn_blocking join error: {}", e);
                    return;
                }
            };

            let message = MessageResponse {
                id: row.id.parse().unwrap_or_else(|e| {
                    warn!("Corrupt message id '{}': {}", row.id, e);
                    Uuid::default()
                }),
                sender_id: user_id,
                recipient_id,
                content: row.content,
                sent_at: time::parse_sqlite_datetime_lossy(
                    &row.sent_at,
                    &format!("message '{}'", row.id),
                ),
                read: row.read,
            };

            // Recipient is notified once; the sender's session gets the stored
            // copy back as its delivery confirmation.
            dispatcher
                .send_message_notification(recipient_id, &message)
                .await;
            dispatcher
                .send_to_user(user_id, GatewayEvent::ReceiveMessage { message })
                .await;
        }
    }
}

async fn send_error(dispatcher: &Dispatcher, user_id: Uuid, message: &str) {
    dispatcher
        .send_to_user(
            user_id,
            GatewayEvent::Error {
                message: message.to_string(),
            },
        )
        .await;
}

/// Clip client-supplied text to at most `max` bytes for a log line, backing
/// off to the previous char boundary so multibyte input never splits.
fn clip_for_log(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_db(dir: &tempfile::TempDir) -> Arc<Database> {
        Arc::new(Database::open(&dir.path().join("gateway.db")).unwrap())
    }

    fn add_user(db: &Database, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        db.create_user(
            &id.to_string(),
            name,
            &format!("{}@example.com", name),
            "hash",
        )
        .unwrap();
        id
    }

    #[test]
    fn clip_for_log_never_splits_a_char() {
        let mut text = "a".repeat(199);
        text.push('ü');
        assert_eq!(text.len(), 201);

        // Byte 200 lands inside the two-byte 'ü'; the clip backs off to 199.
        assert_eq!(clip_for_log(&text, 200), "a".repeat(199));
        assert_eq!(clip_for_log(&"b".repeat(300), 200).len(), 200);
        assert_eq!(clip_for_log("short", 200), "short");
    }

    #[tokio::test]
    async fn send_message_command_stores_and_notifies_both_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_db(&dir);
        let ada = add_user(&db, "ada");
        let brie = add_user(&db, "brie");

        let dispatcher = Dispatcher::new();
        let (_, mut rx_ada) = dispatcher.register_user_channel(ada).await;
        let (_, mut rx_brie) = dispatcher.register_user_channel(brie).await;

        handle_command(
            &dispatcher,
            &db,
            ada,
            GatewayCommand::SendMessage {
                recipient_id: brie,
                content: "hello".to_string(),
            },
        )
        .await;

        match rx_brie.try_recv().unwrap() {
            GatewayEvent::ReceiveMessage { message } => {
                assert_eq!(message.sender_id, ada);
                assert_eq!(message.recipient_id, brie);
                assert_eq!(message.content, "hello");
                assert!(!message.read);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        // The sender's session gets the stored copy, nothing more.
        assert!(matches!(
            rx_ada.try_recv(),
            Ok(GatewayEvent::ReceiveMessage { .. })
        ));
        assert!(rx_ada.try_recv().is_err());
        assert!(rx_brie.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_message_command_to_a_ghost_recipient_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_db(&dir);
        let ada = add_user(&db, "ada");

        let dispatcher = Dispatcher::new();
        let (_, mut rx_ada) = dispatcher.register_user_channel(ada).await;

        handle_command(
            &dispatcher,
            &db,
            ada,
            GatewayCommand::SendMessage {
                recipient_id: Uuid::new_v4(),
                content: "anyone there?".to_string(),
            },
        )
        .await;

        match rx_ada.try_recv().unwrap() {
            GatewayEvent::Error { message } => assert_eq!(message, "Recipient not found"),
            other => panic!("unexpected event: {:?}", other),
        }
        let stored: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(stored, 0);
    }
}
