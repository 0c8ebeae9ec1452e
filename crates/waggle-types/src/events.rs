use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{MatchResult, MessageResponse};

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, name: String },

    /// A chat message addressed to this user was stored
    ReceiveMessage { message: MessageResponse },

    /// A swipe just confirmed a match involving this user
    ReceiveMatchNotification { result: MatchResult },

    /// A command failed; the connection stays open
    Error { message: String },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Send a chat message directly to another user
    SendMessage { recipient_id: Uuid, content: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    // Mobile clients dispatch on the literal tag strings, so the variant
    // names are part of the wire contract.
    #[test]
    fn event_tags_match_client_handlers() {
        let event = GatewayEvent::ReceiveMatchNotification {
            result: MatchResult {
                match_id: None,
                confirmed: false,
            },
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "ReceiveMatchNotification");
        assert_eq!(value["data"]["confirmed"], false);

        let event = GatewayEvent::Ready {
            user_id: Uuid::nil(),
            name: "ada".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "Ready");
    }

    #[test]
    fn send_message_command_parses_from_client_json() {
        let raw = r#"{
            "type": "SendMessage",
            "data": {
                "recipient_id": "00000000-0000-0000-0000-000000000000",
                "content": "hi there"
            }
        }"#;
        let command: GatewayCommand = serde_json::from_str(raw).unwrap();
        let GatewayCommand::SendMessage {
            recipient_id,
            content,
        } = command;
        assert_eq!(recipient_id, Uuid::nil());
        assert_eq!(content, "hi there");
    }
}
