//! Socket protocol envelopes and action payloads.
//!
//! Every frame is a JSON object with an `action` name and an action-specific
//! `data` object. Outbound frames reuse the same shape so clients multiplex
//! both directions over one handler.

use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::{dao::models::ChatMessageEntity, error::DomainError};

/// Inbound frame.
#[derive(Debug, Deserialize)]
pub struct InboundEnvelope {
    pub action: Option<String>,
    #[serde(default)]
    pub data: Value,
    /// Echo group broadcasts back to the sender as well.
    #[serde(default)]
    pub tosender: bool,
}

impl InboundEnvelope {
    /// Parse a text frame, mapping malformed JSON to the protocol error.
    pub fn from_json_str(raw: &str) -> Result<Self, DomainError> {
        serde_json::from_str(raw).map_err(|_| DomainError::InvalidJson)
    }

    /// The action name, or the protocol error when absent or empty.
    pub fn action(&self) -> Result<&str, DomainError> {
        match self.action.as_deref() {
            Some(action) if !action.is_empty() => Ok(action),
            _ => Err(DomainError::ActionRequired),
        }
    }

    /// Decode the `data` object into an action payload.
    pub fn data_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, DomainError> {
        serde_json::from_value(self.data.clone()).map_err(|_| DomainError::InvalidJson)
    }
}

/// Outbound frame.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundEnvelope {
    pub action: String,
    pub data: Value,
    /// User the frame originated from, absent for broker-generated frames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<i64>,
}

impl OutboundEnvelope {
    pub fn new(action: impl Into<String>, data: Value) -> Self {
        Self {
            action: action.into(),
            data,
            user: None,
        }
    }

    pub fn from_user(action: impl Into<String>, data: Value, user: i64) -> Self {
        Self {
            action: action.into(),
            data,
            user: Some(user),
        }
    }

    /// Serialize into a websocket text frame.
    pub fn to_message(&self) -> Message {
        // Serialization of these plain structs cannot fail.
        let text = serde_json::to_string(self).unwrap_or_default();
        Message::Text(text.into())
    }
}

/// Error frame sent to the connection that caused the failure.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub errorcode: String,
    pub error: String,
    /// Always empty; kept so clients parsing the historical shape keep working.
    pub stacktrace: String,
}

impl From<&DomainError> for ErrorPayload {
    fn from(err: &DomainError) -> Self {
        Self {
            errorcode: err.code().to_owned(),
            error: err.localized(),
            stacktrace: String::new(),
        }
    }
}

/// Chat author inside a [`ChatMessageView`].
#[derive(Debug, Clone, Serialize)]
pub struct ChatUserView {
    pub id: i64,
    pub name: String,
}

/// Wire shape of a chat message, for `chatmsg` frames and history pages.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessageView {
    pub id: i64,
    pub user: ChatUserView,
    pub timestamp: i64,
    pub issystem: bool,
    pub msg: String,
}

impl From<&ChatMessageEntity> for ChatMessageView {
    fn from(entity: &ChatMessageEntity) -> Self {
        Self {
            id: entity.id,
            user: ChatUserView {
                id: entity.userid,
                name: entity.name.clone(),
            },
            timestamp: entity.timestamp,
            issystem: entity.issystem,
            msg: entity.message.clone(),
        }
    }
}

/// Payload of `chatmsg`.
#[derive(Debug, Deserialize, Validate)]
pub struct ChatMsgData {
    #[validate(length(min = 1, max = 4096))]
    pub msg: String,
}

/// Payload of `chathistory`.
#[derive(Debug, Default, Deserialize)]
pub struct ChatHistoryData {
    /// Page size, defaulting to the configured one.
    pub n: Option<u32>,
    /// Return messages older than this id.
    pub s: Option<i64>,
}

/// Payload of `playcard`.
#[derive(Debug, Deserialize)]
pub struct PlayCardData {
    #[serde(rename = "type")]
    pub cardtype: String,
    pub code: String,
}

/// Payload of `unplaycard`.
#[derive(Debug, Deserialize)]
pub struct UnplayCardData {
    #[serde(rename = "type")]
    pub cardtype: String,
}

/// Payload of `gamestart`.
#[derive(Debug, Default, Deserialize)]
pub struct GameStartData {
    #[serde(default)]
    pub level: u8,
}

/// Payload of the city item actions (`playaction`, `stopaction`,
/// `playtechnology`, `stoptechnology`).
#[derive(Debug, Deserialize)]
pub struct GameItemData {
    pub id: String,
}

/// Payload of `changetimeframe`.
#[derive(Debug, Deserialize)]
pub struct ChangeTimeframeData {
    pub timeframe: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_requires_an_action() {
        let envelope = InboundEnvelope::from_json_str(r#"{"data": {}}"#).unwrap();
        assert!(matches!(
            envelope.action(),
            Err(DomainError::ActionRequired)
        ));

        let envelope = InboundEnvelope::from_json_str(r#"{"action": ""}"#).unwrap();
        assert!(matches!(
            envelope.action(),
            Err(DomainError::ActionRequired)
        ));
    }

    #[test]
    fn malformed_json_maps_to_protocol_error() {
        assert!(matches!(
            InboundEnvelope::from_json_str("{nope"),
            Err(DomainError::InvalidJson)
        ));
    }

    #[test]
    fn data_decodes_into_typed_payloads() {
        let envelope = InboundEnvelope::from_json_str(
            r#"{"action": "playcard", "data": {"type": "tech", "code": "john"}}"#,
        )
        .unwrap();
        let payload: PlayCardData = envelope.data_as().unwrap();
        assert_eq!(payload.cardtype, "tech");
        assert_eq!(payload.code, "john");
    }

    #[test]
    fn error_payload_carries_an_empty_stacktrace() {
        let payload = ErrorPayload::from(&DomainError::InvalidJson);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["errorcode"], "invalidjson");
        assert_eq!(value["stacktrace"], "");
    }

    #[test]
    fn chat_messages_serialize_with_a_nested_user() {
        let entity = ChatMessageEntity {
            id: 7,
            groupid: 5,
            userid: 1,
            name: "Ada Tester".into(),
            message: "hello".into(),
            issystem: false,
            timestamp: 1000,
        };
        let value = serde_json::to_value(ChatMessageView::from(&entity)).unwrap();
        assert_eq!(value["user"]["id"], 1);
        assert_eq!(value["user"]["name"], "Ada Tester");
        assert_eq!(value["msg"], "hello");
        assert!(value.get("groupid").is_none());
    }

    #[test]
    fn outbound_envelope_serializes_without_empty_user() {
        let frame = OutboundEnvelope::new("chatmsg", serde_json::json!({"msg": "hi"}));
        let text = serde_json::to_string(&frame).unwrap();
        assert!(!text.contains("user"));
    }
}
