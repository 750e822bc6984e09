use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message body as supplied by the sending client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageIn {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Message summary as re-broadcast to the room; `sender_id` is stamped from
/// the authenticated connection, never taken from the client payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageOut {
    pub id: String,
    pub content: String,
    pub sender_id: String,
    pub created_at: DateTime<Utc>,
}

/// Events sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientEvent {
    #[serde(rename = "join-conversation", rename_all = "camelCase")]
    JoinConversation { conversation_id: String },
    #[serde(rename = "join-document", rename_all = "camelCase")]
    JoinDocument { document_id: String },
    #[serde(rename = "document-change", rename_all = "camelCase")]
    DocumentChange {
        document_id: String,
        content: String,
        position: u64,
    },
    #[serde(rename = "new-message", rename_all = "camelCase")]
    NewMessage {
        conversation_id: String,
        message: MessageIn,
    },
    #[serde(rename = "typing", rename_all = "camelCase")]
    Typing {
        conversation_id: String,
        is_typing: bool,
    },
    #[serde(rename = "set-presence")]
    SetPresence { status: String },
    #[serde(rename = "ping")]
    Ping,
}

impl ClientEvent {
    /// Wire name, used for logging and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinConversation { .. } => "join-conversation",
            Self::JoinDocument { .. } => "join-document",
            Self::DocumentChange { .. } => "document-change",
            Self::NewMessage { .. } => "new-message",
            Self::Typing { .. } => "typing",
            Self::SetPresence { .. } => "set-presence",
            Self::Ping => "ping",
        }
    }
}

/// Events sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerEvent {
    #[serde(rename = "user-joined", rename_all = "camelCase")]
    UserJoined {
        user_id: String,
        document_id: String,
    },
    #[serde(rename = "document-change", rename_all = "camelCase")]
    DocumentChange {
        document_id: String,
        content: String,
        position: u64,
        user_id: String,
    },
    #[serde(rename = "new-message", rename_all = "camelCase")]
    NewMessage {
        conversation_id: String,
        message: MessageOut,
    },
    #[serde(rename = "user-typing", rename_all = "camelCase")]
    UserTyping { user_id: String, is_typing: bool },
    #[serde(rename = "user-presence-change", rename_all = "camelCase")]
    PresenceChange { user_id: String, status: String },
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "heartbeat")]
    Heartbeat,
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

impl ServerEvent {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn presence_change(user_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self::PresenceChange {
            user_id: user_id.into(),
            status: status.into(),
        }
    }
}

/// Outbound frame, either raw (serialized at write time) or pre-serialized
/// once and shared across a fan-out.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    Raw(ServerEvent),
    Serialized(Arc<str>),
}

impl OutboundMessage {
    pub fn preserialized(event: &ServerEvent) -> Result<Self, serde_json::Error> {
        Ok(Self::Serialized(serde_json::to_string(event)?.into()))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Raw(event) => serde_json::to_string(event),
            Self::Serialized(json) => Ok(json.to_string()),
        }
    }
}
