//! Message structures and disposition metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content prefix marking encryption-negotiation payloads
pub const PROTOCOL_INTERNAL_PREFIX: &str = "?OTRv";

/// Delivery/read state of a message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageState {
    /// Sent locally, not yet acknowledged by the server
    #[default]
    Pending,
    /// Accepted by the server for delivery
    Accepted,
    /// Delivered to the peer's device
    Delivered,
    /// Shown to the peer
    Displayed,
    /// Inbound message received from the peer
    Received,
    /// Delivery failed
    Failed,
    /// Message could not be processed (malformed payload)
    Error,
}

impl MessageState {
    /// Parse a state tag as used by transport records
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(MessageState::Pending),
            "accepted" => Some(MessageState::Accepted),
            "delivered" => Some(MessageState::Delivered),
            "displayed" => Some(MessageState::Displayed),
            "received" => Some(MessageState::Received),
            "failed" => Some(MessageState::Failed),
            "error" => Some(MessageState::Error),
            _ => None,
        }
    }

    /// Lowercase tag for this state
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageState::Pending => "pending",
            MessageState::Accepted => "accepted",
            MessageState::Delivered => "delivered",
            MessageState::Displayed => "displayed",
            MessageState::Received => "received",
            MessageState::Failed => "failed",
            MessageState::Error => "error",
        }
    }
}

impl fmt::Display for MessageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Disposition notification kinds a sender can request (RFC 5438 / IMDN)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    /// Any delivery notification
    Delivery,
    /// Notify on successful delivery
    PositiveDelivery,
    /// Notify on failed delivery
    NegativeDelivery,
    /// Notify once the message was displayed
    Display,
}

impl NotificationKind {
    /// Parse a notification tag
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "delivery" => Some(NotificationKind::Delivery),
            "positive-delivery" => Some(NotificationKind::PositiveDelivery),
            "negative-delivery" => Some(NotificationKind::NegativeDelivery),
            "display" => Some(NotificationKind::Display),
            _ => None,
        }
    }
}

/// A party of a conversation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// SIP URI, e.g. "alice@example.com"
    pub uri: String,
    /// Human readable name, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Identity {
    /// Create an identity without a display name
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            display_name: None,
        }
    }

    /// Attach a display name
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Display name, falling back to the URI
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.uri)
    }
}

/// A single chat message with its disposition metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,
    /// Author of the message
    pub sender: Identity,
    /// Addressee of the message
    pub receiver: Identity,
    /// Send or receive time
    pub timestamp: DateTime<Utc>,
    /// Raw payload
    pub content: String,
    /// MIME-like type tag, e.g. "text/plain"
    pub content_type: String,
    /// Local delivery state
    pub state: MessageState,
    /// Last disposition acknowledged for this message
    #[serde(default)]
    pub disposition_state: Option<MessageState>,
    /// Notifications the sender asked for
    #[serde(default)]
    pub disposition_notification: Vec<NotificationKind>,
    /// Whether the content was end-to-end encrypted
    #[serde(default)]
    pub is_secure: bool,
}

impl Message {
    /// Create a locally sent message in `pending` state
    pub fn outgoing(
        id: impl Into<String>,
        sender: Identity,
        receiver: Identity,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            sender,
            receiver,
            timestamp,
            content: content.into(),
            content_type: "text/plain".to_string(),
            state: MessageState::Pending,
            disposition_state: None,
            disposition_notification: Vec::new(),
            is_secure: false,
        }
    }

    /// Create an inbound message in `received` state
    pub fn incoming(
        id: impl Into<String>,
        sender: Identity,
        receiver: Identity,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            state: MessageState::Received,
            ..Self::outgoing(id, sender, receiver, content, timestamp)
        }
    }

    /// Set the requested disposition notifications
    pub fn with_notifications(mut self, kinds: &[NotificationKind]) -> Self {
        self.disposition_notification = kinds.to_vec();
        self
    }

    /// Set the content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Mark the message as end-to-end encrypted
    pub fn with_secure(mut self, is_secure: bool) -> Self {
        self.is_secure = is_secure;
        self
    }

    /// Build a message from a transport record
    ///
    /// Malformed records still produce a message so it keeps its place in
    /// the history; such messages are put in the `error` state.
    pub fn from_raw(raw: RawMessage) -> Self {
        let mut problems: Vec<String> = Vec::new();

        let id = match raw.id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                problems.push("missing id".to_string());
                uuid::Uuid::new_v4().to_string()
            }
        };

        let timestamp = match raw.timestamp.as_deref().map(DateTime::parse_from_rfc3339) {
            Some(Ok(ts)) => ts.with_timezone(&Utc),
            Some(Err(e)) => {
                problems.push(format!("bad timestamp: {}", e));
                Utc::now()
            }
            None => {
                problems.push("missing timestamp".to_string());
                Utc::now()
            }
        };

        let content_type = match raw.content_type.filter(|ct| !ct.is_empty()) {
            Some(ct) => ct,
            None => {
                problems.push("missing content type".to_string());
                String::new()
            }
        };

        let state = match raw.state.as_deref() {
            None => MessageState::Received,
            Some(tag) => MessageState::parse(tag).unwrap_or_else(|| {
                problems.push(format!("unknown state '{}'", tag));
                MessageState::Error
            }),
        };

        let disposition_state = raw.disposition_state.as_deref().and_then(MessageState::parse);

        let disposition_notification = raw
            .disposition_notification
            .iter()
            .filter_map(|tag| NotificationKind::parse(tag))
            .collect();

        let state = if problems.is_empty() {
            state
        } else {
            tracing::warn!("Malformed message {}: {}", id, problems.join(", "));
            MessageState::Error
        };

        Self {
            id,
            sender: raw.sender,
            receiver: raw.receiver,
            timestamp,
            content: raw.content,
            content_type,
            state,
            disposition_state,
            disposition_notification,
            is_secure: raw.is_secure,
        }
    }

    /// True for encryption-negotiation payloads that must never be shown
    pub fn is_protocol_internal(&self) -> bool {
        self.content.starts_with(PROTOCOL_INTERNAL_PREFIX)
    }

    /// Whether the sender asked to be told when this message is displayed
    pub fn requests_display(&self) -> bool {
        self.disposition_notification.contains(&NotificationKind::Display)
    }

    /// Received, asks for a display notification, and none was sent yet
    ///
    /// This is both the unread predicate and the "receipt still owed" check.
    pub fn is_unread(&self) -> bool {
        self.state == MessageState::Received
            && self.disposition_state != Some(MessageState::Displayed)
            && self.requests_display()
            && !self.is_protocol_internal()
    }
}

/// Message record as delivered by the transport
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMessage {
    /// Message ID
    #[serde(default)]
    pub id: Option<String>,
    /// Author
    #[serde(default)]
    pub sender: Identity,
    /// Addressee
    #[serde(default)]
    pub receiver: Identity,
    /// RFC 3339 timestamp
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Payload
    #[serde(default)]
    pub content: String,
    /// Content type tag
    #[serde(default)]
    pub content_type: Option<String>,
    /// State tag; inbound records usually omit it
    #[serde(default)]
    pub state: Option<String>,
    /// Acknowledged disposition tag
    #[serde(default)]
    pub disposition_state: Option<String>,
    /// Requested notification tags
    #[serde(default)]
    pub disposition_notification: Vec<String>,
    /// Encrypted flag
    #[serde(default)]
    pub is_secure: bool,
}
