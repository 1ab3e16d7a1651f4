//! Messages exchanged between production agents over the bus.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a message should be delivered.
///
/// The wire form mirrors the recipient field of the original pipeline:
/// a bare agent id, the literal `broadcast`, or `channel:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    /// Exactly one named agent.
    Agent(String),
    /// Every registered agent, including the sender if registered.
    Broadcast,
    /// Every subscriber of a named channel.
    Channel(String),
}

impl FromStr for Recipient {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "broadcast" => Recipient::Broadcast,
            other => match other.strip_prefix("channel:") {
                Some(name) => Recipient::Channel(name.to_string()),
                None => Recipient::Agent(other.to_string()),
            },
        })
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::Agent(id) => write!(f, "{id}"),
            Recipient::Broadcast => write!(f, "broadcast"),
            Recipient::Channel(name) => write!(f, "channel:{name}"),
        }
    }
}

/// Category tag for bus traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Coordinator handed a task to an agent.
    TaskAssignment,
    /// Agent reports a task outcome back.
    TaskResult,
    /// A proposal opened and votes are requested.
    VoteRequest,
    /// A proposal closed; carries the outcome.
    VoteNotice,
    /// Periodic agent health/progress report.
    StatusUpdate,
    /// Free-form inter-agent chatter.
    Chatter,
    /// Anything the embedding application defines.
    Custom(String),
}

/// A single immutable message.
///
/// Created by callers, routed by the bus, drained by the recipient.
/// Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    /// Unique message id.
    pub id: Uuid,
    /// Agent id of the sender.
    pub sender: String,
    /// Delivery target.
    pub recipient: Recipient,
    /// Traffic category.
    pub kind: MessageKind,
    /// Opaque payload; the bus never inspects it.
    pub content: serde_json::Value,
    /// When the message was constructed.
    pub timestamp: DateTime<Utc>,
}

impl AgentMessage {
    /// Create a message stamped with a fresh id and the current time.
    pub fn new(
        sender: impl Into<String>,
        recipient: Recipient,
        kind: MessageKind,
        content: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: sender.into(),
            recipient,
            kind,
            content,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recipient_wire_forms() {
        assert_eq!("broadcast".parse::<Recipient>().unwrap(), Recipient::Broadcast);
        assert_eq!(
            "channel:writers-room".parse::<Recipient>().unwrap(),
            Recipient::Channel("writers-room".into())
        );
        assert_eq!(
            "clip-bot".parse::<Recipient>().unwrap(),
            Recipient::Agent("clip-bot".into())
        );
    }

    #[test]
    fn test_recipient_display_roundtrip() {
        for s in ["broadcast", "channel:writers-room", "clip-bot"] {
            let r: Recipient = s.parse().unwrap();
            assert_eq!(r.to_string(), s);
        }
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = AgentMessage::new("a", Recipient::Broadcast, MessageKind::Chatter, json!({}));
        let b = AgentMessage::new("a", Recipient::Broadcast, MessageKind::Chatter, json!({}));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_serde_roundtrip() {
        let msg = AgentMessage::new(
            "clip-bot",
            Recipient::Channel("editors".into()),
            MessageKind::StatusUpdate,
            json!({ "clips_ready": 3 }),
        );
        let json = serde_json::to_string(&msg).unwrap();
        let back: AgentMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }
}
