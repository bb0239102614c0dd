use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique session identifier.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(format!("chat_{}", Uuid::new_v4().simple()))
    }

    pub fn from_string(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a message in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Bot,
    User,
    Agent,
    System,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Sender::Bot => "bot",
            Sender::User => "user",
            Sender::Agent => "agent",
            Sender::System => "system",
        };
        f.write_str(s)
    }
}

/// A quick-reply button offered with a bot message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Button {
    pub id: String,
    pub label: String,
}

impl Button {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// A message that has not been stored yet. The sink stamps it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMessage {
    pub sender: Sender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<Button>>,
}

impl NewMessage {
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
            buttons: None,
        }
    }

    pub fn bot_with_buttons(text: impl Into<String>, buttons: Vec<Button>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
            buttons: if buttons.is_empty() { None } else { Some(buttons) },
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            buttons: None,
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Agent,
            text: text.into(),
            buttons: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::System,
            text: text.into(),
            buttons: None,
        }
    }

    /// Stamp the message with the given time.
    pub fn stamp(self, timestamp: DateTime<Utc>) -> Message {
        Message {
            sender: self.sender,
            text: self.text,
            buttons: self.buttons,
            timestamp,
        }
    }
}

/// A stored, append-only conversation message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<Button>>,
    pub timestamp: DateTime<Utc>,
}

/// Role of a human operator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperatorRole {
    #[serde(alias = "ADMIN")]
    Admin,
    #[serde(alias = "MANAGER")]
    Manager,
    #[serde(alias = "AGENT")]
    Agent,
}

impl OperatorRole {
    /// Admins and managers may force-close any session.
    pub fn is_supervisor(&self) -> bool {
        matches!(self, OperatorRole::Admin | OperatorRole::Manager)
    }
}

/// A human operator as seen by the desk (no credentials).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Operator {
    pub id: String,
    pub name: String,
    pub role: OperatorRole,
    #[serde(default)]
    pub queues: Vec<String>,
}

impl Operator {
    pub fn agent(id: impl Into<String>, name: impl Into<String>, queues: Vec<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: OperatorRole::Agent,
            queues,
        }
    }

    pub fn supervisor(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: OperatorRole::Manager,
            queues: vec![],
        }
    }

    /// Queue names match case-insensitively.
    pub fn serves(&self, queue: &str) -> bool {
        self.queues.iter().any(|q| q.eq_ignore_ascii_case(queue))
    }
}
