//! Conversation lifecycle.
//!
//! A session moves `bot -> waiting -> open -> closed`. `transfer` re-queues a
//! session from any non-closed status, `close` is terminal. Every guard is
//! checked before anything is mutated, so a rejected operation leaves the
//! session exactly as it was.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Message, NewMessage, Operator, Sender, SessionId};

/// Lifecycle status of a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Driven by the flow interpreter.
    Bot,
    /// Queued, waiting for an operator pickup.
    Waiting,
    /// Assigned to an operator.
    Open,
    /// Terminal.
    Closed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Bot => "bot",
            SessionStatus::Waiting => "waiting",
            SessionStatus::Open => "open",
            SessionStatus::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Who asks for a session to be closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closer {
    /// The operator owning the session.
    Operator(String),
    /// A supervisor forcing the close.
    Supervisor(String),
    /// A `final` node of the flow.
    Flow,
}

/// A state-machine guard rejected the operation. Nothing was mutated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotAllowed {
    #[error("session is closed")]
    Closed,

    #[error("session already assigned to {operator}")]
    AlreadyAssigned { operator: String },

    #[error("cannot {action} while session is {status}")]
    WrongStatus {
        action: &'static str,
        status: SessionStatus,
    },

    #[error("operator {operator} does not own this session")]
    NotOwner { operator: String },

    #[error("session is reserved for operator {operator}")]
    Reserved { operator: String },
}

/// One customer's conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub customer_ref: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub queue: Option<String>,
    #[serde(default)]
    pub operator_ref: Option<String>,
    #[serde(default)]
    pub operator_name: Option<String>,
    /// Operator a transfer was targeted at; only they may pick it up.
    #[serde(default)]
    pub reserved_for: Option<String>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Node the interpreter is suspended at, if any.
    #[serde(default)]
    pub pending_node: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: SessionId, customer_ref: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            customer_ref: customer_ref.into(),
            status: SessionStatus::Bot,
            queue: None,
            operator_ref: None,
            operator_name: None,
            reserved_for: None,
            variables: HashMap::new(),
            messages: Vec::new(),
            pending_node: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status == SessionStatus::Closed
    }

    fn ensure_not_closed(&self) -> Result<(), NotAllowed> {
        if self.is_closed() {
            Err(NotAllowed::Closed)
        } else {
            Ok(())
        }
    }

    /// Append a message. Operator messages are only accepted while `open`.
    pub fn append(&mut self, msg: NewMessage, now: DateTime<Utc>) -> Result<Message, NotAllowed> {
        self.ensure_not_closed()?;
        if msg.sender == Sender::Agent && self.status != SessionStatus::Open {
            return Err(NotAllowed::WrongStatus {
                action: "reply",
                status: self.status,
            });
        }
        let stored = msg.stamp(now);
        self.messages.push(stored.clone());
        self.updated_at = now;
        Ok(stored)
    }

    /// Append an operator message, checking ownership first.
    pub fn append_from_operator(
        &mut self,
        operator_id: &str,
        text: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Message, NotAllowed> {
        self.ensure_not_closed()?;
        if self.status == SessionStatus::Open && self.operator_ref.as_deref() != Some(operator_id) {
            return Err(NotAllowed::NotOwner {
                operator: operator_id.to_string(),
            });
        }
        self.append(NewMessage::agent(text), now)
    }

    /// Merge a patch into the variable bag.
    pub fn merge_variables(
        &mut self,
        patch: HashMap<String, String>,
        now: DateTime<Utc>,
    ) -> Result<&HashMap<String, String>, NotAllowed> {
        self.ensure_not_closed()?;
        self.variables.extend(patch);
        self.updated_at = now;
        Ok(&self.variables)
    }

    /// Record (or clear) the node the interpreter is suspended at.
    pub fn set_pending(&mut self, node: Option<String>) -> Result<(), NotAllowed> {
        self.ensure_not_closed()?;
        self.pending_node = node;
        Ok(())
    }

    /// Hand the session to a queue and/or an operator.
    ///
    /// Allowed from every non-closed status. The previous assignment is
    /// cleared; a targeted operator is recorded in `reserved_for`.
    pub fn transfer(
        &mut self,
        queue: Option<String>,
        operator: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), NotAllowed> {
        self.ensure_not_closed()?;
        if let Some(queue) = queue {
            self.queue = Some(queue);
        }
        self.operator_ref = None;
        self.operator_name = None;
        self.reserved_for = operator;
        self.pending_node = None;
        self.status = SessionStatus::Waiting;
        self.updated_at = now;
        Ok(())
    }

    /// Assign a waiting, unassigned session to `operator`.
    pub fn pickup(
        &mut self,
        operator: &Operator,
        announcement: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Message, NotAllowed> {
        self.ensure_not_closed()?;
        if let Some(current) = &self.operator_ref {
            return Err(NotAllowed::AlreadyAssigned {
                operator: current.clone(),
            });
        }
        if self.status != SessionStatus::Waiting {
            return Err(NotAllowed::WrongStatus {
                action: "pickup",
                status: self.status,
            });
        }
        if let Some(reserved) = &self.reserved_for {
            if reserved != &operator.id {
                return Err(NotAllowed::Reserved {
                    operator: reserved.clone(),
                });
            }
        }

        self.operator_ref = Some(operator.id.clone());
        self.operator_name = Some(operator.name.clone());
        self.reserved_for = None;
        self.status = SessionStatus::Open;
        self.append(NewMessage::system(announcement), now)
    }

    /// Close the session. Irreversible; a second close is rejected.
    pub fn close(
        &mut self,
        closer: &Closer,
        farewell: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Message, NotAllowed> {
        self.ensure_not_closed()?;
        let operator_stage = matches!(self.status, SessionStatus::Waiting | SessionStatus::Open);
        match closer {
            Closer::Flow if self.status != SessionStatus::Bot => {
                return Err(NotAllowed::WrongStatus {
                    action: "close",
                    status: self.status,
                });
            }
            Closer::Operator(_) | Closer::Supervisor(_) if !operator_stage => {
                return Err(NotAllowed::WrongStatus {
                    action: "close",
                    status: self.status,
                });
            }
            Closer::Operator(id) if self.operator_ref.as_deref() != Some(id.as_str()) => {
                return Err(NotAllowed::NotOwner {
                    operator: id.clone(),
                });
            }
            _ => {}
        }

        let farewell = self.append(NewMessage::system(farewell), now)?;
        self.status = SessionStatus::Closed;
        self.pending_node = None;
        Ok(farewell)
    }
}
