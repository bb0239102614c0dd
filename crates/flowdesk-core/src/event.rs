use serde::Serialize;

use crate::session::SessionStatus;
use crate::types::{Message, SessionId};

/// Something observable happened on the desk.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeskEvent {
    SessionCreated {
        session_id: SessionId,
        customer_ref: String,
    },
    MessageAppended {
        session_id: SessionId,
        message: Message,
    },
    StatusChanged {
        session_id: SessionId,
        from: SessionStatus,
        to: SessionStatus,
    },
    /// The interpreter is waiting for a reply or a delay at `node_id`.
    FlowPaused {
        session_id: SessionId,
        node_id: String,
    },
    /// No outgoing edge matched; the flow stopped advancing.
    FlowStalled {
        session_id: SessionId,
        node_id: String,
    },
    FlowFinished {
        session_id: SessionId,
    },
}

/// Event bus using tokio broadcast channel.
/// All subscribers receive all events.
pub struct EventBus {
    tx: tokio::sync::broadcast::Sender<DeskEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: DeskEvent) {
        // Ignore error if no receivers
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DeskEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(DeskEvent::FlowFinished {
            session_id: SessionId::from_string("c1"),
        });
        match rx.recv().await.unwrap() {
            DeskEvent::FlowFinished { session_id } => assert_eq!(session_id.as_str(), "c1"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        bus.publish(DeskEvent::FlowStalled {
            session_id: SessionId::new(),
            node_id: "n1".into(),
        });
    }
}
