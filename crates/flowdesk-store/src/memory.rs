use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::BoxFuture;
use tracing::debug;

use flowdesk_core::error::{FlowdeskError, Result};
use flowdesk_core::event::{DeskEvent, EventBus};
use flowdesk_core::session::{Closer, Session, SessionStatus};
use flowdesk_core::traits::{Clock, MessageSink, SessionStore, VariablePatch};
use flowdesk_core::types::{Message, NewMessage, Operator, SessionId};

#[derive(Default)]
struct Sessions {
    by_id: HashMap<SessionId, Session>,
    /// Creation order.
    order: Vec<SessionId>,
}

/// In-process session store.
///
/// State lives for the lifetime of the process. Every operation runs under
/// one lock and applies the session's own guards, so a rejected operation
/// changes nothing.
pub struct MemoryStore {
    sessions: Mutex<Sessions>,
    clock: Arc<dyn Clock>,
    events: Option<Arc<EventBus>>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Mutex::new(Sessions::default()),
            clock,
            events: None,
        }
    }

    /// Publish state changes and appended messages on `events`.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, event: DeskEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }

    fn publish_message(&self, sid: &SessionId, message: &Message) {
        self.publish(DeskEvent::MessageAppended {
            session_id: sid.clone(),
            message: message.clone(),
        });
    }

    fn publish_status(&self, sid: &SessionId, from: SessionStatus, to: SessionStatus) {
        if from != to {
            self.publish(DeskEvent::StatusChanged {
                session_id: sid.clone(),
                from,
                to,
            });
        }
    }

    /// Run `f` against one session under the lock.
    fn with_session<T>(
        &self,
        sid: &SessionId,
        f: impl FnOnce(&mut Session) -> Result<T>,
    ) -> Result<T> {
        let mut sessions = self.lock();
        let session = sessions
            .by_id
            .get_mut(sid)
            .ok_or_else(|| FlowdeskError::SessionNotFound(sid.to_string()))?;
        f(session)
    }

    /// Apply a status-changing operation and publish what happened.
    fn transition(
        &self,
        sid: &SessionId,
        f: impl FnOnce(&mut Session) -> Result<Option<Message>>,
    ) -> Result<Session> {
        let (from, session, message) = self.with_session(sid, |s| {
            let from = s.status;
            let message = f(s)?;
            Ok((from, s.clone(), message))
        })?;
        if let Some(message) = &message {
            self.publish_message(sid, message);
        }
        self.publish_status(sid, from, session.status);
        Ok(session)
    }

    fn append_sync(&self, sid: &SessionId, msg: NewMessage) -> Result<Message> {
        let now = self.clock.now();
        let stored = self.with_session(sid, |s| Ok(s.append(msg, now)?))?;
        self.publish_message(sid, &stored);
        Ok(stored)
    }
}

impl SessionStore for MemoryStore {
    fn create(&self, customer_ref: &str) -> BoxFuture<'_, Result<(Session, bool)>> {
        let customer_ref = customer_ref.to_string();
        Box::pin(async move {
            let created = {
                let mut sessions = self.lock();
                let existing = sessions
                    .by_id
                    .values()
                    .find(|s| s.customer_ref == customer_ref && !s.is_closed());
                if let Some(existing) = existing {
                    return Ok((existing.clone(), false));
                }

                let session = Session::new(SessionId::new(), customer_ref.clone(), self.clock.now());
                sessions.order.push(session.id.clone());
                sessions.by_id.insert(session.id.clone(), session.clone());
                session
            };

            debug!(session = %created.id, customer = %customer_ref, "Session created");
            self.publish(DeskEvent::SessionCreated {
                session_id: created.id.clone(),
                customer_ref,
            });
            Ok((created, true))
        })
    }

    fn find(&self, sid: &SessionId) -> BoxFuture<'_, Result<Option<Session>>> {
        let sid = sid.clone();
        Box::pin(async move { Ok(self.lock().by_id.get(&sid).cloned()) })
    }

    fn transfer(
        &self,
        sid: &SessionId,
        queue: Option<String>,
        operator: Option<String>,
    ) -> BoxFuture<'_, Result<Session>> {
        let sid = sid.clone();
        Box::pin(async move {
            let now = self.clock.now();
            self.transition(&sid, |s| {
                s.transfer(queue, operator, now)?;
                Ok(None)
            })
        })
    }

    fn pickup(
        &self,
        sid: &SessionId,
        operator: &Operator,
        announcement: String,
    ) -> BoxFuture<'_, Result<Session>> {
        let sid = sid.clone();
        let operator = operator.clone();
        Box::pin(async move {
            let now = self.clock.now();
            self.transition(&sid, |s| Ok(Some(s.pickup(&operator, announcement, now)?)))
        })
    }

    fn close(
        &self,
        sid: &SessionId,
        closer: Closer,
        farewell: String,
    ) -> BoxFuture<'_, Result<Session>> {
        let sid = sid.clone();
        Box::pin(async move {
            let now = self.clock.now();
            self.transition(&sid, |s| Ok(Some(s.close(&closer, farewell, now)?)))
        })
    }

    fn append_message(&self, sid: &SessionId, msg: NewMessage) -> BoxFuture<'_, Result<Message>> {
        let sid = sid.clone();
        Box::pin(async move { self.append_sync(&sid, msg) })
    }

    fn append_operator_message(
        &self,
        sid: &SessionId,
        operator_id: &str,
        text: String,
    ) -> BoxFuture<'_, Result<Message>> {
        let sid = sid.clone();
        let operator_id = operator_id.to_string();
        Box::pin(async move {
            let now = self.clock.now();
            let stored =
                self.with_session(&sid, |s| Ok(s.append_from_operator(&operator_id, text, now)?))?;
            self.publish_message(&sid, &stored);
            Ok(stored)
        })
    }

    fn set_pending(&self, sid: &SessionId, node: Option<String>) -> BoxFuture<'_, Result<()>> {
        let sid = sid.clone();
        Box::pin(async move { self.with_session(&sid, |s| Ok(s.set_pending(node)?)) })
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<Session>>> {
        Box::pin(async move {
            let sessions = self.lock();
            Ok(sessions
                .order
                .iter()
                .filter_map(|id| sessions.by_id.get(id).cloned())
                .collect())
        })
    }
}

impl MessageSink for MemoryStore {
    fn append(&self, sid: &SessionId, msg: NewMessage) -> BoxFuture<'_, Result<Message>> {
        let sid = sid.clone();
        Box::pin(async move { self.append_sync(&sid, msg) })
    }
}

impl VariablePatch for MemoryStore {
    fn apply(
        &self,
        sid: &SessionId,
        patch: HashMap<String, String>,
    ) -> BoxFuture<'_, Result<HashMap<String, String>>> {
        let sid = sid.clone();
        Box::pin(async move {
            let now = self.clock.now();
            self.with_session(&sid, |s| Ok(s.merge_variables(patch, now)?.clone()))
        })
    }
}
