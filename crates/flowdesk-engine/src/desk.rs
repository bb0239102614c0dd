//! The service desk: one published flow, many sessions.
//!
//! `Desk` drives the interpreter for customer events and applies operator
//! actions to the session state machine. Every mutation of a session goes
//! through that session's lane, so interpreter runs, delay continuations and
//! operator actions never interleave on the same id.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use flowdesk_core::config::AppConfig;
use flowdesk_core::error::{FlowdeskError, Result};
use flowdesk_core::event::{DeskEvent, EventBus};
use flowdesk_core::session::{Closer, NotAllowed, Session, SessionStatus};
use flowdesk_core::traits::{QueueDirectory, SessionStore, TemplateCatalogue};
use flowdesk_core::types::{Message, NewMessage, Operator, OperatorRole, SessionId};

use crate::graph::{FlowExecutor, FlowGraph, NodeKind, Outcome, Reply};
use crate::lane::LaneMap;
use crate::variables::Variables;

/// What an operator sees in their workspace.
#[derive(Debug, Clone, Serialize)]
pub struct Inbox {
    /// Sessions the operator is serving.
    pub active: Vec<Session>,
    /// Unassigned sessions the operator may pick up.
    pub waiting: Vec<Session>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperatorPresence {
    pub operator: Operator,
    pub online: bool,
}

/// Supervisor view of the desk.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub sessions: Vec<Session>,
    pub operators: Vec<OperatorPresence>,
}

#[derive(Clone)]
pub struct Desk {
    graph: Arc<FlowGraph>,
    executor: Arc<FlowExecutor>,
    lanes: Arc<LaneMap>,
    events: Arc<EventBus>,
    cancel: CancellationToken,
    max_rounds: usize,
    config: Arc<AppConfig>,
}

impl Desk {
    pub fn new(
        graph: Arc<FlowGraph>,
        executor: Arc<FlowExecutor>,
        events: Arc<EventBus>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            graph,
            executor,
            lanes: Arc::new(LaneMap::new()),
            events,
            cancel: CancellationToken::new(),
            max_rounds: config.engine.max_rounds.max(1),
            config,
        }
    }

    pub fn graph(&self) -> &Arc<FlowGraph> {
        &self.graph
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeskEvent> {
        self.events.subscribe()
    }

    fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.executor.effects().sessions
    }

    fn directory(&self) -> &Arc<dyn QueueDirectory> {
        &self.executor.effects().queues
    }

    pub async fn session(&self, sid: &SessionId) -> Result<Session> {
        self.sessions()
            .find(sid)
            .await?
            .ok_or_else(|| FlowdeskError::SessionNotFound(sid.to_string()))
    }

    // ── Customer side ───────────────────────────────────────────

    /// Open a conversation for `customer_ref`, or return the one in progress.
    pub async fn start(&self, customer_ref: &str) -> Result<Session> {
        let (session, created) = self.sessions().create(customer_ref).await?;
        if !created {
            debug!(session = %session.id, "Returning existing session");
            return Ok(session);
        }

        info!(session = %session.id, customer = %customer_ref, "Session started");
        let _lane = self.lanes.acquire(&session.id).await;
        let mut vars = Variables::from_map(session.variables);
        let start = self.graph.start_id().to_string();
        self.run_from(&session.id, &start, &mut vars).await?;
        self.session(&session.id).await
    }

    /// Deliver a customer reply.
    ///
    /// The reply is always logged. It resumes the flow only while the
    /// session is bot-driven and paused at an input or template node.
    pub async fn reply(&self, sid: &SessionId, reply: Reply) -> Result<Session> {
        let _lane = self.lanes.acquire(sid).await;
        let session = self.session(sid).await?;
        if session.is_closed() {
            return Err(NotAllowed::Closed.into());
        }

        let pending = session
            .pending_node
            .as_deref()
            .and_then(|id| self.graph.node(id))
            .filter(|n| session.status == SessionStatus::Bot && n.kind.awaits_reply());

        let text = self.reply_text(pending.map(|n| &n.kind), &reply);
        self.sessions()
            .append_message(sid, NewMessage::user(text))
            .await?;

        if let Some(node) = pending {
            let mut vars = Variables::from_map(session.variables);
            let outcome = self
                .executor
                .resume(&self.graph, &node.id, sid, &mut vars, &reply)
                .await?;
            self.settle(sid, outcome, &mut vars).await?;
        }
        self.session(sid).await
    }

    /// Text logged for a reply; a bare button press is logged as its label.
    fn reply_text(&self, pending: Option<&NodeKind>, reply: &Reply) -> String {
        if !reply.text.is_empty() {
            return reply.text.clone();
        }
        let Some(button_id) = reply.button_id.as_deref() else {
            return String::new();
        };
        let label = match pending {
            Some(NodeKind::Template { template_id }) => self
                .executor
                .effects()
                .templates
                .get(template_id)
                .and_then(|t| t.buttons.into_iter().find(|b| b.id == button_id))
                .map(|b| b.label),
            _ => None,
        };
        label.unwrap_or_else(|| button_id.to_string())
    }

    // ── Interpreter plumbing ────────────────────────────────────

    async fn run_from(&self, sid: &SessionId, node: &str, vars: &mut Variables) -> Result<Outcome> {
        let outcome = self.executor.advance(&self.graph, node, sid, vars).await?;
        self.settle(sid, outcome, vars).await
    }

    /// Keep advancing past exhausted budgets, then record where the flow
    /// stopped.
    async fn settle(&self, sid: &SessionId, mut outcome: Outcome, vars: &mut Variables) -> Result<Outcome> {
        let mut rounds = 1;
        while let Outcome::ContinuedTo(next) = outcome {
            if rounds >= self.max_rounds {
                warn!(session = %sid, node_id = %next, rounds, "Flow keeps looping, giving up");
                outcome = Outcome::Stalled(next);
                break;
            }
            rounds += 1;
            tokio::task::yield_now().await;
            outcome = self.executor.advance(&self.graph, &next, sid, vars).await?;
        }

        match &outcome {
            Outcome::Paused(node) => {
                self.sessions().set_pending(sid, Some(node.clone())).await?;
                self.events.publish(DeskEvent::FlowPaused {
                    session_id: sid.clone(),
                    node_id: node.clone(),
                });
            }
            Outcome::Delayed { node, next, duration } => {
                self.sessions().set_pending(sid, Some(node.clone())).await?;
                self.events.publish(DeskEvent::FlowPaused {
                    session_id: sid.clone(),
                    node_id: node.clone(),
                });
                self.spawn_delay(sid.clone(), node.clone(), next.clone(), *duration);
            }
            Outcome::Stalled(node) => {
                self.clear_pending(sid).await?;
                self.events.publish(DeskEvent::FlowStalled {
                    session_id: sid.clone(),
                    node_id: node.clone(),
                });
            }
            Outcome::Queued(_) | Outcome::Terminated => {
                self.clear_pending(sid).await?;
                self.events.publish(DeskEvent::FlowFinished {
                    session_id: sid.clone(),
                });
            }
            Outcome::ContinuedTo(_) => {}
        }
        Ok(outcome)
    }

    /// A final node may already have closed the session.
    async fn clear_pending(&self, sid: &SessionId) -> Result<()> {
        match self.sessions().set_pending(sid, None).await {
            Err(FlowdeskError::NotAllowed(NotAllowed::Closed)) => Ok(()),
            other => other,
        }
    }

    fn spawn_delay(&self, sid: SessionId, node: String, next: String, duration: Duration) {
        let desk = self.clone();
        let cancel = self.cancel.clone();
        debug!(session = %sid, node_id = %node, secs = duration.as_secs(), "Delay scheduled");
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(session = %sid, node_id = %node, "Delay cancelled");
                    return;
                }
                _ = tokio::time::sleep(duration) => {}
            }
            desk.continue_after_delay(sid, node, next).await;
        });
    }

    fn continue_after_delay(self, sid: SessionId, node: String, next: String) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let _lane = self.lanes.acquire(&sid).await;
            let session = match self.sessions().find(&sid).await {
                Ok(Some(s)) => s,
                Ok(None) => return,
                Err(e) => {
                    warn!(session = %sid, error = %e, "Delay continuation failed");
                    return;
                }
            };
            if session.status != SessionStatus::Bot || session.pending_node.as_deref() != Some(node.as_str()) {
                debug!(session = %sid, node_id = %node, "Stale delay continuation dropped");
                return;
            }

            let mut vars = Variables::from_map(session.variables);
            if let Err(e) = self.run_from(&sid, &next, &mut vars).await {
                warn!(session = %sid, node_id = %next, error = %e, "Delay continuation failed");
            }
        })
    }

    // ── Operator side ───────────────────────────────────────────

    pub async fn pickup(&self, sid: &SessionId, operator: &Operator) -> Result<Session> {
        let _lane = self.lanes.acquire(sid).await;
        self.directory().heartbeat(&operator.id);
        let announcement = self
            .executor
            .messages()
            .pickup
            .replace("{operator}", &operator.name);
        let session = self.sessions().pickup(sid, operator, announcement).await?;
        info!(session = %sid, operator = %operator.id, "Session picked up");
        Ok(session)
    }

    pub async fn operator_reply(&self, sid: &SessionId, operator: &Operator, text: &str) -> Result<Message> {
        let _lane = self.lanes.acquire(sid).await;
        self.directory().heartbeat(&operator.id);
        self.sessions()
            .append_operator_message(sid, &operator.id, text.to_string())
            .await
    }

    /// Re-queue a session, optionally reserving it for one operator.
    pub async fn transfer(
        &self,
        sid: &SessionId,
        queue: Option<String>,
        operator: Option<String>,
    ) -> Result<Session> {
        let _lane = self.lanes.acquire(sid).await;
        let session = self.sessions().transfer(sid, queue, operator).await?;
        if let Some(queue) = session.queue.as_deref() {
            let notice = self.executor.messages().transfer.replace("{queue}", queue);
            self.sessions()
                .append_message(sid, NewMessage::system(notice))
                .await?;
        }
        info!(
            session = %sid,
            queue = session.queue.as_deref().unwrap_or("-"),
            reserved_for = session.reserved_for.as_deref().unwrap_or("-"),
            "Session transferred"
        );
        self.session(sid).await
    }

    /// Close a session. Agents close their own; supervisors may close any.
    pub async fn close(&self, sid: &SessionId, operator: &Operator) -> Result<Session> {
        let _lane = self.lanes.acquire(sid).await;
        let closer = if operator.role.is_supervisor() {
            Closer::Supervisor(operator.id.clone())
        } else {
            Closer::Operator(operator.id.clone())
        };
        let farewell = self.executor.messages().closed.clone();
        let session = self.sessions().close(sid, closer, farewell).await?;
        info!(session = %sid, operator = %operator.id, "Session closed");
        Ok(session)
    }

    pub fn heartbeat(&self, operator_id: &str) {
        self.directory().heartbeat(operator_id);
    }

    pub async fn inbox(&self, operator: &Operator) -> Result<Inbox> {
        let mut inbox = Inbox {
            active: Vec::new(),
            waiting: Vec::new(),
        };
        for session in self.sessions().list().await? {
            match session.status {
                SessionStatus::Open if session.operator_ref.as_deref() == Some(operator.id.as_str()) => {
                    inbox.active.push(session);
                }
                SessionStatus::Waiting if session.operator_ref.is_none() => {
                    let eligible = match session.reserved_for.as_deref() {
                        Some(reserved) => reserved == operator.id,
                        None => {
                            operator.role.is_supervisor()
                                || session.queue.as_deref().is_some_and(|q| operator.serves(q))
                        }
                    };
                    if eligible {
                        inbox.waiting.push(session);
                    }
                }
                _ => {}
            }
        }
        Ok(inbox)
    }

    pub async fn overview(&self) -> Result<Overview> {
        let sessions = self
            .sessions()
            .list()
            .await?
            .into_iter()
            .filter(|s| !s.is_closed())
            .collect();
        let directory = self.directory();
        let operators = directory
            .operators()
            .into_iter()
            .filter(|op| op.role == OperatorRole::Agent)
            .map(|operator| OperatorPresence {
                online: directory.is_online(&operator.id),
                operator,
            })
            .collect();
        Ok(Overview { sessions, operators })
    }

    /// Closed conversations of one customer, oldest first.
    pub async fn history(&self, customer_ref: &str) -> Result<Vec<Session>> {
        Ok(self
            .sessions()
            .list()
            .await?
            .into_iter()
            .filter(|s| s.is_closed() && s.customer_ref == customer_ref)
            .collect())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Cancel pending delay continuations.
    pub fn shutdown(&self) {
        info!("Desk shutting down");
        self.cancel.cancel();
    }
}
