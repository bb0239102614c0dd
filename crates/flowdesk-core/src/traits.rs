use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

use crate::catalogue::{ScheduleGroup, Template};
use crate::error::Result;
use crate::session::{Closer, Session};
use crate::types::{Message, NewMessage, Operator, SessionId};

/// Result of an outbound GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub ok: bool,
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            ok: (200..300).contains(&status),
            status,
            body: body.into(),
        }
    }
}

/// Message sink: appends a message and returns the stored, timestamped copy.
pub trait MessageSink: Send + Sync + 'static {
    fn append(&self, sid: &SessionId, msg: NewMessage) -> BoxFuture<'_, Result<Message>>;
}

/// Variable patch: merges into the session's bag and returns the result.
pub trait VariablePatch: Send + Sync + 'static {
    fn apply(
        &self,
        sid: &SessionId,
        patch: HashMap<String, String>,
    ) -> BoxFuture<'_, Result<HashMap<String, String>>>;
}

/// Outbound HTTP: single GET, no retries, no forwarded credentials.
pub trait HttpFetch: Send + Sync + 'static {
    fn get(&self, url: String) -> BoxFuture<'_, Result<HttpResponse>>;
}

/// Sandboxed script evaluation: a pure transform of the variable bag.
///
/// Failures are reported as an error; a partial result is never returned.
pub trait ScriptEval: Send + Sync + 'static {
    fn run(
        &self,
        variables: HashMap<String, String>,
        script: String,
    ) -> BoxFuture<'_, Result<HashMap<String, String>>>;
}

/// Operator directory: which operators serve which queues, and who is online.
pub trait QueueDirectory: Send + Sync + 'static {
    /// Whether at least one operator may receive sessions from `queue`.
    fn has_eligible_operator(&self, queue: &str) -> BoxFuture<'_, Result<bool>>;

    /// Every known operator.
    fn operators(&self) -> Vec<Operator>;

    /// Record operator activity.
    fn heartbeat(&self, operator_id: &str) {
        let _ = operator_id;
    }

    /// Whether the operator has been active within the staleness window.
    fn is_online(&self, operator_id: &str) -> bool {
        let _ = operator_id;
        false
    }
}

/// Session store: persistence boundary of the session state machine.
pub trait SessionStore: Send + Sync + 'static {
    /// Return the customer's non-closed session, or create one.
    /// The flag is true when a new session was created.
    fn create(&self, customer_ref: &str) -> BoxFuture<'_, Result<(Session, bool)>>;

    fn find(&self, sid: &SessionId) -> BoxFuture<'_, Result<Option<Session>>>;

    fn transfer(
        &self,
        sid: &SessionId,
        queue: Option<String>,
        operator: Option<String>,
    ) -> BoxFuture<'_, Result<Session>>;

    fn pickup(
        &self,
        sid: &SessionId,
        operator: &Operator,
        announcement: String,
    ) -> BoxFuture<'_, Result<Session>>;

    fn close(
        &self,
        sid: &SessionId,
        closer: Closer,
        farewell: String,
    ) -> BoxFuture<'_, Result<Session>>;

    fn append_message(&self, sid: &SessionId, msg: NewMessage) -> BoxFuture<'_, Result<Message>>;

    fn append_operator_message(
        &self,
        sid: &SessionId,
        operator_id: &str,
        text: String,
    ) -> BoxFuture<'_, Result<Message>>;

    fn set_pending(&self, sid: &SessionId, node: Option<String>) -> BoxFuture<'_, Result<()>>;

    /// All sessions, in creation order.
    fn list(&self) -> BoxFuture<'_, Result<Vec<Session>>>;
}

pub trait ScheduleCatalogue: Send + Sync + 'static {
    fn get(&self, id: &str) -> Option<ScheduleGroup>;
}

pub trait TemplateCatalogue: Send + Sync + 'static {
    fn get(&self, id: &str) -> Option<Template>;
}

/// Wall clock, injectable for tests.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}
