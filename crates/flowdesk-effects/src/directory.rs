use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::Instant;
use tracing::debug;

use flowdesk_core::config::{DirectoryConfig, PresenceConfig};
use flowdesk_core::error::Result;
use flowdesk_core::traits::QueueDirectory;
use flowdesk_core::types::{Operator, OperatorRole};

/// Operator presence from heartbeats.
///
/// Process-local: empty after a restart. An operator is online while their
/// last heartbeat is younger than the staleness window.
pub struct Presence {
    last_seen: Mutex<HashMap<String, Instant>>,
    staleness: Duration,
}

impl Presence {
    pub fn new(staleness: Duration) -> Self {
        Self {
            last_seen: Mutex::new(HashMap::new()),
            staleness,
        }
    }

    pub fn from_config(config: &PresenceConfig) -> Self {
        Self::new(Duration::from_secs(config.staleness_secs))
    }

    pub fn touch(&self, operator_id: &str) {
        let mut seen = self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.insert(operator_id.to_string(), Instant::now());
    }

    pub fn is_online(&self, operator_id: &str) -> bool {
        let seen = self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.get(operator_id)
            .is_some_and(|at| at.elapsed() < self.staleness)
    }

    /// Forget expired entries. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let mut seen = self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
        let before = seen.len();
        seen.retain(|_, at| at.elapsed() < self.staleness);
        before - seen.len()
    }
}

/// Fixed operator roster with presence tracking.
///
/// Only operators with the agent role serve queues; queue names match
/// case-insensitively. With `require_online`, a queue is available only
/// while one of its agents is online.
pub struct OperatorDirectory {
    operators: Vec<Operator>,
    presence: Presence,
    require_online: bool,
}

impl OperatorDirectory {
    pub fn new(operators: Vec<Operator>, presence: Presence, config: &DirectoryConfig) -> Self {
        Self {
            operators,
            presence,
            require_online: config.require_online,
        }
    }

    /// Load a JSON array of operators. Unknown fields (credentials and the
    /// like) are ignored.
    pub fn load(path: &Path, presence: Presence, config: &DirectoryConfig) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let operators: Vec<Operator> = serde_json::from_str(&content)?;
        debug!(path = %path.display(), count = operators.len(), "Operators loaded");
        Ok(Self::new(operators, presence, config))
    }

    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    fn eligible(&self, queue: &str) -> bool {
        self.operators.iter().any(|op| {
            op.role == OperatorRole::Agent
                && op.serves(queue)
                && (!self.require_online || self.presence.is_online(&op.id))
        })
    }
}

impl QueueDirectory for OperatorDirectory {
    fn has_eligible_operator(&self, queue: &str) -> BoxFuture<'_, Result<bool>> {
        let found = self.eligible(queue);
        Box::pin(async move { Ok(found) })
    }

    fn operators(&self) -> Vec<Operator> {
        self.operators.clone()
    }

    fn heartbeat(&self, operator_id: &str) {
        self.presence.touch(operator_id);
        let expired = self.presence.sweep();
        if expired > 0 {
            debug!(expired, "Stale operators dropped from presence");
        }
    }

    fn is_online(&self, operator_id: &str) -> bool {
        self.presence.is_online(operator_id)
    }
}
