use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

use flowdesk_core::catalogue::{ScheduleGroup, Template};
use flowdesk_core::error::{FlowdeskError, Result};
use flowdesk_core::traits::{
    Clock, HttpFetch, HttpResponse, QueueDirectory, ScheduleCatalogue, ScriptEval,
    TemplateCatalogue,
};
use flowdesk_core::types::{Operator, OperatorRole};

/// A clock that only moves when told to.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// HTTP fake answering from a fixed table. Unknown URLs fail like a
/// connection error. Every requested URL is recorded.
#[derive(Default)]
pub struct ScriptedHttp {
    responses: HashMap<String, HttpResponse>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, url: &str, status: u16, body: &str) -> Self {
        self.responses
            .insert(url.to_string(), HttpResponse::new(status, body));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl HttpFetch for ScriptedHttp {
    fn get(&self, url: String) -> BoxFuture<'_, Result<HttpResponse>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(url.clone());
            self.responses
                .get(&url)
                .cloned()
                .ok_or_else(|| FlowdeskError::Http(format!("connection refused: {}", url)))
        })
    }
}

/// Script evaluator that always fails.
pub struct FailingScript;

impl ScriptEval for FailingScript {
    fn run(
        &self,
        _variables: HashMap<String, String>,
        _script: String,
    ) -> BoxFuture<'_, Result<HashMap<String, String>>> {
        Box::pin(async { Err(FlowdeskError::Script("evaluator unavailable".into())) })
    }
}

/// Operator directory over a fixed roster. Heartbeats mark operators online
/// until the end of the test.
#[derive(Default)]
pub struct StaticDirectory {
    operators: Vec<Operator>,
    online: Mutex<HashSet<String>>,
}

impl StaticDirectory {
    pub fn new(operators: Vec<Operator>) -> Self {
        Self {
            operators,
            online: Mutex::new(HashSet::new()),
        }
    }
}

impl QueueDirectory for StaticDirectory {
    fn has_eligible_operator(&self, queue: &str) -> BoxFuture<'_, Result<bool>> {
        let found = self
            .operators
            .iter()
            .any(|op| op.role == OperatorRole::Agent && op.serves(queue));
        Box::pin(async move { Ok(found) })
    }

    fn operators(&self) -> Vec<Operator> {
        self.operators.clone()
    }

    fn heartbeat(&self, operator_id: &str) {
        self.online.lock().unwrap().insert(operator_id.to_string());
    }

    fn is_online(&self, operator_id: &str) -> bool {
        self.online.lock().unwrap().contains(operator_id)
    }
}

/// Schedules and templates held in maps.
#[derive(Default, Clone)]
pub struct StaticCatalogue {
    schedules: HashMap<String, ScheduleGroup>,
    templates: HashMap<String, Template>,
}

impl StaticCatalogue {
    pub fn with_schedule(mut self, group: ScheduleGroup) -> Self {
        self.schedules.insert(group.id.clone(), group);
        self
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.templates.insert(template.id.clone(), template);
        self
    }
}

impl ScheduleCatalogue for StaticCatalogue {
    fn get(&self, id: &str) -> Option<ScheduleGroup> {
        self.schedules.get(id).cloned()
    }
}

impl TemplateCatalogue for StaticCatalogue {
    fn get(&self, id: &str) -> Option<Template> {
        self.templates.get(id).cloned()
    }
}
