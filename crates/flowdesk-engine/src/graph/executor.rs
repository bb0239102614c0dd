use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use flowdesk_core::config::{EngineConfig, MessagesConfig};
use flowdesk_core::error::{FlowdeskError, Result};
use flowdesk_core::session::Closer;
use flowdesk_core::traits::{
    Clock, HttpFetch, MessageSink, QueueDirectory, ScheduleCatalogue, ScriptEval, SessionStore,
    TemplateCatalogue, VariablePatch,
};
use flowdesk_core::types::{Button, NewMessage, SessionId};

use super::edge::{HANDLE_ELSE, HANDLE_INSIDE, HANDLE_OUTSIDE};
use super::flow::FlowGraph;
use super::node::{ConditionRule, Node, NodeKind, ResponseMapping};
use crate::condition;
use crate::schedule;
use crate::variables::Variables;

/// Outcome of an interpreter run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Step budget exhausted; call `advance` again from this node.
    ContinuedTo(String),
    /// Waiting for a customer reply at this node.
    Paused(String),
    /// Handed to the named queue; the session is now operator-owned.
    Queued(String),
    /// Reached an end/final node, or the queue was unavailable.
    Terminated,
    /// A delay node; continue from `next` once `duration` has elapsed.
    Delayed {
        node: String,
        next: String,
        duration: Duration,
    },
    /// No edge to follow from this node.
    Stalled(String),
}

/// A customer reply delivered to a paused session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub button_id: Option<String>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            button_id: None,
        }
    }

    pub fn button(id: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            button_id: Some(id.into()),
        }
    }
}

/// The collaborators node handlers reach through.
#[derive(Clone)]
pub struct Effects {
    pub sink: Arc<dyn MessageSink>,
    pub variables: Arc<dyn VariablePatch>,
    pub http: Arc<dyn HttpFetch>,
    pub script: Arc<dyn ScriptEval>,
    pub queues: Arc<dyn QueueDirectory>,
    pub sessions: Arc<dyn SessionStore>,
    pub schedules: Arc<dyn ScheduleCatalogue>,
    pub templates: Arc<dyn TemplateCatalogue>,
    pub clock: Arc<dyn Clock>,
}

enum Step {
    Next(String),
    Halt(Outcome),
}

/// Walks a published graph for one session at a time.
///
/// The executor holds no per-session state; callers pass the session's
/// variables in and must serialise calls for the same session.
pub struct FlowExecutor {
    effects: Effects,
    engine: EngineConfig,
    messages: MessagesConfig,
}

impl FlowExecutor {
    pub fn new(effects: Effects, engine: EngineConfig, messages: MessagesConfig) -> Self {
        Self {
            effects,
            engine,
            messages,
        }
    }

    pub fn effects(&self) -> &Effects {
        &self.effects
    }

    pub fn messages(&self) -> &MessagesConfig {
        &self.messages
    }

    /// Execute nodes starting at `node_id` until a suspension point, a
    /// terminal node, or the step budget runs out.
    pub async fn advance(
        &self,
        graph: &FlowGraph,
        node_id: &str,
        sid: &SessionId,
        vars: &mut Variables,
    ) -> Result<Outcome> {
        if graph.node(node_id).is_none() {
            return Err(FlowdeskError::NodeNotFound(node_id.to_string()));
        }

        let mut current = node_id.to_string();
        for _ in 0..self.engine.step_budget.max(1) {
            let node = match graph.node(&current) {
                Some(n) => n,
                None => {
                    warn!(session = %sid, node_id = %current, "Edge target vanished, stalling");
                    return Ok(Outcome::Stalled(current));
                }
            };

            debug!(session = %sid, node_id = %node.id, kind = node.kind.name(), "Executing node");

            match self.step(graph, node, sid, vars).await? {
                Step::Next(next) => current = next,
                Step::Halt(outcome) => {
                    if let Outcome::Stalled(ref at) = outcome {
                        warn!(session = %sid, node_id = %at, "No edge to follow, flow stalled");
                    }
                    return Ok(outcome);
                }
            }
        }

        debug!(session = %sid, node_id = %current, "Step budget exhausted");
        Ok(Outcome::ContinuedTo(current))
    }

    /// Continue a session paused at an input or template node.
    ///
    /// A template reply that selects none of the offered buttons leaves the
    /// session paused where it was.
    pub async fn resume(
        &self,
        graph: &FlowGraph,
        pending: &str,
        sid: &SessionId,
        vars: &mut Variables,
        reply: &Reply,
    ) -> Result<Outcome> {
        let node = graph
            .node(pending)
            .ok_or_else(|| FlowdeskError::NodeNotFound(pending.to_string()))?;

        let next = match &node.kind {
            NodeKind::Input { variable, .. } => {
                let answer = match (&reply.button_id, reply.text.is_empty()) {
                    (Some(button), true) => button.clone(),
                    _ => reply.text.clone(),
                };
                self.patch(sid, vars, HashMap::from([(variable.clone(), answer)]))
                    .await?;
                graph.next(&node.id)
            }
            NodeKind::Template { template_id } => {
                let chosen = self
                    .effects
                    .templates
                    .get(template_id)
                    .and_then(|t| chosen_button(&t.buttons, reply));
                match chosen {
                    Some(button) => {
                        debug!(session = %sid, node_id = %node.id, button = %button, "Button selected");
                        graph.branch(&node.id, &button)
                    }
                    None => return Ok(Outcome::Paused(node.id.clone())),
                }
            }
            other => {
                warn!(session = %sid, node_id = %node.id, kind = other.name(), "Reply for a node that does not wait");
                return Ok(Outcome::Stalled(node.id.clone()));
            }
        };

        match next {
            Some(target) => self.advance(graph, target, sid, vars).await,
            None => Ok(Outcome::Stalled(node.id.clone())),
        }
    }

    async fn step(
        &self,
        graph: &FlowGraph,
        node: &Node,
        sid: &SessionId,
        vars: &mut Variables,
    ) -> Result<Step> {
        match &node.kind {
            NodeKind::Start { text } => {
                if let Some(text) = text.as_deref().filter(|t| !is_placeholder_start(t)) {
                    self.say(sid, vars.interpolate(text)).await?;
                }
                Ok(follow(graph, node))
            }

            NodeKind::Message { text } => {
                self.say(sid, vars.interpolate(text)).await?;
                Ok(follow(graph, node))
            }

            NodeKind::Input { text, .. } => {
                self.say(sid, vars.interpolate(text)).await?;
                Ok(Step::Halt(Outcome::Paused(node.id.clone())))
            }

            NodeKind::SetValue { variable, value } => {
                let value = vars.interpolate(value);
                self.patch(sid, vars, HashMap::from([(variable.clone(), value)]))
                    .await?;
                Ok(follow(graph, node))
            }

            NodeKind::Condition { rules } => Ok(self.branch_on_rules(graph, node, rules, vars)),

            NodeKind::Anchor { .. } => Ok(follow(graph, node)),

            NodeKind::Goto { target } => {
                if graph.node(target).is_some() {
                    Ok(Step::Next(target.clone()))
                } else {
                    warn!(session = %sid, node_id = %node.id, target = %target, "Jump target not found");
                    Ok(Step::Halt(Outcome::Stalled(node.id.clone())))
                }
            }

            NodeKind::HttpRequest { url, mappings } => {
                let url = vars.interpolate(url);
                match self.fetch(&url, mappings).await {
                    Ok(patch) => {
                        if !patch.is_empty() {
                            self.patch(sid, vars, patch).await?;
                        }
                    }
                    Err(e) => {
                        warn!(session = %sid, node_id = %node.id, url = %url, error = %e, "HTTP request failed");
                        self.say(sid, self.messages.http_failure.clone()).await?;
                    }
                }
                Ok(follow(graph, node))
            }

            NodeKind::Script { script } => {
                let result = self
                    .effects
                    .script
                    .run(vars.data().clone(), script.clone())
                    .await;
                match result {
                    Ok(bag) => self.patch(sid, vars, bag).await?,
                    Err(e) => {
                        error!(session = %sid, node_id = %node.id, error = %e, "Script failed");
                        self.say(sid, self.messages.script_failure.clone()).await?;
                    }
                }
                Ok(follow(graph, node))
            }

            NodeKind::Delay { seconds } => match graph.next(&node.id) {
                Some(next) => Ok(Step::Halt(Outcome::Delayed {
                    node: node.id.clone(),
                    next: next.to_string(),
                    duration: Duration::from_secs(*seconds),
                })),
                None => Ok(Step::Halt(Outcome::Stalled(node.id.clone()))),
            },

            NodeKind::Schedule { schedule_id } => {
                let inside = match self.effects.schedules.get(schedule_id) {
                    Some(group) => {
                        let now = schedule::local_time(
                            self.effects.clock.now(),
                            self.engine.utc_offset_hours,
                        );
                        schedule::is_open(&group, now)
                    }
                    None => {
                        warn!(session = %sid, node_id = %node.id, schedule = %schedule_id, "Unknown schedule, treating as closed");
                        false
                    }
                };
                let handle = if inside { HANDLE_INSIDE } else { HANDLE_OUTSIDE };
                debug!(session = %sid, node_id = %node.id, handle, "Schedule evaluated");
                Ok(match graph.branch(&node.id, handle) {
                    Some(next) => Step::Next(next.to_string()),
                    None => Step::Halt(Outcome::Stalled(node.id.clone())),
                })
            }

            NodeKind::Template { template_id } => match self.effects.templates.get(template_id) {
                Some(template) => {
                    let msg = NewMessage::bot_with_buttons(
                        vars.interpolate(&template.text),
                        template.buttons.clone(),
                    );
                    self.effects.sink.append(sid, msg).await?;
                    Ok(Step::Halt(Outcome::Paused(node.id.clone())))
                }
                None => {
                    warn!(session = %sid, node_id = %node.id, template = %template_id, "Unknown template");
                    Ok(Step::Halt(Outcome::Stalled(node.id.clone())))
                }
            },

            NodeKind::Queue { queue } => {
                self.say(sid, self.messages.queue_transfer.replace("{queue}", queue))
                    .await?;
                let available = match self.effects.queues.has_eligible_operator(queue).await {
                    Ok(available) => available,
                    Err(e) => {
                        warn!(session = %sid, queue = %queue, error = %e, "Queue lookup failed");
                        false
                    }
                };
                if available {
                    self.effects
                        .sessions
                        .transfer(sid, Some(queue.clone()), None)
                        .await?;
                    info!(session = %sid, queue = %queue, "Session queued");
                    Ok(Step::Halt(Outcome::Queued(queue.clone())))
                } else {
                    info!(session = %sid, queue = %queue, "Queue unavailable");
                    self.say(sid, self.messages.queue_unavailable.replace("{queue}", queue))
                        .await?;
                    Ok(Step::Halt(Outcome::Terminated))
                }
            }

            NodeKind::End { text } => {
                self.say(sid, self.closing_text(text.as_deref(), vars)).await?;
                Ok(Step::Halt(Outcome::Terminated))
            }

            NodeKind::Final { text } => {
                self.say(sid, self.closing_text(text.as_deref(), vars)).await?;
                self.effects
                    .sessions
                    .close(sid, Closer::Flow, self.messages.closed.clone())
                    .await?;
                info!(session = %sid, node_id = %node.id, "Session closed by flow");
                Ok(Step::Halt(Outcome::Terminated))
            }
        }
    }

    /// First matching rule with an edge wins, then `else`.
    fn branch_on_rules(
        &self,
        graph: &FlowGraph,
        node: &Node,
        rules: &[ConditionRule],
        vars: &Variables,
    ) -> Step {
        for rule in rules {
            let value = vars.get(&rule.variable).unwrap_or("");
            if !condition::matches(value, rule.operator, &rule.value) {
                continue;
            }
            match graph.branch(&node.id, &rule.id) {
                Some(next) => {
                    debug!(node_id = %node.id, rule = %rule.id, "Condition matched");
                    return Step::Next(next.to_string());
                }
                None => debug!(node_id = %node.id, rule = %rule.id, "Matched rule has no edge"),
            }
        }

        match graph.branch(&node.id, HANDLE_ELSE) {
            Some(next) => Step::Next(next.to_string()),
            None => Step::Halt(Outcome::Stalled(node.id.clone())),
        }
    }

    async fn fetch(
        &self,
        url: &str,
        mappings: &[ResponseMapping],
    ) -> Result<HashMap<String, String>> {
        let response = self.effects.http.get(url.to_string()).await?;
        if !response.ok {
            return Err(FlowdeskError::Http(format!("status {}", response.status)));
        }

        let mut patch = HashMap::new();
        if mappings.is_empty() {
            return Ok(patch);
        }

        let body: serde_json::Value = serde_json::from_str(&response.body)?;
        for mapping in mappings {
            if mapping.variable.is_empty() {
                continue;
            }
            if let Some(value) = lookup(&body, &mapping.json_path).and_then(stringify) {
                patch.insert(mapping.variable.clone(), value);
            }
        }
        Ok(patch)
    }

    async fn say(&self, sid: &SessionId, text: String) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        self.effects.sink.append(sid, NewMessage::bot(text)).await?;
        Ok(())
    }

    async fn patch(
        &self,
        sid: &SessionId,
        vars: &mut Variables,
        patch: HashMap<String, String>,
    ) -> Result<()> {
        let merged = self.effects.variables.apply(sid, patch).await?;
        vars.replace(merged);
        Ok(())
    }

    fn closing_text(&self, text: Option<&str>, vars: &Variables) -> String {
        match text.filter(|t| !t.trim().is_empty()) {
            Some(t) => vars.interpolate(t),
            None => self.messages.closing.clone(),
        }
    }
}

fn follow(graph: &FlowGraph, node: &Node) -> Step {
    match graph.next(&node.id) {
        Some(next) => Step::Next(next.to_string()),
        None => Step::Halt(Outcome::Stalled(node.id.clone())),
    }
}

/// The editor labels every new start node "Início"; that label is not a greeting.
fn is_placeholder_start(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text == "Início" || text.eq_ignore_ascii_case("start")
}

/// Button by id, or by a typed reply equal to its label.
fn chosen_button(buttons: &[Button], reply: &Reply) -> Option<String> {
    if let Some(id) = reply.button_id.as_deref() {
        return buttons.iter().find(|b| b.id == id).map(|b| b.id.clone());
    }
    let typed = reply.text.trim();
    buttons
        .iter()
        .find(|b| !typed.is_empty() && b.label.trim().eq_ignore_ascii_case(typed))
        .map(|b| b.id.clone())
}

/// Resolve a dotted path (`a.b.0.c`) in a JSON document.
fn lookup<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    if path.is_empty() {
        return None;
    }
    path.split('.').try_fold(value, |current, key| match current {
        serde_json::Value::Object(map) => map.get(key),
        serde_json::Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn stringify(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Operator;
    use crate::graph::edge::Edge;
    use chrono::TimeZone;
    use flowdesk_core::catalogue::{DayRule, ScheduleGroup, Template};
    use flowdesk_core::session::SessionStatus;
    use flowdesk_core::types::{Operator as Agent, Sender};
    use flowdesk_store::MemoryStore;
    use flowdesk_test_utils::{FailingScript, FixedClock, ScriptedHttp, StaticCatalogue, StaticDirectory};

    struct Harness {
        store: Arc<MemoryStore>,
        http: Arc<ScriptedHttp>,
        executor: FlowExecutor,
        sid: SessionId,
    }

    async fn harness_with(
        http: ScriptedHttp,
        directory: StaticDirectory,
        catalogue: StaticCatalogue,
        clock: FixedClock,
    ) -> Harness {
        let clock = Arc::new(clock);
        let store = Arc::new(MemoryStore::new(clock.clone()));
        let http = Arc::new(http);
        let catalogue = Arc::new(catalogue);
        let effects = Effects {
            sink: store.clone(),
            variables: store.clone(),
            http: http.clone(),
            script: Arc::new(FailingScript),
            queues: Arc::new(directory),
            sessions: store.clone(),
            schedules: catalogue.clone(),
            templates: catalogue,
            clock,
        };
        let (session, _) = store.create("5511999999999").await.unwrap();
        Harness {
            store,
            http,
            executor: FlowExecutor::new(effects, EngineConfig::default(), MessagesConfig::default()),
            sid: session.id,
        }
    }

    async fn harness() -> Harness {
        harness_with(
            ScriptedHttp::new(),
            StaticDirectory::default(),
            StaticCatalogue::default(),
            FixedClock::at(chrono::Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()),
        )
        .await
    }

    impl Harness {
        async fn texts(&self) -> Vec<String> {
            let session = self.store.find(&self.sid).await.unwrap().unwrap();
            session.messages.into_iter().map(|m| m.text).collect()
        }
    }

    fn graph(nodes: Vec<Node>, edges: Vec<Edge>) -> FlowGraph {
        FlowGraph::new("t", nodes, edges).unwrap()
    }

    #[tokio::test]
    async fn test_linear_flow_reaches_end() {
        let h = harness().await;
        let g = graph(
            vec![Node::start("s"), Node::message("m", "Olá"), Node::end("e")],
            vec![Edge::always("s", "m"), Edge::always("m", "e")],
        );
        let mut vars = Variables::new();
        let outcome = h.executor.advance(&g, "s", &h.sid, &mut vars).await.unwrap();
        assert_eq!(outcome, Outcome::Terminated);
        assert_eq!(h.texts().await, vec!["Olá", "Conversation finished."]);
    }

    #[tokio::test]
    async fn test_set_value_then_interpolate() {
        let h = harness().await;
        let g = graph(
            vec![
                Node::start("s"),
                Node::set_value("v", "plano", "Ouro"),
                Node::message("m", "Seu plano: {plano} {desconhecido}"),
            ],
            vec![Edge::always("s", "v"), Edge::always("v", "m")],
        );
        let mut vars = Variables::new();
        let outcome = h.executor.advance(&g, "s", &h.sid, &mut vars).await.unwrap();
        assert_eq!(outcome, Outcome::Stalled("m".into()));
        assert_eq!(vars.get("plano"), Some("Ouro"));
        assert_eq!(h.texts().await, vec!["Seu plano: Ouro {desconhecido}"]);
    }

    #[tokio::test]
    async fn test_input_pauses_and_resumes() {
        let h = harness().await;
        let g = graph(
            vec![
                Node::start("s"),
                Node::input("i", "Qual seu nome?", "nome"),
                Node::message("m", "Oi {nome}"),
            ],
            vec![Edge::always("s", "i"), Edge::always("i", "m")],
        );
        let mut vars = Variables::new();
        let outcome = h.executor.advance(&g, "s", &h.sid, &mut vars).await.unwrap();
        assert_eq!(outcome, Outcome::Paused("i".into()));

        let outcome = h
            .executor
            .resume(&g, "i", &h.sid, &mut vars, &Reply::text("  Ana "))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Stalled("m".into()));
        assert_eq!(vars.get("nome"), Some("  Ana "));
        assert_eq!(h.texts().await.last().unwrap(), "Oi   Ana ");
    }

    #[tokio::test]
    async fn test_input_stores_button_id_for_button_reply() {
        let h = harness().await;
        let g = graph(
            vec![Node::start("s"), Node::input("i", "Escolha", "opcao")],
            vec![Edge::always("s", "i")],
        );
        let mut vars = Variables::new();
        h.executor.advance(&g, "s", &h.sid, &mut vars).await.unwrap();

        let outcome = h
            .executor
            .resume(&g, "i", &h.sid, &mut vars, &Reply::button("b1"))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Stalled("i".into()));
        assert_eq!(vars.get("opcao"), Some("b1"));
    }

    #[tokio::test]
    async fn test_condition_skips_rule_without_edge_and_uses_else() {
        let h = harness().await;
        let rules = vec![
            ConditionRule::new("r1", "idade", Operator::Gt, "17"),
            ConditionRule::new("r2", "idade", Operator::Gt, "10"),
        ];
        let g = graph(
            vec![
                Node::start("s"),
                Node::set_value("v", "idade", "20"),
                Node::condition("c", rules),
                Node::message("adult", "adulto"),
                Node::message("other", "outro"),
            ],
            vec![
                Edge::always("s", "v"),
                Edge::always("v", "c"),
                Edge::branch("c", "r2", "adult"),
                Edge::branch("c", HANDLE_ELSE, "other"),
            ],
        );
        let mut vars = Variables::new();
        h.executor.advance(&g, "s", &h.sid, &mut vars).await.unwrap();
        assert_eq!(h.texts().await, vec!["adulto"]);
    }

    #[tokio::test]
    async fn test_condition_without_match_or_else_stalls() {
        let h = harness().await;
        let g = graph(
            vec![
                Node::start("s"),
                Node::condition("c", vec![ConditionRule::new("r1", "x", Operator::Eq, "1")]),
                Node::end("e"),
            ],
            vec![Edge::always("s", "c"), Edge::branch("c", "r1", "e")],
        );
        let mut vars = Variables::new();
        let outcome = h.executor.advance(&g, "s", &h.sid, &mut vars).await.unwrap();
        assert_eq!(outcome, Outcome::Stalled("c".into()));
        assert!(h.texts().await.is_empty());
    }

    #[tokio::test]
    async fn test_goto_loop_respects_step_budget() {
        let h = harness().await;
        let g = graph(
            vec![Node::start("s"), Node::anchor("a"), Node::goto("g", "a")],
            vec![Edge::always("s", "a"), Edge::always("a", "g")],
        );
        let mut vars = Variables::new();
        let outcome = h.executor.advance(&g, "s", &h.sid, &mut vars).await.unwrap();
        assert!(matches!(outcome, Outcome::ContinuedTo(_)));
    }

    #[tokio::test]
    async fn test_goto_missing_target_stalls() {
        let h = harness().await;
        let g = graph(
            vec![Node::start("s"), Node::goto("g", "nowhere")],
            vec![Edge::always("s", "g")],
        );
        let mut vars = Variables::new();
        let outcome = h.executor.advance(&g, "s", &h.sid, &mut vars).await.unwrap();
        assert_eq!(outcome, Outcome::Stalled("g".into()));
    }

    #[tokio::test]
    async fn test_http_maps_response() {
        let http = ScriptedHttp::new().respond(
            "https://erp.local/clientes/123",
            200,
            r#"{"cliente":{"nome":"Ana","score":7.5,"tags":["a","b"]}}"#,
        );
        let h = harness_with(
            http,
            StaticDirectory::default(),
            StaticCatalogue::default(),
            FixedClock::at(chrono::Utc::now()),
        )
        .await;
        let g = graph(
            vec![
                Node::start("s"),
                Node::set_value("v", "cpf", "123"),
                Node::http(
                    "h",
                    "https://erp.local/clientes/{cpf}",
                    vec![
                        ResponseMapping::new("cliente.nome", "nome"),
                        ResponseMapping::new("cliente.score", "score"),
                        ResponseMapping::new("cliente.tags.1", "tag"),
                        ResponseMapping::new("cliente.ausente", "ausente"),
                    ],
                ),
                Node::end("e"),
            ],
            vec![Edge::always("s", "v"), Edge::always("v", "h"), Edge::always("h", "e")],
        );
        let mut vars = Variables::new();
        h.executor.advance(&g, "s", &h.sid, &mut vars).await.unwrap();
        assert_eq!(vars.get("nome"), Some("Ana"));
        assert_eq!(vars.get("score"), Some("7.5"));
        assert_eq!(vars.get("tag"), Some("b"));
        assert_eq!(vars.get("ausente"), None);
        assert_eq!(h.http.calls(), vec!["https://erp.local/clientes/123".to_string()]);
    }

    #[tokio::test]
    async fn test_http_failure_warns_and_continues() {
        let http = ScriptedHttp::new().respond("https://erp.local/x", 500, "{}");
        let h = harness_with(
            http,
            StaticDirectory::default(),
            StaticCatalogue::default(),
            FixedClock::at(chrono::Utc::now()),
        )
        .await;
        let g = graph(
            vec![
                Node::start("s"),
                Node::http("h", "https://erp.local/x", vec![ResponseMapping::new("a", "a")]),
                Node::end("e"),
            ],
            vec![Edge::always("s", "h"), Edge::always("h", "e")],
        );
        let mut vars = Variables::new();
        let outcome = h.executor.advance(&g, "s", &h.sid, &mut vars).await.unwrap();
        assert_eq!(outcome, Outcome::Terminated);
        assert_eq!(
            h.texts().await,
            vec![MessagesConfig::default().http_failure, MessagesConfig::default().closing]
        );
        assert!(vars.data().is_empty());
    }

    #[tokio::test]
    async fn test_script_failure_keeps_variables() {
        let h = harness().await;
        let g = graph(
            vec![
                Node::start("s"),
                Node::set_value("v", "x", "1"),
                Node::script("sc", "vars.x = vars.x +"),
                Node::message("m", "x={x}"),
            ],
            vec![Edge::always("s", "v"), Edge::always("v", "sc"), Edge::always("sc", "m")],
        );
        let mut vars = Variables::new();
        h.executor.advance(&g, "s", &h.sid, &mut vars).await.unwrap();
        assert_eq!(
            h.texts().await,
            vec![MessagesConfig::default().script_failure, "x=1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_delay_outcome() {
        let h = harness().await;
        let g = graph(
            vec![Node::start("s"), Node::delay("d", 3), Node::end("e")],
            vec![Edge::always("s", "d"), Edge::always("d", "e")],
        );
        let mut vars = Variables::new();
        let outcome = h.executor.advance(&g, "s", &h.sid, &mut vars).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Delayed {
                node: "d".into(),
                next: "e".into(),
                duration: Duration::from_secs(3)
            }
        );
    }

    #[tokio::test]
    async fn test_schedule_branches() {
        let group = ScheduleGroup::new("comercial", "Comercial")
            .with_rule("Segunda", DayRule::open("08:00", "18:00"))
            .with_rule("Domingo", DayRule::closed());
        let catalogue = StaticCatalogue::default().with_schedule(group);
        let g = graph(
            vec![
                Node::start("s"),
                Node::schedule("h", "comercial"),
                Node::message("in", "aberto"),
                Node::message("out", "fechado"),
            ],
            vec![
                Edge::always("s", "h"),
                Edge::branch("h", HANDLE_INSIDE, "in"),
                Edge::branch("h", HANDLE_OUTSIDE, "out"),
            ],
        );

        // Monday 09:00 and 19:00
        for (hour, expected) in [(9, "aberto"), (19, "fechado")] {
            let h = harness_with(
                ScriptedHttp::new(),
                StaticDirectory::default(),
                catalogue.clone(),
                FixedClock::at(chrono::Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()),
            )
            .await;
            let mut vars = Variables::new();
            h.executor.advance(&g, "s", &h.sid, &mut vars).await.unwrap();
            assert_eq!(h.texts().await, vec![expected]);
        }
    }

    #[tokio::test]
    async fn test_template_waits_for_offered_button() {
        let template = Template {
            id: "menu".into(),
            name: "Menu".into(),
            text: "Olá {nome}, escolha:".into(),
            buttons: vec![Button::new("b1", "Suporte"), Button::new("b2", "Vendas")],
        };
        let h = harness_with(
            ScriptedHttp::new(),
            StaticDirectory::default(),
            StaticCatalogue::default().with_template(template),
            FixedClock::at(chrono::Utc::now()),
        )
        .await;
        let g = graph(
            vec![
                Node::start("s"),
                Node::template("t", "menu"),
                Node::message("sup", "suporte"),
                Node::message("ven", "vendas"),
            ],
            vec![
                Edge::always("s", "t"),
                Edge::branch("t", "b1", "sup"),
                Edge::branch("t", "b2", "ven"),
            ],
        );
        let mut vars = Variables::from_map(HashMap::from([("nome".into(), "Ana".into())]));
        let outcome = h.executor.advance(&g, "s", &h.sid, &mut vars).await.unwrap();
        assert_eq!(outcome, Outcome::Paused("t".into()));

        let session = h.store.find(&h.sid).await.unwrap().unwrap();
        let offered = session.messages.last().unwrap();
        assert_eq!(offered.text, "Olá Ana, escolha:");
        assert_eq!(offered.buttons.as_ref().map(|b| b.len()), Some(2));

        let outcome = h
            .executor
            .resume(&g, "t", &h.sid, &mut vars, &Reply::button("b9"))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Paused("t".into()));

        h.executor
            .resume(&g, "t", &h.sid, &mut vars, &Reply::text("vendas"))
            .await
            .unwrap();
        assert_eq!(h.texts().await.last().unwrap(), "vendas");
    }

    #[tokio::test]
    async fn test_queue_available_transfers() {
        let directory = StaticDirectory::new(vec![Agent::agent("op1", "Bruno", vec!["sac".into()])]);
        let h = harness_with(
            ScriptedHttp::new(),
            directory,
            StaticCatalogue::default(),
            FixedClock::at(chrono::Utc::now()),
        )
        .await;
        let g = graph(
            vec![Node::start("s"), Node::queue("q", "SAC")],
            vec![Edge::always("s", "q")],
        );
        let mut vars = Variables::new();
        let outcome = h.executor.advance(&g, "s", &h.sid, &mut vars).await.unwrap();
        assert_eq!(outcome, Outcome::Queued("SAC".into()));

        let session = h.store.find(&h.sid).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Waiting);
        assert_eq!(session.queue.as_deref(), Some("SAC"));
        assert_eq!(session.messages[0].text, "Transferring to: SAC...");
    }

    #[tokio::test]
    async fn test_queue_unavailable_halts() {
        let h = harness().await;
        let g = graph(
            vec![Node::start("s"), Node::queue("q", "SAC")],
            vec![Edge::always("s", "q")],
        );
        let mut vars = Variables::new();
        let outcome = h.executor.advance(&g, "s", &h.sid, &mut vars).await.unwrap();
        assert_eq!(outcome, Outcome::Terminated);

        let session = h.store.find(&h.sid).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Bot);
        assert_eq!(session.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_final_closes_session() {
        let h = harness().await;
        let g = graph(
            vec![
                Node::start("s"),
                Node::new("f", NodeKind::Final { text: Some("Tchau {nome}".into()) }),
            ],
            vec![Edge::always("s", "f")],
        );
        let mut vars = Variables::new();
        h.executor.advance(&g, "s", &h.sid, &mut vars).await.unwrap();

        let session = h.store.find(&h.sid).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Closed);
        assert_eq!(session.messages[0].text, "Tchau {nome}");
        assert_eq!(session.messages[1].sender, Sender::System);
    }

    #[tokio::test]
    async fn test_start_text_greets_unless_placeholder() {
        let h = harness().await;
        let g = graph(
            vec![
                Node::new("s", NodeKind::Start { text: Some("Início".into()) }),
                Node::end("e"),
            ],
            vec![Edge::always("s", "e")],
        );
        let mut vars = Variables::new();
        h.executor.advance(&g, "s", &h.sid, &mut vars).await.unwrap();
        assert_eq!(h.texts().await, vec!["Conversation finished."]);
    }

    #[tokio::test]
    async fn test_unknown_start_node_is_error() {
        let h = harness().await;
        let g = graph(vec![Node::start("s")], vec![]);
        let mut vars = Variables::new();
        let err = h.executor.advance(&g, "ghost", &h.sid, &mut vars).await.unwrap_err();
        assert!(matches!(err, FlowdeskError::NodeNotFound(_)));
    }

    #[test]
    fn test_lookup_paths() {
        let doc = serde_json::json!({"a": {"b": [10, {"c": true}]}});
        assert_eq!(lookup(&doc, "a.b.0").and_then(stringify).as_deref(), Some("10"));
        assert_eq!(lookup(&doc, "a.b.1.c").and_then(stringify).as_deref(), Some("true"));
        assert!(lookup(&doc, "a.x").is_none());
        assert!(lookup(&doc, "").is_none());
    }
}
