use serde::{Deserialize, Deserializer, Serialize};

use crate::condition::Operator;

use super::GraphError;

/// One rule of a condition node. The rule id doubles as the edge handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRule {
    pub id: String,
    pub variable: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: String,
}

impl ConditionRule {
    pub fn new(
        id: impl Into<String>,
        variable: impl Into<String>,
        operator: Operator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            variable: variable.into(),
            operator,
            value: value.into(),
        }
    }
}

/// Maps a field of an HTTP JSON response into a variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMapping {
    /// Dotted path into the response, e.g. `cliente.plano` or `items.0.id`.
    #[serde(default)]
    pub json_path: String,
    #[serde(default, alias = "varName")]
    pub variable: String,
}

impl ResponseMapping {
    pub fn new(json_path: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            json_path: json_path.into(),
            variable: variable.into(),
        }
    }
}

/// Node behavior and its configuration. A closed set, dispatched by `match`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "config", rename_all = "camelCase")]
pub enum NodeKind {
    #[serde(alias = "startNode")]
    Start {
        #[serde(default)]
        text: Option<String>,
    },
    #[serde(alias = "messageNode")]
    Message {
        #[serde(default)]
        text: String,
    },
    #[serde(alias = "inputNode")]
    Input {
        #[serde(default)]
        text: String,
        #[serde(alias = "variableName")]
        variable: String,
    },
    #[serde(alias = "setValueNode")]
    SetValue {
        #[serde(alias = "variableName")]
        variable: String,
        #[serde(default)]
        value: String,
    },
    #[serde(alias = "conditionNode")]
    Condition {
        #[serde(default, alias = "conditions")]
        rules: Vec<ConditionRule>,
    },
    #[serde(alias = "anchorNode")]
    Anchor {
        #[serde(default, alias = "anchorName")]
        name: Option<String>,
    },
    #[serde(alias = "gotoNode")]
    Goto {
        #[serde(alias = "targetAnchorId")]
        target: String,
    },
    #[serde(alias = "httpRequestNode")]
    HttpRequest {
        url: String,
        #[serde(default)]
        mappings: Vec<ResponseMapping>,
    },
    #[serde(alias = "scriptNode")]
    Script {
        #[serde(default)]
        script: String,
    },
    #[serde(alias = "delayNode")]
    Delay {
        #[serde(default = "default_delay", alias = "delay", deserialize_with = "seconds")]
        seconds: u64,
    },
    #[serde(alias = "scheduleNode", rename_all = "camelCase")]
    Schedule { schedule_id: String },
    #[serde(alias = "templateNode", rename_all = "camelCase")]
    Template { template_id: String },
    #[serde(alias = "queueNode")]
    Queue {
        #[serde(alias = "queueName")]
        queue: String,
    },
    #[serde(alias = "endNode")]
    End {
        #[serde(default)]
        text: Option<String>,
    },
    #[serde(alias = "finalNode")]
    Final {
        #[serde(default)]
        text: Option<String>,
    },
}

fn default_delay() -> u64 {
    1
}

/// Accept `5`, `"5"` or an empty string (the default of one second).
fn seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) if s.trim().is_empty() => Ok(default_delay()),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl NodeKind {
    /// The kind tag as it appears in authored graphs.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Start { .. } => "start",
            NodeKind::Message { .. } => "message",
            NodeKind::Input { .. } => "input",
            NodeKind::SetValue { .. } => "setValue",
            NodeKind::Condition { .. } => "condition",
            NodeKind::Anchor { .. } => "anchor",
            NodeKind::Goto { .. } => "goto",
            NodeKind::HttpRequest { .. } => "httpRequest",
            NodeKind::Script { .. } => "script",
            NodeKind::Delay { .. } => "delay",
            NodeKind::Schedule { .. } => "schedule",
            NodeKind::Template { .. } => "template",
            NodeKind::Queue { .. } => "queue",
            NodeKind::End { .. } => "end",
            NodeKind::Final { .. } => "final",
        }
    }

    /// Nodes that wait for a customer reply.
    pub fn awaits_reply(&self) -> bool {
        matches!(self, NodeKind::Input { .. } | NodeKind::Template { .. })
    }
}

/// A node as authored: kind tag plus free-form configuration.
///
/// Accepts both `{kind, config}` and the editor's `{type, data}` shape;
/// anything else on the node (positions, editor callbacks) is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNode {
    pub id: String,
    #[serde(alias = "type")]
    pub kind: String,
    #[serde(default, alias = "data")]
    pub config: serde_json::Value,
}

/// A validated node of a published graph.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawNode")]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
}

impl TryFrom<RawNode> for Node {
    type Error = GraphError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let config = match raw.config {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other,
        };
        let tagged = serde_json::json!({ "kind": raw.kind, "config": config });
        let kind = serde_json::from_value(tagged).map_err(|e| GraphError::InvalidNode {
            node: raw.id.clone(),
            kind: raw.kind.clone(),
            message: e.to_string(),
        })?;
        Ok(Self { id: raw.id, kind })
    }
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn start(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Start { text: None })
    }

    pub fn message(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Message { text: text.into() })
    }

    pub fn input(id: impl Into<String>, text: impl Into<String>, variable: impl Into<String>) -> Self {
        Self::new(
            id,
            NodeKind::Input {
                text: text.into(),
                variable: variable.into(),
            },
        )
    }

    pub fn set_value(id: impl Into<String>, variable: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            id,
            NodeKind::SetValue {
                variable: variable.into(),
                value: value.into(),
            },
        )
    }

    pub fn condition(id: impl Into<String>, rules: Vec<ConditionRule>) -> Self {
        Self::new(id, NodeKind::Condition { rules })
    }

    pub fn anchor(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Anchor { name: None })
    }

    pub fn goto(id: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Goto { target: target.into() })
    }

    pub fn http(id: impl Into<String>, url: impl Into<String>, mappings: Vec<ResponseMapping>) -> Self {
        Self::new(
            id,
            NodeKind::HttpRequest {
                url: url.into(),
                mappings,
            },
        )
    }

    pub fn script(id: impl Into<String>, script: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Script { script: script.into() })
    }

    pub fn delay(id: impl Into<String>, seconds: u64) -> Self {
        Self::new(id, NodeKind::Delay { seconds })
    }

    pub fn schedule(id: impl Into<String>, schedule_id: impl Into<String>) -> Self {
        Self::new(
            id,
            NodeKind::Schedule {
                schedule_id: schedule_id.into(),
            },
        )
    }

    pub fn template(id: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self::new(
            id,
            NodeKind::Template {
                template_id: template_id.into(),
            },
        )
    }

    pub fn queue(id: impl Into<String>, queue: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Queue { queue: queue.into() })
    }

    pub fn end(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::End { text: None })
    }

    pub fn final_node(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Final { text: None })
    }
}
