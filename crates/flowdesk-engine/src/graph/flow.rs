use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use flowdesk_core::error::{FlowdeskError, Result};

use super::edge::Edge;
use super::node::{Node, NodeKind, RawNode};
use super::GraphError;

/// A graph as authored, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowDraft {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// Stored flow record: the editor keeps a draft next to the published copy.
#[derive(Deserialize)]
struct StoredFlow {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    draft: Option<FlowDraft>,
    #[serde(default)]
    published: Option<FlowDraft>,
}

impl FlowDraft {
    /// Parse a draft, or a stored flow record (its published copy wins).
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let is_record = value.get("published").is_some() || value.get("draft").is_some();
        if !is_record {
            return Ok(serde_json::from_value(value)?);
        }

        let record: StoredFlow = serde_json::from_value(value)?;
        let mut draft = record
            .published
            .or(record.draft)
            .ok_or_else(|| FlowdeskError::InvalidGraph(format!("flow '{}' is empty", record.id)))?;
        if draft.id.is_empty() {
            draft.id = record.id;
        }
        if draft.name.is_empty() {
            draft.name = record.name;
        }
        Ok(draft)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// An immutable, validated graph snapshot. The interpreter only runs these.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    id: String,
    name: String,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    index: HashMap<String, usize>,
    start: String,
}

impl FlowGraph {
    /// Validate typed nodes and edges into a graph.
    pub fn new(id: impl Into<String>, nodes: Vec<Node>, edges: Vec<Edge>) -> std::result::Result<Self, GraphError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(GraphError::DuplicateNodeId(node.id.clone()));
            }
        }

        let starts: Vec<&Node> = nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Start { .. }))
            .collect();
        let start = match starts.as_slice() {
            [] => return Err(GraphError::MissingStart),
            [only] => only.id.clone(),
            many => return Err(GraphError::MultipleStart(many.len())),
        };

        let mut handles: HashSet<(&str, Option<&str>)> = HashSet::new();
        for edge in &edges {
            for end in [&edge.source, &edge.target] {
                if !index.contains_key(end) {
                    return Err(GraphError::DanglingEdge {
                        source: edge.source.clone(),
                        target: edge.target.clone(),
                        missing: end.clone(),
                    });
                }
            }
            if !handles.insert((edge.source.as_str(), edge.handle.as_deref())) {
                return Err(GraphError::DuplicateHandle {
                    source: edge.source.clone(),
                    handle: edge.handle.clone().unwrap_or_else(|| "<none>".to_string()),
                });
            }
        }

        Ok(Self {
            id: id.into(),
            name: String::new(),
            nodes,
            edges,
            index,
            start,
        })
    }

    /// Validate an authored draft and freeze it.
    pub fn publish(draft: FlowDraft) -> std::result::Result<Arc<Self>, GraphError> {
        let nodes = draft
            .nodes
            .into_iter()
            .map(Node::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut graph = Self::new(draft.id, nodes, draft.edges)?;
        graph.name = draft.name;
        Ok(Arc::new(graph))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_id(&self) -> &str {
        &self.start
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn outgoing<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == source)
    }

    /// The single logical exit of a non-branching node.
    ///
    /// Prefers the edge without a handle; editors sometimes attach a handle to
    /// a lone output, so any edge from `source` is the fallback.
    pub fn next(&self, source: &str) -> Option<&str> {
        let outgoing = || self.edges.iter().filter(move |e| e.source == source);
        outgoing()
            .find(|e| e.is_unconditional())
            .or_else(|| outgoing().next())
            .map(|e| e.target.as_str())
    }

    /// The exit of a branching node for `handle`.
    pub fn branch(&self, source: &str, handle: &str) -> Option<&str> {
        self.edges
            .iter()
            .filter(|e| e.source == source)
            .find(|e| e.handle.as_deref() == Some(handle))
            .map(|e| e.target.as_str())
    }
}
