//! Publish-time graph validation errors.

use flowdesk_core::FlowdeskError;

/// A structural invariant of the graph does not hold.
///
/// Returned by `FlowGraph::new` / `FlowGraph::publish`; a graph that produced
/// one of these never reaches the interpreter.
// `Display`/`Error` are implemented by hand: thiserror treats any field named
// `source` as the error's cause, which `String` cannot be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    MissingStart,
    MultipleStart(usize),
    DuplicateNodeId(String),
    DanglingEdge {
        source: String,
        target: String,
        missing: String,
    },
    DuplicateHandle { source: String, handle: String },
    InvalidNode {
        node: String,
        kind: String,
        message: String,
    },
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::MissingStart => write!(f, "graph has no start node"),
            GraphError::MultipleStart(n) => {
                write!(f, "graph must have exactly one start node, found {n}")
            }
            GraphError::DuplicateNodeId(id) => write!(f, "duplicate node id: {id}"),
            GraphError::DanglingEdge {
                source,
                target,
                missing,
            } => write!(f, "edge {source} -> {target} references unknown node {missing}"),
            GraphError::DuplicateHandle { source, handle } => {
                write!(f, "node {source} has more than one edge with handle {handle}")
            }
            GraphError::InvalidNode {
                node,
                kind,
                message,
            } => write!(f, "node '{node}' of kind '{kind}' is invalid: {message}"),
        }
    }
}

impl std::error::Error for GraphError {}

impl From<GraphError> for FlowdeskError {
    fn from(e: GraphError) -> Self {
        FlowdeskError::InvalidGraph(e.to_string())
    }
}
