use serde::{Deserialize, Serialize};

/// Handle taken by a schedule node when inside business hours.
pub const HANDLE_INSIDE: &str = "inside";
/// Handle taken by a schedule node when outside business hours.
pub const HANDLE_OUTSIDE: &str = "outside";
/// Fallback handle of a condition node.
pub const HANDLE_ELSE: &str = "else";

/// A directed connection between two nodes.
///
/// `handle` selects which output of a branching node the edge belongs to
/// (a condition rule id, a button id, `inside`/`outside`, `else`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(default, alias = "sourceHandle", skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

impl Edge {
    /// Create an unconditional edge.
    pub fn always(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            handle: None,
        }
    }

    /// Create an edge for one output of a branching node.
    pub fn branch(
        source: impl Into<String>,
        handle: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            handle: Some(handle.into()),
        }
    }

    pub fn is_unconditional(&self) -> bool {
        self.handle.is_none()
    }
}
