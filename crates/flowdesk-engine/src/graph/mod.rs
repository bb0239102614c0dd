//! Flow graph model and interpreter.
//!
//! A flow is a directed graph of typed `Node`s connected by `Edge`s. Drafts
//! are validated once by `FlowGraph::publish`; the resulting snapshot is
//! immutable and shared read-only by every session running it.
//!
//! The `FlowExecutor` walks a published graph one node at a time, suspending
//! at input/template nodes (reply), delay nodes (timer) and queue hand-off.

pub mod edge;
pub mod error;
pub mod executor;
pub mod flow;
pub mod node;

pub use edge::{Edge, HANDLE_ELSE, HANDLE_INSIDE, HANDLE_OUTSIDE};
pub use error::GraphError;
pub use executor::{Effects, FlowExecutor, Outcome, Reply};
pub use flow::{FlowDraft, FlowGraph};
pub use node::{ConditionRule, Node, NodeKind, RawNode, ResponseMapping};
