pub mod condition;
pub mod desk;
pub mod graph;
pub mod lane;
pub mod schedule;
pub mod variables;

pub use desk::{Desk, Inbox, OperatorPresence, Overview};
pub use graph::{
    Edge, Effects, FlowDraft, FlowExecutor, FlowGraph, GraphError, Node, NodeKind, Outcome, Reply,
};
pub use lane::{LaneGuard, LaneMap};
pub use variables::{interpolate, Variables};
