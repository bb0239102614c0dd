use thiserror::Error;

use crate::session::NotAllowed;

#[derive(Debug, Error)]
pub enum FlowdeskError {
    // Graph errors
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    // Session errors
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Not allowed: {0}")]
    NotAllowed(#[from] NotAllowed),

    // External effect errors
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Script failed: {0}")]
    Script(String),

    #[error("Script timeout after {timeout_ms}ms")]
    ScriptTimeout { timeout_ms: u64 },

    #[error("Catalogue error: {0}")]
    Catalogue(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlowdeskError {
    /// True for state-machine guard rejections.
    pub fn is_not_allowed(&self) -> bool {
        matches!(self, FlowdeskError::NotAllowed(_))
    }
}

pub type Result<T> = std::result::Result<T, FlowdeskError>;
