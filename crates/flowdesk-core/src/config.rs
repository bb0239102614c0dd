use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FlowdeskError, Result};

/// Top-level flowdesk configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub script: ScriptConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Nodes executed per `advance` call before yielding.
    #[serde(default = "default_step_budget")]
    pub step_budget: usize,
    /// Consecutive exhausted budgets tolerated before the flow is abandoned.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
    /// Offset applied to UTC when evaluating schedules.
    #[serde(default)]
    pub utc_offset_hours: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_budget: default_step_budget(),
            max_rounds: default_max_rounds(),
            utc_offset_hours: 0,
        }
    }
}

fn default_step_budget() -> usize { 200 }
fn default_max_rounds() -> usize { 10 }

/// User-visible texts. `{queue}` and `{operator}` are substituted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "default_closing")]
    pub closing: String,
    #[serde(default = "default_http_failure")]
    pub http_failure: String,
    #[serde(default = "default_script_failure")]
    pub script_failure: String,
    #[serde(default = "default_queue_transfer")]
    pub queue_transfer: String,
    #[serde(default = "default_queue_unavailable")]
    pub queue_unavailable: String,
    #[serde(default = "default_pickup")]
    pub pickup: String,
    #[serde(default = "default_closed")]
    pub closed: String,
    #[serde(default = "default_transfer")]
    pub transfer: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            closing: default_closing(),
            http_failure: default_http_failure(),
            script_failure: default_script_failure(),
            queue_transfer: default_queue_transfer(),
            queue_unavailable: default_queue_unavailable(),
            pickup: default_pickup(),
            closed: default_closed(),
            transfer: default_transfer(),
        }
    }
}

fn default_closing() -> String { "Conversation finished.".to_string() }
fn default_http_failure() -> String { "⚠️ Could not reach the external service.".to_string() }
fn default_script_failure() -> String { "⚠️ Could not process your data.".to_string() }
fn default_queue_transfer() -> String { "Transferring to: {queue}...".to_string() }
fn default_queue_unavailable() -> String { "⚠️ Queue unavailable right now.".to_string() }
fn default_pickup() -> String { "You will be served by {operator}.".to_string() }
fn default_closed() -> String { "Conversation closed.".to_string() }
fn default_transfer() -> String { "Conversation transferred to {queue}.".to_string() }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_http_timeout() -> u64 { 10 }
fn default_user_agent() -> String { format!("flowdesk/{}", env!("CARGO_PKG_VERSION")) }

/// Bounds for the script sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    #[serde(default = "default_max_ops")]
    pub max_ops: usize,
    #[serde(default = "default_script_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_value_len")]
    pub max_value_len: usize,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            max_ops: default_max_ops(),
            timeout_ms: default_script_timeout(),
            max_value_len: default_max_value_len(),
        }
    }
}

fn default_max_ops() -> usize { 10_000 }
fn default_script_timeout() -> u64 { 500 }
fn default_max_value_len() -> usize { 4096 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Seconds after the last heartbeat before an operator counts as offline.
    #[serde(default = "default_staleness")]
    pub staleness_secs: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            staleness_secs: default_staleness(),
        }
    }
}

fn default_staleness() -> u64 { 15 }

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Only count online operators as eligible for a queue.
    #[serde(default)]
    pub require_online: bool,
}

/// Paths of the JSON inputs consumed by the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default)]
    pub flow: Option<PathBuf>,
    #[serde(default)]
    pub schedules: Option<PathBuf>,
    #[serde(default)]
    pub templates: Option<PathBuf>,
    #[serde(default)]
    pub operators: Option<PathBuf>,
}

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| FlowdeskError::ConfigNotFound(path.display().to_string()))?;

        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| FlowdeskError::Config(e.to_string()))
    }
}

/// Expand `${ENV_VAR}` patterns; unknown variables are left as written.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match std::env::var(name) {
                    Ok(val) => result.push_str(&val),
                    Err(_) => {
                        result.push_str("${");
                        result.push_str(name);
                        result.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    result.push_str(rest);
    result
}
