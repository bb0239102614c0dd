use std::io::Write;

use flowdesk_core::config::AppConfig;
use flowdesk_core::FlowdeskError;

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[engine]
step_budget = 50
max_rounds = 3
utc_offset_hours = -3

[messages]
closing = "Atendimento finalizado."
queue_transfer = "Transferindo para: {queue}..."
pickup = "Você será atendido por {operator}."

[http]
timeout_secs = 5
user_agent = "desk-test"

[script]
max_ops = 500
timeout_ms = 100
max_value_len = 64

[presence]
staleness_secs = 30

[directory]
require_online = true

[data]
flow = "flows/main.json"
schedules = "data/schedules.json"
templates = "data/templates.json"
operators = "data/users.json"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.engine.step_budget, 50);
    assert_eq!(config.engine.max_rounds, 3);
    assert_eq!(config.engine.utc_offset_hours, -3);
    assert_eq!(config.messages.closing, "Atendimento finalizado.");
    assert_eq!(config.messages.queue_transfer, "Transferindo para: {queue}...");
    assert_eq!(config.messages.closed, "Conversation closed.");
    assert_eq!(config.http.timeout_secs, 5);
    assert_eq!(config.http.user_agent, "desk-test");
    assert_eq!(config.script.max_ops, 500);
    assert_eq!(config.script.max_value_len, 64);
    assert_eq!(config.presence.staleness_secs, 30);
    assert!(config.directory.require_online);
    assert_eq!(
        config.data.operators.as_deref(),
        Some(std::path::Path::new("data/users.json"))
    );
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("FLOWDESK_TEST_AGENT", "desk-from-env");

    let toml_content = r#"
[http]
user_agent = "${FLOWDESK_TEST_AGENT}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.http.user_agent, "desk-from-env");

    std::env::remove_var("FLOWDESK_TEST_AGENT");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"").expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.engine.step_budget, 200);
    assert_eq!(config.engine.utc_offset_hours, 0);
    assert_eq!(config.http.timeout_secs, 10);
    assert_eq!(config.script.timeout_ms, 500);
    assert_eq!(config.presence.staleness_secs, 15);
    assert!(!config.directory.require_online);
    assert!(config.data.flow.is_none());
    assert_eq!(config.messages.pickup, "You will be served by {operator}.");
}

#[test]
fn test_missing_and_malformed_config() {
    let err = AppConfig::load(std::path::Path::new("/nonexistent/flowdesk.toml")).unwrap_err();
    assert!(matches!(err, FlowdeskError::ConfigNotFound(_)));

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[engine]\nstep_budget = \"many\"\n").expect("write toml");
    let err = AppConfig::load(tmp.path()).unwrap_err();
    assert!(matches!(err, FlowdeskError::Config(_)));
}
