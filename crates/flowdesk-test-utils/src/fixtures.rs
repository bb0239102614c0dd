use std::io::Write;

use tempfile::NamedTempFile;

/// Greeting, name capture, VIP routing:
/// start -> message("Olá") -> input(nome) -> condition(nome == "VIP")
/// -> queue("SAC"), else -> end.
pub fn vip_flow_json() -> serde_json::Value {
    serde_json::json!({
        "id": "vip",
        "name": "VIP routing",
        "nodes": [
            { "id": "start", "kind": "start" },
            { "id": "hello", "kind": "message", "config": { "text": "Olá" } },
            { "id": "ask", "kind": "input", "config": { "text": "Qual seu nome?", "variable": "nome" } },
            { "id": "check", "kind": "condition", "config": { "rules": [
                { "id": "is_vip", "variable": "nome", "operator": "==", "value": "VIP" }
            ] } },
            { "id": "sac", "kind": "queue", "config": { "queue": "SAC" } },
            { "id": "bye", "kind": "end" }
        ],
        "edges": [
            { "source": "start", "target": "hello" },
            { "source": "hello", "target": "ask" },
            { "source": "ask", "target": "check" },
            { "source": "check", "target": "sac", "handle": "is_vip" },
            { "source": "check", "target": "bye", "handle": "else" }
        ]
    })
}

/// Write `contents` to a temporary file that lives as long as the handle.
pub fn temp_file(contents: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}
