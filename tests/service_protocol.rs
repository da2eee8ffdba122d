//! NDJSON service sessions driven over in-memory readers and writers

use dyngraph::graph::ClassCatalog;
use dyngraph::service::Service;
use dyngraph::stock::register_stock;
use dyngraph::{Dispatcher, DispatcherConfig};
use serde_json::{Value, json};
use std::io::Cursor;

fn service() -> Service {
    let catalog = ClassCatalog::new();
    register_stock(&catalog);
    Service::new(Dispatcher::new(catalog.snapshot()))
}

fn handshake(id: u64) -> Value {
    json!({"id": id, "command": "handshake", "params": {
        "client": "test",
        "protocol_version": dyngraph::PROTOCOL_VERSION
    }})
}

/// Feed `requests` through one session and collect the response lines.
fn exchange(service: &Service, requests: &[Value]) -> Vec<Value> {
    let input = requests
        .iter()
        .map(|req| serde_json::to_string(req).unwrap())
        .collect::<Vec<_>>()
        .join("\n");

    let mut output = Vec::<u8>::new();
    service
        .handle(Cursor::new(format!("{}\n", input)), &mut output)
        .unwrap();

    output
        .split(|b| *b == b'\n')
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_slice::<Value>(line).unwrap())
        .collect()
}

fn error_code(response: &Value) -> &str {
    response["error"]["code"].as_str().unwrap()
}

#[test]
fn commands_require_a_handshake() {
    let service = service();
    let lines = exchange(
        &service,
        &[
            json!({"id": 1, "command": "list_classes", "params": {}}),
            handshake(2),
            json!({"id": 3, "command": "list_classes", "params": {}}),
        ],
    );

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["id"], 1);
    assert_eq!(error_code(&lines[0]), "protocol_error");
    assert_eq!(lines[1]["result"]["protocol_version"], dyngraph::PROTOCOL_VERSION);
    assert_eq!(
        lines[2]["result"]["classes"],
        json!(["Adder", "Constant", "Multiplier"])
    );
}

#[test]
fn handshake_rejects_other_protocol_versions() {
    let service = service();
    let lines = exchange(
        &service,
        &[json!({"id": 1, "command": "handshake", "params": {
            "client": "test",
            "protocol_version": "0.1.0"
        }})],
    );
    assert_eq!(error_code(&lines[0]), "protocol_error");
}

#[test]
fn create_and_execute_over_the_wire() {
    let service = service();
    let lines = exchange(
        &service,
        &[
            handshake(1),
            json!({"id": 2, "command": "create", "params": {"class": "Adder", "name": "a1"}}),
        ],
    );
    let entity = lines[1]["result"]["entity"].clone();
    assert!(entity.is_object());

    let lines = exchange(
        &service,
        &[
            handshake(1),
            json!({"id": 2, "command": "execute_command", "params": {
                "entity": entity, "command": "add", "args": [2, 3]
            }}),
            json!({"id": 3, "command": "execute_command", "params": {
                "entity": entity, "command": "add", "args": [2]
            }}),
            json!({"id": 4, "command": "execute_command", "params": {
                "entity": entity, "command": "add", "args": [2, 3.5]
            }}),
            json!({"id": 5, "command": "list_commands", "params": {"entity": entity}}),
            json!({"id": 6, "command": "get_command_docstring", "params": {
                "entity": entity, "command": "add"
            }}),
            json!({"id": 7, "command": "get_name", "params": {"entity": entity}}),
        ],
    );

    assert_eq!(lines[1]["result"]["result"], 5);
    assert_eq!(error_code(&lines[2]), "arity_mismatch");
    assert!(
        lines[2]["error"]["message"]
            .as_str()
            .unwrap()
            .contains("expected 2, got 1")
    );
    assert_eq!(error_code(&lines[3]), "argument_conversion");
    assert_eq!(lines[4]["result"]["commands"], json!(["add"]));
    assert_eq!(
        lines[5]["result"]["docstring"],
        "Return the sum of two integers"
    );
    assert_eq!(lines[6]["result"]["name"], "a1");
}

#[test]
fn signals_are_listed_and_named() {
    let service = service();
    let entity = service.dispatcher().create("Adder", "a1").unwrap();
    let entity = serde_json::to_value(entity).unwrap();

    let lines = exchange(
        &service,
        &[
            handshake(1),
            json!({"id": 2, "command": "get_signal", "params": {"entity": entity, "signal": "sout"}}),
            json!({"id": 3, "command": "get_signal", "params": {"entity": entity, "signal": "nope"}}),
            json!({"id": 4, "command": "list_signals", "params": {"entity": entity}}),
        ],
    );

    let signal = lines[1]["result"]["signal"].clone();
    assert_eq!(error_code(&lines[2]), "unknown_signal");
    assert_eq!(lines[3]["result"]["signals"].as_array().unwrap().len(), 3);

    let lines = exchange(
        &service,
        &[
            handshake(1),
            json!({"id": 2, "command": "signal_name", "params": {"signal": signal}}),
        ],
    );
    assert_eq!(lines[1]["result"]["name"], "Adder(a1)::output(int)::sout");
}

#[test]
fn create_conflicts_and_destroy() {
    let service = service();
    let entity = service.dispatcher().create("Adder", "a1").unwrap();
    let entity = serde_json::to_value(entity).unwrap();

    let lines = exchange(
        &service,
        &[
            handshake(1),
            json!({"id": 2, "command": "create", "params": {"class": "Multiplier", "name": "a1"}}),
            json!({"id": 3, "command": "create", "params": {"class": "Integrator", "name": "i1"}}),
            json!({"id": 4, "command": "destroy", "params": {"entity": entity}}),
            json!({"id": 5, "command": "display", "params": {"entity": entity}}),
            json!({"id": 6, "command": "list_entities", "params": {}}),
        ],
    );

    assert_eq!(error_code(&lines[1]), "class_inconsistent");
    assert_eq!(error_code(&lines[2]), "unknown_class");
    assert_eq!(lines[3]["result"]["destroyed"], true);
    assert_eq!(error_code(&lines[4]), "entity_fault");
    assert_eq!(lines[5]["result"]["entities"], json!([]));
}

#[test]
fn malformed_requests_get_error_responses() {
    let service = service();
    let mut output = Vec::<u8>::new();
    let input = format!(
        "{}\nnot json\n{}\n{}\n",
        serde_json::to_string(&handshake(1)).unwrap(),
        json!({"id": 2, "command": "create", "params": {"class": "Adder"}}),
        json!({"id": 3, "command": "teleport", "params": {}}),
    );
    service.handle(Cursor::new(input), &mut output).unwrap();

    let lines: Vec<Value> = output
        .split(|b| *b == b'\n')
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_slice(line).unwrap())
        .collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[1]["id"], Value::Null);
    assert_eq!(error_code(&lines[1]), "parse_error");
    assert_eq!(error_code(&lines[2]), "invalid_params");
    assert_eq!(error_code(&lines[3]), "unsupported_command");
}

#[test]
fn entity_limit_is_enforced() {
    let catalog = ClassCatalog::new();
    register_stock(&catalog);
    let config = DispatcherConfig {
        max_entities: Some(1),
        ..DispatcherConfig::default()
    };
    let service = Service::new(Dispatcher::with_config(catalog.snapshot(), config));

    let lines = exchange(
        &service,
        &[
            handshake(1),
            json!({"id": 2, "command": "create", "params": {"class": "Adder", "name": "a1"}}),
            json!({"id": 3, "command": "create", "params": {"class": "Adder", "name": "a1"}}),
            json!({"id": 4, "command": "create", "params": {"class": "Adder", "name": "a2"}}),
        ],
    );

    assert!(lines[1]["result"]["entity"].is_object());
    assert_eq!(lines[2]["result"]["entity"], lines[1]["result"]["entity"]);
    assert_eq!(error_code(&lines[3]), "construction_failed");
}
