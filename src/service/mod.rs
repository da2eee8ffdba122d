//! NDJSON session for driving a dispatcher from an external process.
//!
//! Each input line is a JSON request `{"id", "command", "params"}`; each
//! response line echoes the id with either a `result` or an `error` object.
//! Requests are processed strictly in order. Entity and signal handles are
//! returned as opaque JSON objects and must be passed back verbatim.

use crate::PROTOCOL_VERSION;
use crate::graph::Dispatcher;
use crate::graph::dynamic::Dynamic;
use crate::graph::error::DispatchError;
use crate::graph::pool::EntityHandle;
use crate::graph::signal::SignalHandle;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::io::{self, BufRead, Write};

/// Service entry point: wraps a [`Dispatcher`] and answers requests.
pub struct Service {
    dispatcher: Dispatcher,
}

impl Service {
    /// Create a new service around the provided dispatcher.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Access the wrapped dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Process a single connection by consuming requests from the reader and writing responses.
    pub fn handle<R: BufRead, W: Write>(&self, reader: R, writer: W) -> io::Result<()> {
        let mut session = Session::new(&self.dispatcher, writer);
        session.run(reader)
    }
}

struct Session<'a, W: Write> {
    dispatcher: &'a Dispatcher,
    writer: W,
    handshake_completed: bool,
}

impl<'a, W: Write> Session<'a, W> {
    fn new(dispatcher: &'a Dispatcher, writer: W) -> Self {
        Self {
            dispatcher,
            writer,
            handshake_completed: false,
        }
    }

    fn run<R: BufRead>(&mut self, reader: R) -> io::Result<()> {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let envelope: Result<RequestEnvelope, _> = serde_json::from_str(&line);
            let response = match envelope {
                Ok(request) => self.handle_request(request),
                Err(err) => {
                    ResponseEnvelope::from_error(Value::Null, ServiceError::Parse(err.to_string()))
                }
            };
            self.write_response(response)?;
        }

        Ok(())
    }

    fn write_response(&mut self, envelope: ResponseEnvelope) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, &envelope)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    fn handle_request(&mut self, request: RequestEnvelope) -> ResponseEnvelope {
        match self.dispatch(&request.command, &request.params) {
            Ok(value) => ResponseEnvelope::success(request.id, value),
            Err(err) => ResponseEnvelope::from_error(request.id, err),
        }
    }

    fn dispatch(&mut self, command: &str, params: &Value) -> Result<Value, ServiceError> {
        if command == "handshake" {
            return self.cmd_handshake(params);
        }
        self.ensure_handshake()?;

        let dispatcher = self.dispatcher;
        match command {
            "create" => {
                let class = str_param(params, "class")?;
                let name = str_param(params, "name")?;
                let entity = dispatcher.create(class, name)?;
                Ok(json!({ "entity": entity }))
            }
            "get_name" => {
                let name = dispatcher.get_name(entity_param(params)?)?;
                Ok(json!({ "name": name }))
            }
            "get_class_name" => {
                let class_name = dispatcher.get_class_name(entity_param(params)?)?;
                Ok(json!({ "class_name": class_name }))
            }
            "get_docstring" => {
                let docstring = dispatcher.get_docstring(entity_param(params)?)?;
                Ok(json!({ "docstring": docstring }))
            }
            "display" => {
                let text = dispatcher.display(entity_param(params)?)?;
                Ok(json!({ "text": text }))
            }
            "get_signal" => {
                let signal = dispatcher.get_signal(entity_param(params)?, str_param(params, "signal")?)?;
                Ok(json!({ "signal": signal }))
            }
            "list_signals" => {
                let signals = dispatcher.list_signals(entity_param(params)?)?;
                Ok(json!({ "signals": signals }))
            }
            "signal_name" => {
                let signal: SignalHandle = typed_param(params, "signal")?;
                let name = dispatcher.signal_name(&signal)?;
                Ok(json!({ "name": name }))
            }
            "execute_command" => {
                let entity = entity_param(params)?;
                let command = str_param(params, "command")?;
                let args: Vec<Dynamic> = match params.get("args") {
                    Some(_) => typed_param(params, "args")?,
                    None => Vec::new(),
                };
                let result = dispatcher.execute_command(entity, command, &args)?;
                Ok(json!({ "result": result }))
            }
            "list_commands" => {
                let commands = dispatcher.list_commands(entity_param(params)?)?;
                Ok(json!({ "commands": commands }))
            }
            "get_command_docstring" => {
                let docstring = dispatcher
                    .get_command_docstring(entity_param(params)?, str_param(params, "command")?)?;
                Ok(json!({ "docstring": docstring }))
            }
            "list_entities" => Ok(json!({ "entities": dispatcher.list_entities() })),
            "list_classes" => Ok(json!({ "classes": dispatcher.list_classes() })),
            "destroy" => {
                dispatcher.destroy(entity_param(params)?)?;
                Ok(json!({ "destroyed": true }))
            }
            other => Err(ServiceError::Unsupported(other.to_string())),
        }
    }

    fn cmd_handshake(&mut self, params: &Value) -> Result<Value, ServiceError> {
        let client = str_param(params, "client")?;
        let requested = str_param(params, "protocol_version")?;

        if requested != PROTOCOL_VERSION {
            return Err(ServiceError::Protocol(format!(
                "unsupported protocol version: expected {}, got {}",
                PROTOCOL_VERSION, requested
            )));
        }

        self.handshake_completed = true;
        tracing::debug!(client, "service handshake completed");

        Ok(json!({
            "protocol_version": PROTOCOL_VERSION,
            "runtime": {
                "version": crate::VERSION,
                "client": client,
                "classes": self.dispatcher.list_classes(),
            }
        }))
    }

    fn ensure_handshake(&self) -> Result<(), ServiceError> {
        if self.handshake_completed {
            Ok(())
        } else {
            Err(ServiceError::Protocol(
                "handshake required before issuing commands".into(),
            ))
        }
    }
}

fn str_param<'v>(params: &'v Value, name: &str) -> Result<&'v str, ServiceError> {
    params
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ServiceError::invalid_param(name))
}

fn typed_param<T: DeserializeOwned>(params: &Value, name: &str) -> Result<T, ServiceError> {
    let raw = params
        .get(name)
        .ok_or_else(|| ServiceError::invalid_param(name))?;
    T::deserialize(raw)
        .map_err(|err| ServiceError::InvalidParams(format!("invalid parameter {}: {}", name, err)))
}

fn entity_param(params: &Value) -> Result<EntityHandle, ServiceError> {
    typed_param(params, "entity")
}

enum ServiceError {
    Parse(String),
    InvalidParams(String),
    Unsupported(String),
    Protocol(String),
    Dispatch(DispatchError),
}

impl ServiceError {
    fn invalid_param(name: &str) -> Self {
        ServiceError::InvalidParams(format!("missing or invalid parameter: {}", name))
    }
}

impl From<DispatchError> for ServiceError {
    fn from(err: DispatchError) -> Self {
        ServiceError::Dispatch(err)
    }
}

#[derive(Deserialize)]
struct RequestEnvelope {
    id: Value,
    command: String,
    #[serde(default)]
    params: Value,
}

#[derive(Serialize)]
struct ResponseEnvelope {
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorEnvelope>,
}

impl ResponseEnvelope {
    fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    fn from_error(id: Value, error: ServiceError) -> Self {
        Self {
            id,
            result: None,
            error: Some(ErrorEnvelope::from(error)),
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    code: String,
    message: String,
}

impl From<ServiceError> for ErrorEnvelope {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Parse(message) => ErrorEnvelope {
                code: "parse_error".into(),
                message,
            },
            ServiceError::InvalidParams(message) => ErrorEnvelope {
                code: "invalid_params".into(),
                message,
            },
            ServiceError::Unsupported(command) => ErrorEnvelope {
                code: "unsupported_command".into(),
                message: format!("Command '{command}' is not supported"),
            },
            ServiceError::Protocol(message) => ErrorEnvelope {
                code: "protocol_error".into(),
                message,
            },
            ServiceError::Dispatch(err) => ErrorEnvelope {
                code: err.code().into(),
                message: err.to_string(),
            },
        }
    }
}
