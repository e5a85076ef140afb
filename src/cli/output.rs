//! stdout rendering for replay and check
//!
//! JSON mode writes one JSON-RPC 2.0 envelope per line, either
//! `{"jsonrpc":"2.0","result":...,"id":null}` or
//! `{"jsonrpc":"2.0","error":{"code":N,"message":"..."},"id":null}`.
//! text mode writes one human-readable line per record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::IsTerminal;

use crate::conditions::{ConditionsEvaluationResult, ConditionsTriggerData};

/// application errors live in the JSON-RPC server range, offset by exit code
const RPC_ERROR_BASE: i32 = -32000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    /// JSON-RPC envelopes, one per line
    Json,
    /// nothing on success, errors go to stderr
    Quiet,
}

impl OutputMode {
    /// pick a mode from the global flags, falling back to JSON when stdout is piped
    pub fn from_flags(json: bool, no_json: bool, quiet: bool) -> Self {
        match (quiet, json, no_json) {
            (true, _, _) => Self::Quiet,
            (_, true, _) => Self::Json,
            (_, _, true) => Self::Text,
            _ if std::io::stdout().is_terminal() => Self::Text,
            _ => Self::Json,
        }
    }

    pub fn is_json(&self) -> bool {
        *self == Self::Json
    }

    pub fn is_quiet(&self) -> bool {
        *self == Self::Quiet
    }
}

/// a single JSON-RPC 2.0 line; exactly one of `result` and `error` is set
#[derive(Serialize)]
pub struct Envelope<T: Serialize> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Failure>,
    /// always null, there is no request to answer
    id: Option<()>,
}

#[derive(Debug, Serialize)]
pub struct Failure {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(result: T) -> Self {
        Self {
            jsonrpc: "2.0",
            result: Some(result),
            error: None,
            id: None,
        }
    }
}

impl Envelope<()> {
    pub fn failure(exit_code: i32, message: impl Into<String>, details: Vec<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            result: None,
            error: Some(Failure {
                code: rpc_code(exit_code),
                message: message.into(),
                details,
            }),
            id: None,
        }
    }
}

fn rpc_code(exit_code: i32) -> i32 {
    RPC_ERROR_BASE - exit_code
}

/// exit code carried by an error envelope's `code`
pub fn exit_code(rpc_code: i32) -> i32 {
    RPC_ERROR_BASE - rpc_code
}

// ============================================================================
// Result data structures
// ============================================================================

/// result data for the check command
#[derive(Serialize)]
pub struct CheckData {
    pub path: String,
    pub valid: bool,
    pub conditions: usize,
    pub errors: Vec<String>,
}

/// what produced an evaluation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationEvent {
    /// evaluation seeded at construction
    Initial,
    /// listener notification while replaying
    Change,
    /// cached evaluation after all input was replayed
    Final,
}

/// one evaluation as printed by replay
#[derive(Serialize)]
pub struct EvaluationRecord<'a> {
    pub event: EvaluationEvent,
    /// input line that caused the notification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub evaluation: &'a ConditionsEvaluationResult,
}

impl<'a> EvaluationRecord<'a> {
    pub fn new(
        event: EvaluationEvent,
        line: Option<usize>,
        evaluation: &'a ConditionsEvaluationResult,
    ) -> Self {
        Self {
            event,
            line,
            ts: Utc::now(),
            evaluation,
        }
    }
}

// ============================================================================
// Output functions
// ============================================================================

/// describe each filled trigger data slot
pub fn describe_trigger_data(trigger_data: &ConditionsTriggerData) -> Vec<String> {
    fn side(value: Option<&str>) -> &str {
        value.unwrap_or("-")
    }

    let mut parts = Vec::new();

    if let Some(state) = &trigger_data.state {
        parts.push(format!(
            "{}: {} -> {}",
            state.entity,
            side(state.from.as_deref()),
            side(state.to.as_deref())
        ));
    }
    if let Some(view) = &trigger_data.view {
        parts.push(format!(
            "view: {} -> {}",
            side(view.from.as_deref()),
            side(view.to.as_deref())
        ));
    }
    if let Some(camera) = &trigger_data.camera {
        parts.push(format!(
            "camera: {} -> {}",
            side(camera.from.as_deref()),
            side(camera.to.as_deref())
        ));
    }
    if trigger_data.config.is_some() {
        parts.push("config changed".to_string());
    }

    parts
}

/// format an evaluation record as a single text line
pub fn format_record(record: &EvaluationRecord) -> String {
    let mut line = format!("[{}]", record.ts.format("%H:%M:%S%.3f"));

    match (record.event, record.line) {
        (EvaluationEvent::Change, Some(n)) => line.push_str(&format!(" line {}:", n)),
        (EvaluationEvent::Initial, _) => line.push_str(" initial:"),
        (EvaluationEvent::Final, _) => line.push_str(" final:"),
        (EvaluationEvent::Change, None) => line.push_str(" change:"),
    }

    line.push_str(if record.evaluation.result {
        " true"
    } else {
        " false"
    });

    if let Some(trigger_data) = &record.evaluation.trigger_data {
        let parts = describe_trigger_data(trigger_data);
        if !parts.is_empty() {
            line.push_str(&format!(" ({})", parts.join(", ")));
        }
    }

    line
}

/// print an evaluation record according to the output mode
pub fn print_record(mode: OutputMode, record: &EvaluationRecord) {
    match mode {
        OutputMode::Json => print_json(record),
        OutputMode::Text => println!("{}", format_record(record)),
        OutputMode::Quiet => {}
    }
}

fn emit<T: Serialize>(envelope: &Envelope<T>) {
    match serde_json::to_string(envelope) {
        Ok(line) => println!("{}", line),
        Err(e) => tracing::warn!(error = %e, "failed to serialize output"),
    }
}

pub fn print_json<T: Serialize>(data: &T) {
    emit(&Envelope::success(data));
}

pub fn print_json_error(code: i32, message: &str) {
    emit(&Envelope::failure(code, message, Vec::new()));
}

/// error envelope listing every problem under `details`
pub fn print_json_error_with_details(code: i32, message: &str, details: Vec<String>) {
    emit(&Envelope::failure(code, message, details));
}
