//! Controller-operation record parser.
//!
//! Each input line is one JSON object as emitted by the instrumented
//! client:
//!
//! ```text
//! {"timestamp": "...", "reconcile_id": "...", "controller_id": "...",
//!  "root_event_id": "...", "op_type": "GET", "kind": "...",
//!  "object_id": "...", "version": "...",
//!  "label:discrete.events/change-id": "..."}
//! ```
//!
//! - `timestamp`, `reconcile_id`, `controller_id` and `op_type` are
//!   required; absent, null or empty values make the record malformed.
//! - `root_event_id`, `kind`, `object_id` and `version` default to empty
//!   (writes are logged before their identity is known).
//! - Every `label:<namespace>/<name>` key with a string value becomes label
//!   `<name>`.
//!
//! [`parse_events`] handles a whole batch: malformed lines are skipped with
//! a diagnostic so one bad line never discards the run.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::causal::{bare_label_name, resolve_causal_id};
use crate::config::LabelConfig;
use crate::diagnostics::{Diagnostics, Stage};
use crate::error::ErrorCode;
use crate::event::types::{OpType, UnknownOpType};
use crate::event::{Completion, Event};

/// Key prefix marking a label field.
pub const LABEL_PREFIX: &str = "label:";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur while parsing one record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The line is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// The JSON value is not an object.
    #[error("record is not a JSON object")]
    NotAnObject,

    /// A required field is absent, null or empty.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// A field has the wrong JSON type.
    #[error("field '{field}' must be a {expected}")]
    InvalidFieldType {
        field: &'static str,
        expected: &'static str,
    },

    /// The `op_type` is outside the closed operation set.
    #[error(transparent)]
    UnknownOpType(#[from] UnknownOpType),
}

impl ParseError {
    /// Every parse failure is a malformed record.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::MalformedRecord
    }
}

// ---------------------------------------------------------------------------
// Single record
// ---------------------------------------------------------------------------

/// Parse one JSON line into an [`Event`].
///
/// # Errors
///
/// Returns [`ParseError`] if the line is not a JSON object or fails
/// [`parse_record`].
pub fn parse_line(line: &str, config: &LabelConfig) -> Result<Event, ParseError> {
    let value: Value =
        serde_json::from_str(line.trim()).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    parse_record(&value, config)
}

/// Parse one decoded record into an [`Event`].
///
/// # Errors
///
/// Returns [`ParseError`] if required fields are missing, a field has the
/// wrong type, or `op_type` is unknown.
pub fn parse_record(value: &Value, config: &LabelConfig) -> Result<Event, ParseError> {
    let obj = value.as_object().ok_or(ParseError::NotAnObject)?;

    let timestamp = required_timestamp(obj)?;
    let reconcile_id = required_str(obj, "reconcile_id")?;
    let controller_id = required_str(obj, "controller_id")?;
    let op_type: OpType = required_str(obj, "op_type")?.parse()?;

    let root_event_id = optional_str(obj, "root_event_id")?;
    let kind = optional_str(obj, "kind")?;
    let object_id = optional_str(obj, "object_id")?;
    let version = optional_str(obj, "version")?;

    let labels = extract_labels(obj);
    let causal = resolve_causal_id(&labels, config);
    let missing = kind.is_empty() || object_id.is_empty() || version.is_empty();

    Ok(Event {
        timestamp,
        reconcile_id,
        controller_id,
        root_event_id,
        op_type,
        kind,
        object_id,
        version,
        causal,
        labels,
        completion: Completion::initial(op_type, missing),
    })
}

/// Collect `label:` keys into a map keyed by bare label name.
///
/// Non-string values are ignored.
#[must_use]
pub fn extract_labels(obj: &Map<String, Value>) -> BTreeMap<String, String> {
    obj.iter()
        .filter_map(|(key, value)| {
            let qualified = key.strip_prefix(LABEL_PREFIX)?;
            let name = bare_label_name(qualified);
            if name.is_empty() {
                return None;
            }
            value.as_str().map(|v| (name.to_string(), v.to_string()))
        })
        .collect()
}

fn required_str(obj: &Map<String, Value>, field: &'static str) -> Result<String, ParseError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ParseError::MissingField(field)),
        Some(Value::String(s)) if s.is_empty() => Err(ParseError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ParseError::InvalidFieldType {
            field,
            expected: "string",
        }),
    }
}

fn required_timestamp(obj: &Map<String, Value>) -> Result<String, ParseError> {
    match obj.get("timestamp") {
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(_) | Value::Array(_) | Value::Object(_)) => {
            Err(ParseError::InvalidFieldType {
                field: "timestamp",
                expected: "string or number",
            })
        }
        _ => required_str(obj, "timestamp"),
    }
}

fn optional_str(obj: &Map<String, Value>, field: &'static str) -> Result<String, ParseError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ParseError::InvalidFieldType {
            field,
            expected: "string",
        }),
    }
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Result of parsing a batch of lines.
#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    /// Successfully parsed events, in input order.
    pub events: Vec<Event>,
    /// Number of non-blank lines that were skipped.
    pub skipped: usize,
    pub diagnostics: Diagnostics,
}

/// Parse every non-blank line.
///
/// Malformed lines are skipped with a `MalformedRecord` diagnostic naming
/// the 1-based line number. Events without a causal id are kept and get a
/// `MissingCausalIdentity` diagnostic.
#[instrument(skip_all)]
pub fn parse_events<'a, I>(lines: I, config: &LabelConfig) -> ParsedBatch
where
    I: IntoIterator<Item = &'a str>,
{
    let mut batch = ParsedBatch::default();

    for (idx, line) in lines.into_iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_num = idx + 1;

        match parse_line(line, config) {
            Ok(event) => {
                if let crate::causal::CausalResolution::Unresolved(reason) = &event.causal {
                    batch.diagnostics.record(
                        ErrorCode::MissingCausalIdentity,
                        Stage::Parse,
                        format!("line {line_num}"),
                        format!(
                            "{} in reconcile {}: {reason}; excluded from correlation",
                            event.op_type, event.reconcile_id
                        ),
                    );
                }
                batch.events.push(event);
            }
            Err(err) => {
                batch.skipped += 1;
                batch.diagnostics.record(
                    err.code(),
                    Stage::Parse,
                    format!("line {line_num}"),
                    err.to_string(),
                );
            }
        }
    }

    debug!(
        parsed = batch.events.len(),
        skipped = batch.skipped,
        "parsed controller operations"
    );
    batch
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
