//! Controller operation events.
//!
//! One [`Event`] corresponds to one controller-operation log record: a
//! single client call (GET, LIST, CREATE, PATCH, UPDATE, DELETE) made
//! inside one reconcile invocation.
//!
//! # Completion
//!
//! The instrumented client logs writes before the API server has assigned
//! the object its final identity, so write events may arrive with empty
//! `kind`, `object_id` and `version`. The backfill stage completes them
//! from the read that shares their causal id. [`Completion`] records where
//! an event stands in that process; only [`Completion::Incomplete`] and
//! [`Completion::Orphaned`] events are eligible, so completion happens at
//! most once.

pub mod parser;
pub mod types;

pub use parser::{ParseError, ParsedBatch, parse_events, parse_line, parse_record};
pub use types::{OpClass, OpType, UnknownOpType};

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::causal::{CausalId, CausalKey, CausalResolution};

/// Where an event stands with respect to backfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// Every identity field was present in the record (all reads land here).
    Observed,
    /// A write missing at least one of kind/object_id/version.
    Incomplete,
    /// Completed from the matching read.
    Backfilled,
    /// No read shares this write's causal id.
    Orphaned,
}

impl Completion {
    /// Initial state for a freshly parsed event.
    #[must_use]
    pub const fn initial(op_type: OpType, missing_fields: bool) -> Self {
        if missing_fields && op_type.is_write() {
            Self::Incomplete
        } else {
            Self::Observed
        }
    }
}

/// A single controller operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Timestamp as logged. Never compared across controllers.
    pub timestamp: String,
    pub reconcile_id: String,
    pub controller_id: String,
    pub root_event_id: String,
    pub op_type: OpType,
    pub kind: String,
    pub object_id: String,
    pub version: String,
    pub causal: CausalResolution,
    /// Label values keyed by bare label name (namespace stripped).
    pub labels: BTreeMap<String, String>,
    pub completion: Completion,
}

impl Event {
    #[must_use]
    pub const fn causal_id(&self) -> Option<&CausalId> {
        self.causal.id()
    }

    /// Graph identity, when the causal id is resolved.
    #[must_use]
    pub fn causal_key(&self) -> Option<CausalKey> {
        self.causal_id()
            .map(|id| CausalKey::new(self.kind.clone(), id.clone()))
    }

    #[must_use]
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.op_type.is_read()
    }

    #[must_use]
    pub const fn is_write(&self) -> bool {
        self.op_type.is_write()
    }

    /// True when any of kind/object_id/version is empty.
    #[must_use]
    pub fn has_missing_fields(&self) -> bool {
        self.kind.is_empty() || self.object_id.is_empty() || self.version.is_empty()
    }

    /// True when backfill may still complete this event.
    #[must_use]
    pub const fn is_backfill_eligible(&self) -> bool {
        self.is_write() && matches!(self.completion, Completion::Incomplete | Completion::Orphaned)
    }

    #[must_use]
    pub const fn is_orphaned(&self) -> bool {
        matches!(self.completion, Completion::Orphaned)
    }

    /// New event with this write's empty identity fields taken from `read`.
    ///
    /// Fields that are already set are kept.
    #[must_use]
    pub fn completed_from(&self, read: &Self) -> Self {
        fn fill(own: &str, theirs: &str) -> String {
            let chosen = if own.is_empty() { theirs } else { own };
            chosen.to_string()
        }

        Self {
            kind: fill(&self.kind, &read.kind),
            object_id: fill(&self.object_id, &read.object_id),
            version: fill(&self.version, &read.version),
            completion: Completion::Backfilled,
            ..self.clone()
        }
    }

    /// New event marked as having no originating read.
    #[must_use]
    pub fn orphaned(&self) -> Self {
        Self {
            completion: Completion::Orphaned,
            ..self.clone()
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short_id = self.object_id.split('-').next().unwrap_or_default();
        let causal = self.causal_id().map_or("-", CausalId::as_str);
        write!(
            f,
            "{}({}, id={}, version={}, causal={})",
            self.op_type, self.kind, short_id, self.version, causal
        )
    }
}
