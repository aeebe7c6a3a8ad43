//! Non-fatal findings collected while a batch moves through the pipeline.
//!
//! Every stage returns a [`Diagnostics`] alongside its result so callers
//! (tests included) can assert on what was skipped or left unmatched. Each
//! entry is also emitted as a `tracing` warning when it is recorded, which
//! keeps the inline log output operators expect.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::error::ErrorCode;

/// Pipeline stage that recorded a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Parse,
    Catalog,
    Backfill,
    Group,
    Graph,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Catalog => "catalog",
            Self::Backfill => "backfill",
            Self::Group => "group",
            Self::Graph => "graph",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recorded finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub stage: Stage,
    /// What the finding is about: a line number, a causal id, a node key.
    pub subject: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.code, self.stage, self.subject, self.message
        )
    }
}

/// Ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record a diagnostic and log it.
    pub fn record(
        &mut self,
        code: ErrorCode,
        stage: Stage,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        let diagnostic = Diagnostic {
            code,
            stage,
            subject: subject.into(),
            message: message.into(),
        };
        warn!(
            code = %diagnostic.code,
            stage = %diagnostic.stage,
            subject = %diagnostic.subject,
            "{}",
            diagnostic.message
        );
        self.entries.push(diagnostic);
    }

    /// Append another collection, keeping order. Already logged, so no
    /// second warning is emitted.
    pub fn absorb(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    /// Number of entries carrying `code`.
    #[must_use]
    pub fn count(&self, code: ErrorCode) -> usize {
        self.entries.iter().filter(|d| d.code == code).count()
    }

    /// Entries carrying `code`, in recording order.
    pub fn with_code(&self, code: ErrorCode) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.code == code)
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
